//! The Syscall Trap Boundary
//!
//! How an untrusted user process invokes kernel services:
//!
//! - [`validate`] — nothing user-supplied is touched except through here
//! - [`table`] — the thirteen syscalls, numbers and arities
//! - [`fd`] — per-process open-file tables, system-wide descriptors
//! - [`handler`] — the dispatcher and the handlers themselves
//!
//! One rule throughout: a process can get itself killed, but it cannot
//! make the kernel touch memory it should not.

pub mod fd;
pub mod handler;
pub mod table;
pub mod validate;

pub use fd::{CONSOLE_IN_FD, CONSOLE_OUT_FD};
pub use handler::{Kernel, TrapFrame, TrapOutcome};
pub use table::Syscall;
