//! Ocelot - Teaching Kernel Boundary Layer
//!
//! The two hard-engineering pieces of a small monolithic teaching kernel:
//!
//! - **Syscall trap boundary** ([`syscall`]): marshals numbers, arguments,
//!   strings and buffers out of an untrusted user process without ever
//!   dereferencing unchecked user memory.
//! - **Physical frame allocator** ([`mm::frame`]): bitmap-indexed pool of
//!   the physical pages backing user virtual memory, with lock-serialized
//!   exclusive ownership and no reclamation policy.
//!
//! Everything machine- or policy-specific lives behind collaborator traits:
//! the page-table lookup ([`syscall::validate::AddressSpace`]), the process
//! lifecycle ([`process::ProcessManager`]), the filesystem ([`fs::FileSys`]),
//! and the console/shutdown devices ([`drivers`]). An outer kernel
//! implements those and hands the dispatcher a [`syscall::TrapFrame`] per
//! trap; host-side tests implement them with mocks.
//!
//! # Security Model
//! - Every user-supplied address is checked against the user/kernel split
//!   and the process mapping before any access
//! - Strings and buffers are staged into kernel memory before use
//! - Validation failures terminate the offending process, never the kernel
//! - Frame ownership is exclusive and serialized by a single lock

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

extern crate alloc;

pub mod drivers;
pub mod fs;
pub mod mm;
pub mod process;
pub mod syscall;
