//! Memory management: address types, the physical frame table, and the
//! (feature-gated) kernel heap.
//!
//! Page-table construction and page-fault handling live in the outer
//! kernel; this layer only consumes the mapping through
//! [`crate::syscall::validate::AddressSpace`] and hands out the physical
//! frames that back it.

pub mod address;
pub mod frame;
#[cfg(feature = "kernel-heap")]
pub mod heap;

pub use address::{VirtAddr, PAGE_SIZE, USER_LIMIT};
pub use frame::{FrameFlags, FramePool, FrameTable};
