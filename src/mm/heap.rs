//! Kernel Heap
//!
//! Uses `linked_list_allocator` for kernel-side allocations (the open-file
//! table, staged user strings and buffers, the frame descriptor array).
//!
//! Only compiled with the `kernel-heap` feature: a hosted build (and the
//! test suite) links the system allocator instead. Allocation failure falls
//! through to the default handler, which panics; nothing at this layer can
//! recover from a dry kernel heap.

use linked_list_allocator::LockedHeap;

/// Global heap allocator instance
#[global_allocator]
static ALLOCATOR: LockedHeap = LockedHeap::empty();

/// Kernel heap size (64 KiB)
const HEAP_SIZE: usize = 64 * 1024;

/// Static heap memory region
static mut HEAP_MEMORY: [u8; HEAP_SIZE] = [0; HEAP_SIZE];

/// Initialize the kernel heap.
///
/// # Safety
/// Must be called exactly once during kernel initialization, before any
/// heap allocation is made.
pub unsafe fn init_heap() {
    // SAFETY: HEAP_MEMORY is a valid static region and, per this
    // function's contract, nothing has touched the allocator yet.
    unsafe {
        let heap_start = &raw mut HEAP_MEMORY;
        ALLOCATOR.lock().init(heap_start.cast(), HEAP_SIZE);
    }
}

/// Get the size of the kernel heap.
pub fn heap_size() -> usize {
    HEAP_SIZE
}
