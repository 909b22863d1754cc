//! Physical Frame Table
//!
//! Manages the pool of physical pages (frames) that back user virtual
//! memory, using a bitmap allocator with a parallel frame-descriptor array.
//!
//! # Design
//! - The entire pool is reserved from the underlying [`FramePool`] once, at
//!   construction, and never given back
//! - Each bit in the bitmap represents one frame; bit set = frame owned by
//!   some virtual page
//! - `frames[i]` records which virtual page owns frame `i`; the index of a
//!   frame being freed is recovered by address arithmetic against frame 0,
//!   which is why the pool must hand out consecutive pages
//!
//! # Properties
//! - Acquire and release are serialized by a single spinlock, so two
//!   concurrent acquisitions can never claim the same frame
//! - Freeing a frame that is not allocated is an invariant violation and
//!   panics
//! - Exhaustion is fatal: there is no reclamation here, a full system must
//!   bolt an eviction policy on top before relying on this allocator

use core::ptr::NonNull;

use alloc::vec;
use alloc::vec::Vec;
use bitflags::bitflags;
use spin::Mutex;

use super::address::{VirtAddr, PAGE_SIZE};

bitflags! {
    /// Allocation behavior for [`FrameTable::get_frame`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FrameFlags: u32 {
        /// Zero-fill the frame contents before returning.
        const ZERO = 1 << 0;
    }
}

/// Source of the physical pages placed under the table's management.
///
/// Implemented by the underlying physical allocator of the outer kernel.
/// The table drains it exactly once, at construction; the reservation is
/// permanent.
pub trait FramePool {
    /// Number of pages the pool will hand over.
    fn len(&self) -> usize;

    /// Whether the pool has no pages at all.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reserve one page, returning its kernel-addressable base.
    ///
    /// Successive calls must return consecutive, page-aligned-spaced
    /// addresses; the table asserts this.
    fn reserve(&mut self) -> NonNull<u8>;
}

/// One physical page under management.
struct Frame {
    /// Virtual page currently backed by this frame, if any.
    owner_vpage: Option<VirtAddr>,
    /// Kernel-addressable base of the page. Fixed for the table's lifetime.
    kpage: NonNull<u8>,
}

/// Bitmap with one bit per frame, all operations index-parallel to the
/// frame array.
struct Bitmap {
    bits: Vec<u8>,
    len: usize,
}

impl Bitmap {
    fn new(len: usize) -> Self {
        Self {
            bits: vec![0; len.div_ceil(8)],
            len,
        }
    }

    #[inline]
    fn get(&self, idx: usize) -> bool {
        (self.bits[idx / 8] >> (idx % 8)) & 1 == 1
    }

    #[inline]
    fn set(&mut self, idx: usize, value: bool) {
        if value {
            self.bits[idx / 8] |= 1 << (idx % 8);
        } else {
            self.bits[idx / 8] &= !(1 << (idx % 8));
        }
    }

    /// True iff all of `bits[start..start + count]` are set.
    fn all_set(&self, start: usize, count: usize) -> bool {
        (start..start + count).all(|i| self.get(i))
    }

    /// First-fit scan from index 0 for `count` contiguous clear bits;
    /// flips the run to set and returns its start.
    fn scan_and_flip(&mut self, count: usize) -> Option<usize> {
        if count == 0 || count > self.len {
            return None;
        }
        let mut start = 0;
        while start + count <= self.len {
            match (start..start + count).find(|&i| self.get(i)) {
                // Restart just past the used bit that broke the run.
                Some(used) => start = used + 1,
                None => {
                    for i in start..start + count {
                        self.set(i, true);
                    }
                    return Some(start);
                }
            }
        }
        None
    }

    fn clear_range(&mut self, start: usize, count: usize) {
        for i in start..start + count {
            self.set(i, false);
        }
    }

    fn count_clear(&self) -> usize {
        (0..self.len).filter(|&i| !self.get(i)).count()
    }
}

struct FrameTableInner {
    used: Bitmap,
    frames: Vec<Frame>,
}

// The raw page pointers are only dereferenced by the thread that holds the
// corresponding used bit, and all bit transitions happen under the table
// lock.
unsafe impl Send for FrameTableInner {}

/// The physical frame table.
///
/// Constructed once at boot from the user page pool and handed (by
/// reference) to whatever higher memory-management code needs frames; it is
/// not ambient global state.
pub struct FrameTable {
    inner: Mutex<FrameTableInner>,
}

impl FrameTable {
    /// Build the table, permanently reserving every page of `pool`.
    ///
    /// # Panics
    /// Panics if the pool is empty or hands out non-consecutive pages.
    pub fn new(pool: &mut dyn FramePool) -> Self {
        let count = pool.len();
        assert!(count > 0, "frame table built from an empty pool");

        let mut frames: Vec<Frame> = Vec::with_capacity(count);
        for idx in 0..count {
            let kpage = pool.reserve();
            if let Some(first) = frames.first() {
                let expected = first.kpage.as_ptr() as usize + idx * PAGE_SIZE;
                assert!(
                    kpage.as_ptr() as usize == expected,
                    "frame pool page {} breaks the contiguous range",
                    idx
                );
            }
            frames.push(Frame {
                owner_vpage: None,
                kpage,
            });
        }

        log::debug!("frame table managing {} frames", count);
        Self {
            inner: Mutex::new(FrameTableInner {
                used: Bitmap::new(count),
                frames,
            }),
        }
    }

    /// Total number of frames under management.
    pub fn capacity(&self) -> usize {
        self.inner.lock().frames.len()
    }

    /// Number of frames currently free. Diagnostic only; the value is stale
    /// the moment the lock is dropped.
    pub fn free_frames_remaining(&self) -> usize {
        self.inner.lock().used.count_clear()
    }

    /// Acquire one frame for the virtual page `owner_vpage`.
    ///
    /// Returns the kernel-addressable base of the frame.
    ///
    /// # Panics
    /// Panics if no frame is free. Exhaustion is unrecoverable at this
    /// layer: nothing here can evict.
    pub fn get_frame(&self, flags: FrameFlags, owner_vpage: VirtAddr) -> NonNull<u8> {
        self.get_frames(flags, owner_vpage, 1)
    }

    /// Acquire `count` contiguous frames; `owner_vpage` is recorded on the
    /// first. Returns the kernel-addressable base of the first frame.
    ///
    /// # Panics
    /// Panics if `count` is zero or no run of `count` free frames exists.
    pub fn get_frames(&self, flags: FrameFlags, owner_vpage: VirtAddr, count: usize) -> NonNull<u8> {
        assert!(count > 0, "zero-length frame request");

        let mut inner = self.inner.lock();
        let Some(idx) = inner.used.scan_and_flip(count) else {
            log::error!(
                "frame pool exhausted: {} of {} free, {} requested",
                inner.used.count_clear(),
                inner.frames.len(),
                count
            );
            panic!("out of user frames");
        };
        inner.frames[idx].owner_vpage = Some(owner_vpage);
        let kpage = inner.frames[idx].kpage;
        drop(inner);

        if flags.contains(FrameFlags::ZERO) {
            // The run was claimed above, so this thread has exclusive
            // access to its contents.
            unsafe {
                core::ptr::write_bytes(kpage.as_ptr(), 0, count * PAGE_SIZE);
            }
        }
        kpage
    }

    /// The virtual page recorded as owner of the frame at `kpage`, if the
    /// frame is allocated.
    ///
    /// # Panics
    /// Panics if `kpage` does not name a frame of the managed range.
    pub fn owner_of(&self, kpage: NonNull<u8>) -> Option<VirtAddr> {
        let inner = self.inner.lock();
        let idx = frame_index(&inner, kpage, 1);
        if inner.used.get(idx) {
            inner.frames[idx].owner_vpage
        } else {
            None
        }
    }

    /// Release the frame at `kpage`.
    ///
    /// # Panics
    /// Panics if the frame is outside the managed range or not currently
    /// allocated (double free).
    pub fn free_frame(&self, kpage: NonNull<u8>) {
        self.free_frames(kpage, 1)
    }

    /// Release `count` frames starting at `kpage`.
    ///
    /// In debug builds the released pages are filled with `0xCC` so stale
    /// references read poison instead of old contents.
    ///
    /// # Panics
    /// Panics unless every targeted frame is currently allocated.
    pub fn free_frames(&self, kpage: NonNull<u8>, count: usize) {
        assert!(count > 0, "zero-length frame release");

        let mut inner = self.inner.lock();
        let idx = frame_index(&inner, kpage, count);
        assert!(
            inner.used.all_set(idx, count),
            "freeing a frame that is not allocated"
        );

        if cfg!(debug_assertions) {
            // Poison before clearing the bits; the frames are still ours.
            unsafe {
                core::ptr::write_bytes(kpage.as_ptr(), 0xCC, count * PAGE_SIZE);
            }
        }

        for frame in &mut inner.frames[idx..idx + count] {
            frame.owner_vpage = None;
        }
        inner.used.clear_range(idx, count);
    }
}

/// Map a kernel page address back to its frame index, panicking if the
/// address (plus `count` pages) does not fall on frames of the managed
/// range.
fn frame_index(inner: &FrameTableInner, kpage: NonNull<u8>, count: usize) -> usize {
    let base = inner.frames[0].kpage.as_ptr() as usize;
    let addr = kpage.as_ptr() as usize;
    assert!(addr >= base, "frame address below the managed range");
    let offset = addr - base;
    assert!(
        offset % PAGE_SIZE == 0,
        "frame address is not page-aligned within the pool"
    );
    let idx = offset / PAGE_SIZE;
    assert!(
        idx + count <= inner.frames.len(),
        "frame address beyond the managed range"
    );
    idx
}
