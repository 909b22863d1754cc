//! Open-File Table and Descriptor Allocation
//!
//! Each process owns an [`OpenFileTable`] mapping descriptors to open file
//! handles. Descriptor values come from one [`FdAllocator`] shared by the
//! whole system: they start above the two reserved console descriptors,
//! only ever grow, and are never reissued — a descriptor closed by one
//! process will not reappear in another.

use core::sync::atomic::{AtomicI32, Ordering};

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::fs::FileHandle;

/// Reserved descriptor for console input.
pub const CONSOLE_IN_FD: i32 = 0;
/// Reserved descriptor for console output.
pub const CONSOLE_OUT_FD: i32 = 1;
/// First descriptor eligible for open files.
pub const FIRST_FILE_FD: i32 = 2;

/// One open file of one process.
pub struct OpenFileEntry {
    descriptor: i32,
    handle: Box<dyn FileHandle>,
}

impl OpenFileEntry {
    /// The descriptor naming this entry.
    pub fn descriptor(&self) -> i32 {
        self.descriptor
    }
}

/// A process's descriptor → handle map.
///
/// Small and short-lived enough that a plain vector beats anything fancier.
pub struct OpenFileTable {
    entries: Vec<OpenFileEntry>,
}

impl OpenFileTable {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Record `handle` under `descriptor`.
    pub fn insert(&mut self, descriptor: i32, handle: Box<dyn FileHandle>) {
        debug_assert!(
            self.entries.iter().all(|e| e.descriptor != descriptor),
            "descriptor {} inserted twice",
            descriptor
        );
        self.entries.push(OpenFileEntry { descriptor, handle });
    }

    /// Look up the handle behind `descriptor`.
    pub fn get_mut(&mut self, descriptor: i32) -> Option<&mut (dyn FileHandle + 'static)> {
        self.entries
            .iter_mut()
            .find(|e| e.descriptor == descriptor)
            .map(|e| &mut *e.handle)
    }

    /// Remove and return the handle behind `descriptor`. The descriptor
    /// value itself retires with it.
    pub fn remove(&mut self, descriptor: i32) -> Option<Box<dyn FileHandle>> {
        let idx = self
            .entries
            .iter()
            .position(|e| e.descriptor == descriptor)?;
        Some(self.entries.swap_remove(idx).handle)
    }

    /// Number of open files.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over the open entries (for teardown and diagnostics).
    pub fn iter(&self) -> impl Iterator<Item = &OpenFileEntry> {
        self.entries.iter()
    }
}

impl Default for OpenFileTable {
    fn default() -> Self {
        Self::new()
    }
}

/// System-wide descriptor counter.
///
/// Atomic so that two processes opening files concurrently can never be
/// handed the same value.
pub struct FdAllocator {
    next: AtomicI32,
}

impl FdAllocator {
    pub const fn new() -> Self {
        Self {
            next: AtomicI32::new(FIRST_FILE_FD),
        }
    }

    /// Hand out the next descriptor. Values only ever increase.
    pub fn allocate(&self) -> i32 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for FdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
