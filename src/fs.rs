//! Filesystem Collaborator Interface
//!
//! The boundary layer does not implement a filesystem; it drives one
//! through this narrow surface. The outer kernel supplies a [`FileSys`] and
//! the dispatcher serializes all calls into it under a single lock — the
//! filesystem is not required to tolerate concurrent access.

use alloc::boxed::Box;

/// An open file, owned by exactly one process's open-file table.
///
/// Per-handle operations are not serialized by the filesystem lock; a
/// handle is only ever driven by its owning process's trap path.
pub trait FileHandle: Send {
    /// File length in bytes.
    fn size(&self) -> u32;

    /// Read from the current position into `buf`, advancing the position.
    /// Returns the number of bytes read; 0 at end of file.
    fn read(&mut self, buf: &mut [u8]) -> usize;

    /// Write `buf` at the current position, advancing it. Returns the
    /// number of bytes actually written, which may be short if the
    /// underlying storage is full.
    fn write(&mut self, buf: &[u8]) -> usize;

    /// Move the position to `position` bytes from the start of the file.
    fn seek(&mut self, position: u32);

    /// Current position in bytes from the start of the file.
    fn tell(&self) -> u32;
}

/// The filesystem proper: namespace operations.
///
/// All three methods are invoked with the global filesystem lock held.
pub trait FileSys {
    /// Create a file of `initial_size` bytes. False if it already exists
    /// or creation failed.
    fn create(&mut self, name: &str, initial_size: u32) -> bool;

    /// Open an existing file, or `None` if there is no such file.
    fn open(&mut self, name: &str) -> Option<Box<dyn FileHandle>>;

    /// Remove a file from the namespace. False if there is no such file.
    /// Already-open handles stay usable per the collaborator's own rules.
    fn remove(&mut self, name: &str) -> bool;
}
