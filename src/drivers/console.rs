//! Console Collaborator Interface
//!
//! The byte-stream device behind the two reserved descriptors (0 = input,
//! 1 = output). A real kernel backs this with its UART or terminal driver;
//! the trait takes `&self` because device drivers carry their own locking.

/// Console input/output as seen from the syscall layer.
pub trait Console {
    /// Write `bytes` to the console.
    fn write(&self, bytes: &[u8]);

    /// Read up to `buf.len()` bytes of console input, returning the number
    /// of bytes delivered.
    fn read(&self, buf: &mut [u8]) -> usize;
}
