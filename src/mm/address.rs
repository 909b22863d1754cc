//! Virtual Address Type
//!
//! Type-safe wrapper for user virtual addresses so that raw integers from a
//! trap frame cannot be mixed up with kernel pointers.
//!
//! The address space is split at [`USER_LIMIT`]: everything strictly below
//! the split is user territory, everything at or above it belongs to the
//! kernel. User processes may only ever name addresses below the split.

use core::fmt;

/// Page size (4 KiB)
pub const PAGE_SIZE: usize = 4096;
/// Page size mask
pub const PAGE_MASK: usize = PAGE_SIZE - 1;
/// Bits to shift for page number
pub const PAGE_SHIFT: usize = 12;

/// First address past the user portion of the address space.
///
/// Addresses at or above this belong to the kernel and are never valid
/// arguments, buffers, or strings from a user process.
pub const USER_LIMIT: usize = 0xC000_0000;

/// A virtual address inside some process's address space.
///
/// Carries no guarantee of being mapped, or even of being a user address;
/// it is what a process *claimed*. The validator in
/// [`crate::syscall::validate`] decides whether it may be touched.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct VirtAddr(usize);

impl VirtAddr {
    /// Create a new virtual address.
    #[inline]
    pub const fn new(addr: usize) -> Self {
        Self(addr)
    }

    /// Get the raw address value.
    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0
    }

    /// Check if the address is below the user/kernel split.
    #[inline]
    pub const fn is_user(self) -> bool {
        self.0 < USER_LIMIT
    }

    /// Check if the address is in kernel territory.
    #[inline]
    pub const fn is_kernel(self) -> bool {
        !self.is_user()
    }

    /// Check if the address is page-aligned.
    #[inline]
    pub const fn is_aligned(self) -> bool {
        self.0 & PAGE_MASK == 0
    }

    /// Align the address down to the nearest page boundary.
    #[inline]
    pub const fn align_down(self) -> Self {
        Self(self.0 & !PAGE_MASK)
    }

    /// Align the address up to the nearest page boundary.
    #[inline]
    pub const fn align_up(self) -> Self {
        Self((self.0 + PAGE_MASK) & !PAGE_MASK)
    }

    /// Get the virtual page number.
    #[inline]
    pub const fn page_number(self) -> usize {
        self.0 >> PAGE_SHIFT
    }

    /// Get the page offset (lowest 12 bits).
    #[inline]
    pub const fn page_offset(self) -> usize {
        self.0 & PAGE_MASK
    }

    /// Add a byte offset, wrapping on overflow.
    ///
    /// A wrapped address ends up somewhere the validator rejects, so
    /// callers walking forward byte by byte need no separate overflow check.
    #[inline]
    pub const fn add(self, offset: usize) -> Self {
        Self(self.0.wrapping_add(offset))
    }
}

impl fmt::Debug for VirtAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VirtAddr({:#010x})", self.0)
    }
}

impl fmt::Display for VirtAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split() {
        assert!(VirtAddr::new(0).is_user());
        assert!(VirtAddr::new(USER_LIMIT - 1).is_user());
        assert!(VirtAddr::new(USER_LIMIT).is_kernel());
        assert!(VirtAddr::new(usize::MAX).is_kernel());
    }

    #[test]
    fn test_page_alignment() {
        let addr = VirtAddr::new(0x0804_1234);
        assert!(!addr.is_aligned());
        assert_eq!(addr.align_down().as_usize(), 0x0804_1000);
        assert_eq!(addr.align_up().as_usize(), 0x0804_2000);
        assert_eq!(addr.page_offset(), 0x234);
    }

    #[test]
    fn test_page_number() {
        assert_eq!(VirtAddr::new(0x0804_1234).page_number(), 0x0804_1);
        assert_eq!(VirtAddr::new(0).page_number(), 0);
    }
}
