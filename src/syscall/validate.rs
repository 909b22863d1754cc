//! User-Memory Validation
//!
//! Everything a user process hands the kernel — syscall numbers, argument
//! words, strings, buffers — arrives as a raw address. Kernel code never
//! dereferences those addresses directly; it goes through this module,
//! which checks each byte against the user/kernel split and the process's
//! address-space mapping before touching it.
//!
//! # Security Principles
//! - Validate every byte before access; fail on the first bad one
//! - Strings and buffers are staged into kernel memory before use, so a
//!   concurrently-mutating user thread cannot change data after validation
//! - A validation failure is fatal for the whole call: partial copies are
//!   never handed to a caller
//!
//! The single-unit transfer is a platform capability: on a target with a
//! fault-recovery hook, [`try_read_byte`]/[`try_write_byte`] would issue
//! the access and convert a hardware fault into `None`. This portable
//! implementation takes the pre-validation route instead: resolve the byte
//! through the mapping, then access the resolved kernel alias.

use core::ptr::NonNull;

use alloc::string::String;
use alloc::vec::Vec;

use crate::mm::address::{VirtAddr, PAGE_SIZE};

/// A process's address-space mapping, as maintained by the outer kernel's
/// paging code.
pub trait AddressSpace {
    /// Resolve a virtual address to the kernel-accessible alias of the
    /// byte it names, or `None` if the address is not mapped.
    ///
    /// Resolution must not touch the byte itself.
    fn resolve(&self, addr: VirtAddr) -> Option<NonNull<u8>>;
}

/// The user handed us an address the kernel must not touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BadUserAccess;

/// Longest C string the kernel will stage from user space. Command lines
/// and filenames fit in one page.
pub const MAX_CSTRING: usize = PAGE_SIZE;

/// True iff `addr` is below the user/kernel split and mapped in `aspace`.
///
/// Decided purely from the mapping; the byte itself is not read.
pub fn is_mapped<A: AddressSpace + ?Sized>(aspace: &A, addr: VirtAddr) -> bool {
    addr.is_user() && aspace.resolve(addr).is_some()
}

/// Attempt to read the user byte at `addr`, `None` if it is inaccessible.
fn try_read_byte<A: AddressSpace + ?Sized>(aspace: &A, addr: VirtAddr) -> Option<u8> {
    if !addr.is_user() {
        return None;
    }
    let alias = aspace.resolve(addr)?;
    // SAFETY: resolve() vouches that the alias points at one mapped byte.
    Some(unsafe { alias.as_ptr().read_volatile() })
}

/// Attempt to write one byte at user address `addr`.
fn try_write_byte<A: AddressSpace + ?Sized>(aspace: &A, addr: VirtAddr, byte: u8) -> bool {
    if !addr.is_user() {
        return false;
    }
    match aspace.resolve(addr) {
        Some(alias) => {
            // SAFETY: resolve() vouches that the alias points at one
            // mapped, writable-from-kernel byte.
            unsafe { alias.as_ptr().write_volatile(byte) };
            true
        }
        None => false,
    }
}

/// Copy `dst.len()` bytes from user address `src` into kernel memory.
///
/// Fails fast on the first inaccessible byte. On failure the contents of
/// `dst` are unspecified; the caller must discard them.
pub fn copy_from_user<A: AddressSpace + ?Sized>(
    aspace: &A,
    dst: &mut [u8],
    src: VirtAddr,
) -> Result<(), BadUserAccess> {
    for (i, slot) in dst.iter_mut().enumerate() {
        *slot = try_read_byte(aspace, src.add(i)).ok_or(BadUserAccess)?;
    }
    Ok(())
}

/// Copy `src` into user memory starting at `dst`.
///
/// Fails fast on the first inaccessible byte; bytes already written stay
/// written, the caller must treat the call as failed regardless.
pub fn copy_to_user<A: AddressSpace + ?Sized>(
    aspace: &A,
    dst: VirtAddr,
    src: &[u8],
) -> Result<(), BadUserAccess> {
    for (i, &byte) in src.iter().enumerate() {
        if !try_write_byte(aspace, dst.add(i), byte) {
            return Err(BadUserAccess);
        }
    }
    Ok(())
}

/// Read a little-endian 32-bit word from user memory (syscall numbers and
/// argument words on the user stack).
pub fn read_user_u32<A: AddressSpace + ?Sized>(
    aspace: &A,
    addr: VirtAddr,
) -> Result<u32, BadUserAccess> {
    let mut bytes = [0u8; 4];
    copy_from_user(aspace, &mut bytes, addr)?;
    Ok(u32::from_le_bytes(bytes))
}

/// Check that a NUL-terminated string starting at `addr` lies entirely in
/// mapped user memory. Returns its length (excluding the terminator).
///
/// Scans forward one byte at a time and stops at the first NUL or the
/// first unmapped address, whichever comes first; nothing past that point
/// is touched.
pub fn verify_cstring<A: AddressSpace + ?Sized>(
    aspace: &A,
    addr: VirtAddr,
) -> Result<usize, BadUserAccess> {
    let mut len = 0;
    loop {
        match try_read_byte(aspace, addr.add(len)) {
            Some(0) => return Ok(len),
            Some(_) => len += 1,
            None => return Err(BadUserAccess),
        }
    }
}

/// Stage a NUL-terminated user string into a kernel `String`.
///
/// Single forward pass with the same per-byte checks as
/// [`verify_cstring`]; the staged copy is what handlers act on, never the
/// user pointer. Strings longer than [`MAX_CSTRING`] and non-UTF-8 strings
/// are rejected the same way as an unmapped pointer.
pub fn read_user_cstring<A: AddressSpace + ?Sized>(
    aspace: &A,
    addr: VirtAddr,
) -> Result<String, BadUserAccess> {
    let mut bytes = Vec::new();
    loop {
        match try_read_byte(aspace, addr.add(bytes.len())) {
            Some(0) => break,
            Some(b) if bytes.len() < MAX_CSTRING => bytes.push(b),
            Some(_) => return Err(BadUserAccess),
            None => return Err(BadUserAccess),
        }
    }
    String::from_utf8(bytes).map_err(|_| BadUserAccess)
}
