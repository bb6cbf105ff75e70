//! The in-band block header.
//!
//! Every pointer handed to a caller is preceded by exactly one [`Header`].
//! The `size` word is a pool index for pool-sized blocks and the raw byte
//! length of the mapping for oversized blocks; the two never collide because
//! raw lengths are page multiples, far above the pool count. The `next` word
//! is the free-list link while the block sits in a pool and a self-pointer
//! sentinel while the block is live, which lets the free path reject stale
//! or foreign pointers.

use core::mem::{align_of, size_of};
use core::sync::atomic::{AtomicPtr, Ordering};

/// Header footprint in bytes. Payloads start exactly this far into a block.
pub const HEADER_SIZE: usize = size_of::<Header>();

/// Two machine words, padded and aligned so the payload that follows
/// satisfies the platform's maximum fundamental alignment.
#[repr(C, align(16))]
pub(crate) struct Header {
    /// Pool index in `[0, POOL_COUNT)`, or the raw mapping length.
    pub(crate) size: usize,
    /// Free-list link while free; self-pointer sentinel while live.
    ///
    /// Atomic because a stalled pool popper may still read this word after
    /// another thread has won the block and restamped it.
    pub(crate) next: AtomicPtr<Header>,
}

const _: () = assert!(size_of::<Header>() == 16);
const _: () = assert!(align_of::<Header>() == 16);

/// The payload address of the block headed by `header`.
pub(crate) fn payload_of(header: *mut Header) -> *mut u8 {
    // SAFETY: every block is at least one header long.
    unsafe { header.add(1).cast() }
}

/// The header sitting immediately in front of `payload`.
///
/// Integer arithmetic on purpose: the free path probes this location
/// before it knows whether the pointer is one of ours.
pub(crate) fn header_of(payload: *mut u8) -> *mut Header {
    (payload as usize - HEADER_SIZE) as *mut Header
}

/// Writes the live sentinel: a self-reference in the link slot.
///
/// # Safety
///
/// The caller must exclusively own the block.
pub(crate) unsafe fn mark_live(header: *mut Header) {
    // SAFETY: the link word is only restamped by the block's owner.
    unsafe { (*header).next.store(header, Ordering::Relaxed) };
}

/// Checks the live sentinel.
///
/// # Safety
///
/// `header` must point into a mapping owned by this allocator.
pub(crate) unsafe fn is_live(header: *mut Header) -> bool {
    // SAFETY: the link word is always readable for allocator-owned blocks.
    unsafe { (*header).next.load(Ordering::Relaxed) == header }
}
