//! Resize and counted (zeroed) allocation.

use core::ptr::{self, NonNull};

use crate::alloc::{allocate, free, usable_size};
use crate::stats;

/// Resizes `ptr` to hold `new_size` usable bytes.
///
/// A request that still fits the block's current capacity returns `ptr`
/// unchanged; the allocator deliberately over-retains on shrink, callers
/// that care pre-round with [`good_size`](crate::good_size). A zero
/// `new_size` frees the block and returns `None`. Otherwise the contents
/// move to a fresh block; if that allocation fails the old block is left
/// live and `None` is returned.
///
/// # Safety
///
/// `ptr` must be null or a live pointer obtained from this allocator.
pub unsafe fn resize(ptr: *mut u8, new_size: usize) -> Option<NonNull<u8>> {
    stats::note_resize();
    if new_size == 0 {
        // SAFETY: upheld by the caller; null is a no-op.
        unsafe { free(ptr) };
        return None;
    }
    let usable = if ptr.is_null() {
        0
    } else {
        // SAFETY: `ptr` is live per the contract.
        unsafe { usable_size(ptr) }
    };
    if !ptr.is_null() && new_size <= usable {
        return NonNull::new(ptr);
    }

    let fresh = allocate(new_size)?;
    if !ptr.is_null() {
        // SAFETY: `ptr` is readable for `usable` bytes, `fresh` writable
        // for `new_size`; the copy takes the smaller of the two.
        unsafe {
            ptr::copy_nonoverlapping(ptr, fresh.as_ptr(), usable.min(new_size));
            free(ptr);
        }
    }
    Some(fresh)
}

/// Allocates a zeroed region for `count` elements of `elem_size` bytes.
///
/// Fails without touching the heap when the element count multiplication
/// overflows. A nonzero count of zero-sized elements is a legal zero-size
/// request.
pub fn allocate_counted(count: usize, elem_size: usize) -> Option<NonNull<u8>> {
    let total = count.checked_mul(elem_size)?;
    let ptr = allocate(total)?;
    // Pool blocks are recycled dirty; fresh mappings happen to be zeroed
    // already, but the distinction is not worth branching on.
    // SAFETY: the block is live and holds at least `total` usable bytes.
    unsafe { ptr::write_bytes(ptr.as_ptr(), 0, total) };
    Some(ptr)
}
