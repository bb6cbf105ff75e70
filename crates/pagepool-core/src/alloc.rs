//! Allocation, refill-by-split, free, and the size queries.
//!
//! A request of `n` user bytes becomes `n + HEADER_SIZE` total bytes and is
//! routed to the smallest pool whose class covers that total. An empty pool
//! refills by popping one block from the next class up and halving it; the
//! cascade ends at the top pool, which maps one block-sized span from the
//! OS. Totals beyond the top class bypass the pools entirely and are mapped
//! in whole pages.

use core::ptr::NonNull;

use crate::header::{self, HEADER_SIZE, Header};
use crate::os;
use crate::pool::{POOL_COUNT, POOLS, TOP_BLOCK_SIZE, TOP_CLASS};
use crate::stats;

/// Smallest class index whose blocks hold `total` bytes: the least `i`
/// with `1 << i >= total`.
pub(crate) fn class_index(total: usize) -> usize {
    if total <= 1 {
        return 0;
    }
    (usize::BITS - (total - 1).leading_zeros()) as usize
}

/// Pops a block of exactly `class`, refilling the pool if it is empty.
/// The returned block carries the class stamp and the live sentinel.
pub(crate) fn acquire_block(class: usize) -> Option<NonNull<Header>> {
    stats::note_class_request(class);
    let block = match POOLS[class].pop(class) {
        Some(block) => block,
        None => refill(class)?,
    };
    // SAFETY: the pop (or refill) transferred exclusive ownership to us.
    unsafe { header::mark_live(block.as_ptr()) };
    Some(block)
}

/// Produces one block for an empty pool.
///
/// The top pool asks the OS for a single block-sized span. Every other
/// pool pulls one block from the class above (recursively, so the cascade
/// can run all the way up) and splits it into two buddies: the low half is
/// returned, the high half is stamped and pushed.
fn refill(class: usize) -> Option<NonNull<Header>> {
    if class == TOP_CLASS {
        let span = os::map_anonymous(TOP_BLOCK_SIZE)?;
        let block = span.cast::<Header>();
        // SAFETY: the span is fresh, exclusively ours, and at least one
        // header long.
        unsafe { (*block.as_ptr()).size = TOP_CLASS };
        stats::note_top_refill(TOP_CLASS);
        return Some(block);
    }

    let block = acquire_block(class + 1)?;
    let half = 1usize << class;
    // SAFETY: `block` spans `2 * half` bytes; the spare buddy starts `half`
    // bytes in, which keeps the header's 16-byte alignment because every
    // class size is a power of two >= 16.
    let spare = unsafe { block.as_ptr().cast::<u8>().add(half).cast::<Header>() };
    // SAFETY: both halves are exclusively ours until the push publishes the
    // spare.
    unsafe {
        (*block.as_ptr()).size = class;
        (*spare).size = class;
    }
    stats::note_split(class);
    // SAFETY: `spare` is `half` bytes past a non-null block base.
    POOLS[class].push(unsafe { NonNull::new_unchecked(spare) }, class);
    Some(block)
}

/// Maps a dedicated page-multiple span for a total beyond the top class.
/// The header records the raw rounded length.
fn map_oversized(total: usize) -> Option<NonNull<Header>> {
    let len = os::page_ceil(total)?;
    let span = os::map_anonymous(len)?;
    let block = span.cast::<Header>();
    // SAFETY: the span is fresh and exclusively ours.
    unsafe {
        (*block.as_ptr()).size = len;
        header::mark_live(block.as_ptr());
    }
    Some(block)
}

/// Allocates `size` usable bytes. Returns `None` when the OS refuses a
/// mapping or the size computation overflows.
pub fn allocate(size: usize) -> Option<NonNull<u8>> {
    stats::ensure_exit_report();
    stats::note_alloc();
    let total = size.checked_add(HEADER_SIZE)?;
    let class = class_index(total);
    let block = if class < POOL_COUNT {
        acquire_block(class)?
    } else {
        map_oversized(total)?
    };
    NonNull::new(header::payload_of(block.as_ptr()))
}

/// Frees a pointer previously returned by this allocator. Null is a no-op.
///
/// A pointer that fails the live-sentinel check (stale, double-freed, or
/// foreign) is counted as a bad free and dropped; this is a best-effort
/// check, not a security boundary.
///
/// # Safety
///
/// `ptr` must be null or a live pointer obtained from [`allocate`],
/// [`allocate_aligned`](crate::allocate_aligned),
/// [`allocate_counted`](crate::allocate_counted), or
/// [`resize`](crate::resize).
pub unsafe fn free(ptr: *mut u8) {
    if ptr.is_null() {
        return;
    }
    let block = header::header_of(ptr);
    // SAFETY: per the contract, `ptr` is one header into one of our blocks.
    if !unsafe { header::is_live(block) } {
        stats::note_bad_free();
        return;
    }
    // SAFETY: the sentinel held, so the header is ours to read.
    let size = unsafe { (*block).size };
    if size < POOL_COUNT {
        // SAFETY: `block` came out of `header_of` on a non-null payload.
        POOLS[size].push(unsafe { NonNull::new_unchecked(block) }, size);
    } else {
        // Aligned allocation may have advanced the header from the true
        // span base, but it always sits inside the base page; masking the
        // header address recovers the base the recorded length was
        // measured from.
        let base = block as usize & !(os::page_size() - 1);
        // SAFETY: oversized headers record the live mapping length from
        // the page containing the header.
        unsafe { os::unmap(base as *mut u8, size) };
    }
}

/// Usable payload capacity of a live allocation.
///
/// # Safety
///
/// `ptr` must be a live pointer obtained from this allocator.
pub unsafe fn usable_size(ptr: *const u8) -> usize {
    let block = header::header_of(ptr.cast_mut());
    // SAFETY: per the contract, a header precedes `ptr`.
    let size = unsafe { (*block).size };
    if size < POOL_COUNT {
        (1usize << size) - HEADER_SIZE
    } else {
        // The recorded length is measured from the page containing the
        // header; an aligned allocation may have pushed the header into
        // the middle of that page, and the gap in front of it is not
        // payload.
        let pre = block as usize & (os::page_size() - 1);
        size - pre - HEADER_SIZE
    }
}

/// The payload capacity [`allocate`]`(size)` would deliver: the class
/// capacity for pool-sized requests, the page-rounded capacity beyond the
/// top class. Always at least `size`.
pub fn good_size(size: usize) -> usize {
    let Some(total) = size.checked_add(HEADER_SIZE) else {
        return size;
    };
    let class = class_index(total);
    if class < POOL_COUNT {
        (1usize << class) - HEADER_SIZE
    } else {
        match os::page_ceil(total) {
            Some(len) => len - HEADER_SIZE,
            None => size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_index_is_ceil_log2() {
        assert_eq!(class_index(0), 0);
        assert_eq!(class_index(1), 0);
        assert_eq!(class_index(2), 1);
        assert_eq!(class_index(16), 4);
        assert_eq!(class_index(17), 5);
        assert_eq!(class_index(128), 7);
        assert_eq!(class_index(129), 8);
        assert_eq!(class_index(TOP_BLOCK_SIZE), TOP_CLASS);
        assert_eq!(class_index(TOP_BLOCK_SIZE + 1), POOL_COUNT);
    }

    #[test]
    fn allocate_returns_aligned_non_null() {
        for size in [0, 1, 7, 16, 100, 1000, 4096] {
            let ptr = allocate(size).expect("small allocation should succeed");
            assert_eq!(ptr.as_ptr() as usize % HEADER_SIZE, 0);
            // SAFETY: freshly allocated, not yet freed.
            unsafe { free(ptr.as_ptr()) };
        }
    }

    #[test]
    fn live_blocks_of_one_class_never_overlap() {
        // When both come from one split class-7 block they are exactly 64
        // bytes apart; in every case they must be at least a class apart.
        let a = allocate(48).expect("allocation should succeed");
        let b = allocate(48).expect("allocation should succeed");
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        assert!(hi.as_ptr() as usize - lo.as_ptr() as usize >= 64);
        // SAFETY: live pointers from allocate.
        unsafe {
            free(a.as_ptr());
            free(b.as_ptr());
        }
    }

    #[test]
    fn usable_size_matches_good_size() {
        for size in [0, 1, 15, 16, 17, 100, 112, 4000, 32_000, 40_000, 100_000] {
            let ptr = allocate(size).expect("allocation should succeed");
            // SAFETY: live pointer from allocate.
            let usable = unsafe { usable_size(ptr.as_ptr()) };
            assert!(usable >= size);
            assert_eq!(usable, good_size(size));
            // SAFETY: live pointer from allocate.
            unsafe { free(ptr.as_ptr()) };
        }
    }

    #[test]
    fn good_size_never_shrinks_the_request() {
        for size in [0usize, 1, 100, 5000, TOP_BLOCK_SIZE, 1 << 20] {
            assert!(good_size(size) >= size);
        }
        // Requests too large to carry a header are reported back unchanged;
        // allocate() fails them anyway.
        assert_eq!(good_size(usize::MAX), usize::MAX);
        // The interesting boundaries, spelled out.
        assert_eq!(good_size(1), 16);
        assert_eq!(good_size(100), 112);
        assert_eq!(good_size(TOP_BLOCK_SIZE - HEADER_SIZE), TOP_BLOCK_SIZE - HEADER_SIZE);
    }

    #[test]
    fn oversized_header_records_page_multiple() {
        let size = TOP_BLOCK_SIZE; // one past the top class once the header lands
        let ptr = allocate(size).expect("oversized allocation should succeed");
        let ps = os::page_size();
        // SAFETY: live pointer from allocate.
        unsafe {
            let recorded = (*header::header_of(ptr.as_ptr())).size;
            assert!(recorded >= POOL_COUNT);
            assert_eq!(recorded % ps, 0);
            assert_eq!(usable_size(ptr.as_ptr()), recorded - HEADER_SIZE);
            free(ptr.as_ptr());
        }
    }

    #[test]
    fn oversized_payload_is_writable_end_to_end() {
        let size = 100_000;
        let ptr = allocate(size).expect("oversized allocation should succeed");
        // SAFETY: the block is live and usable_size(ptr) >= size.
        unsafe {
            core::ptr::write_bytes(ptr.as_ptr(), 0xC3, size);
            assert_eq!(*ptr.as_ptr().add(size - 1), 0xC3);
            free(ptr.as_ptr());
        }
    }

    #[test]
    fn free_null_is_a_noop() {
        // SAFETY: null is explicitly allowed.
        unsafe { free(core::ptr::null_mut()) };
    }

    #[test]
    fn allocation_overflow_fails_cleanly() {
        assert!(allocate(usize::MAX).is_none());
        assert!(allocate(usize::MAX - HEADER_SIZE).is_none());
    }
}
