//! OS page-mapping primitives.
//!
//! The allocator is backed directly by anonymous private mappings; there is
//! no intermediate arena. These are the only blocking calls in the crate.

use core::ptr::{self, NonNull};
use core::sync::atomic::{AtomicUsize, Ordering};

static PAGE_SIZE: AtomicUsize = AtomicUsize::new(0);

/// Returns the system page size, queried once and cached.
pub fn page_size() -> usize {
    let cached = PAGE_SIZE.load(Ordering::Relaxed);
    if cached != 0 {
        return cached;
    }
    // SAFETY: sysconf(_SC_PAGESIZE) reads static system configuration.
    let ps = unsafe { libc::sysconf(libc::_SC_PAGESIZE) } as usize;
    PAGE_SIZE.store(ps, Ordering::Relaxed);
    ps
}

/// Rounds `len` up to a whole number of pages. `None` on overflow.
pub(crate) fn page_ceil(len: usize) -> Option<usize> {
    let mask = page_size() - 1;
    Some(len.checked_add(mask)? & !mask)
}

/// Maps `len` bytes of zeroed anonymous memory, or `None` if the OS refuses.
pub(crate) fn map_anonymous(len: usize) -> Option<NonNull<u8>> {
    // SAFETY: anonymous private mapping with no fixed address and no fd.
    let mem = unsafe {
        libc::mmap(
            ptr::null_mut(),
            len,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
            -1,
            0,
        )
    };
    if mem == libc::MAP_FAILED {
        None
    } else {
        NonNull::new(mem.cast())
    }
}

/// Returns `[base, base + len)` to the OS.
///
/// # Safety
///
/// `base` must be page-aligned and the range must lie within a mapping
/// previously obtained from [`map_anonymous`] and not yet unmapped.
pub(crate) unsafe fn unmap(base: *mut u8, len: usize) {
    // SAFETY: upheld by the caller.
    unsafe { libc::munmap(base.cast(), len) };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_is_a_power_of_two() {
        let ps = page_size();
        assert!(ps.is_power_of_two());
        assert!(ps >= 4096);
    }

    #[test]
    fn page_ceil_rounds_up() {
        let ps = page_size();
        assert_eq!(page_ceil(1), Some(ps));
        assert_eq!(page_ceil(ps), Some(ps));
        assert_eq!(page_ceil(ps + 1), Some(2 * ps));
        assert_eq!(page_ceil(usize::MAX), None);
    }

    #[test]
    fn map_write_unmap_roundtrip() {
        let ps = page_size();
        let mem = map_anonymous(2 * ps).expect("mapping two pages should succeed");
        // SAFETY: the mapping is 2 * ps bytes and writable.
        unsafe {
            ptr::write_bytes(mem.as_ptr(), 0x5A, 2 * ps);
            assert_eq!(*mem.as_ptr().add(ps), 0x5A);
            unmap(mem.as_ptr(), 2 * ps);
        }
    }

    #[test]
    fn fresh_mappings_are_zeroed() {
        let ps = page_size();
        let mem = map_anonymous(ps).expect("mapping one page should succeed");
        // SAFETY: the mapping is ps bytes and readable.
        unsafe {
            for i in [0, ps / 2, ps - 1] {
                assert_eq!(*mem.as_ptr().add(i), 0);
            }
            unmap(mem.as_ptr(), ps);
        }
    }
}
