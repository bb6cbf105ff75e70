//! ABI layer for the C heap functions.
//!
//! Every entry point delegates to the lock-free core; nothing here takes
//! a lock or calls back into the standard allocator, so the surface is
//! callable from any thread at any time, including from code that is
//! itself interposed over the system allocator.

use std::ffi::{c_int, c_void};
use std::ptr::NonNull;

use pagepool_core::AllocError;

fn set_errno(code: c_int) {
    // SAFETY: __errno_location returns the calling thread's errno slot.
    unsafe { *libc::__errno_location() = code };
}

fn out_ptr(ptr: Option<NonNull<u8>>) -> *mut c_void {
    ptr.map_or(std::ptr::null_mut(), |p| p.as_ptr().cast())
}

// ---------------------------------------------------------------------------
// malloc / free
// ---------------------------------------------------------------------------

/// POSIX `malloc` -- allocates `size` bytes of uninitialized memory.
///
/// Returns a pointer to the allocated memory, or null on failure. A
/// zero-byte request returns a unique, freeable pointer.
///
/// # Safety
///
/// Caller must eventually `free` the returned pointer exactly once.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn malloc(size: usize) -> *mut c_void {
    out_ptr(pagepool_core::allocate(size))
}

/// POSIX `free` -- deallocates memory previously allocated here.
///
/// Null is a no-op. A pointer that fails the live-sentinel check is
/// counted as a bad free and otherwise ignored.
///
/// # Safety
///
/// `ptr` must be null or a pointer previously returned by this allocator
/// and not yet freed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn free(ptr: *mut c_void) {
    // SAFETY: forwarded caller contract.
    unsafe { pagepool_core::free(ptr.cast()) };
}

/// Obsolete alias for [`free`], still exported by the platform allocator.
///
/// # Safety
///
/// Same contract as [`free`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cfree(ptr: *mut c_void) {
    // SAFETY: forwarded caller contract.
    unsafe { pagepool_core::free(ptr.cast()) };
}

// ---------------------------------------------------------------------------
// calloc / realloc / reallocarray
// ---------------------------------------------------------------------------

/// POSIX `calloc` -- allocates zeroed memory for `nmemb` elements of
/// `size` bytes each.
///
/// Fails with ENOMEM, without touching the heap, when the multiplication
/// overflows.
///
/// # Safety
///
/// Caller must eventually `free` the returned pointer exactly once.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn calloc(nmemb: usize, size: usize) -> *mut c_void {
    match pagepool_core::allocate_counted(nmemb, size) {
        Some(ptr) => ptr.as_ptr().cast(),
        None => {
            set_errno(libc::ENOMEM);
            std::ptr::null_mut()
        }
    }
}

/// POSIX `realloc` -- changes the size of a previously allocated block.
///
/// - Null `ptr` behaves like `malloc(size)`.
/// - Zero `size` frees `ptr` and returns null.
/// - A request within the block's current capacity returns `ptr` itself.
/// - Otherwise the data moves to a fresh block; on allocation failure the
///   old block is left untouched and null is returned.
///
/// # Safety
///
/// `ptr` must be null or a live pointer from this allocator.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn realloc(ptr: *mut c_void, size: usize) -> *mut c_void {
    // SAFETY: forwarded caller contract.
    out_ptr(unsafe { pagepool_core::resize(ptr.cast(), size) })
}

/// `reallocarray` -- `realloc` with the `calloc` overflow guard.
///
/// # Safety
///
/// Same contract as [`realloc`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn reallocarray(ptr: *mut c_void, nmemb: usize, size: usize) -> *mut c_void {
    let Some(total) = nmemb.checked_mul(size) else {
        set_errno(libc::ENOMEM);
        return std::ptr::null_mut();
    };
    // SAFETY: forwarded caller contract.
    out_ptr(unsafe { pagepool_core::resize(ptr.cast(), total) })
}

// ---------------------------------------------------------------------------
// aligned allocation
// ---------------------------------------------------------------------------

fn aligned_or_errno(align: usize, size: usize) -> *mut c_void {
    match pagepool_core::allocate_aligned(align, size) {
        Ok(ptr) => ptr.as_ptr().cast(),
        Err(err) => {
            set_errno(match err {
                AllocError::InvalidAlignment => libc::EINVAL,
                AllocError::OutOfMemory => libc::ENOMEM,
            });
            std::ptr::null_mut()
        }
    }
}

/// C11 `aligned_alloc` -- allocates `size` bytes aligned to `alignment`.
///
/// The alignment must be a power of two; otherwise EINVAL and null.
///
/// # Safety
///
/// Caller must eventually `free` the returned pointer exactly once.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn aligned_alloc(alignment: usize, size: usize) -> *mut c_void {
    aligned_or_errno(alignment, size)
}

/// Legacy `memalign` -- same semantics as [`aligned_alloc`] here.
///
/// # Safety
///
/// Caller must eventually `free` the returned pointer exactly once.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn memalign(alignment: usize, size: usize) -> *mut c_void {
    aligned_or_errno(alignment, size)
}

/// POSIX `posix_memalign` -- stores an aligned allocation in `*memptr`.
///
/// Returns 0 on success, EINVAL for a bad alignment (not a power of two,
/// or not a multiple of the pointer size), ENOMEM on exhaustion. `errno`
/// is left alone, per POSIX.
///
/// # Safety
///
/// `memptr` must point to writable storage for one pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn posix_memalign(
    memptr: *mut *mut c_void,
    alignment: usize,
    size: usize,
) -> c_int {
    if !alignment.is_power_of_two() || alignment % std::mem::size_of::<*mut c_void>() != 0 {
        return libc::EINVAL;
    }
    match pagepool_core::allocate_aligned(alignment, size) {
        Ok(ptr) => {
            // SAFETY: caller guarantees `memptr` points to writable storage.
            unsafe { *memptr = ptr.as_ptr().cast() };
            0
        }
        Err(_) => libc::ENOMEM,
    }
}

/// `valloc` -- page-aligned allocation of `size` bytes.
///
/// # Safety
///
/// Caller must eventually `free` the returned pointer exactly once.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn valloc(size: usize) -> *mut c_void {
    aligned_or_errno(pagepool_core::page_size(), size)
}

/// `pvalloc` -- page-aligned allocation with the request itself rounded
/// up to a whole number of pages.
///
/// # Safety
///
/// Caller must eventually `free` the returned pointer exactly once.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pvalloc(size: usize) -> *mut c_void {
    let ps = pagepool_core::page_size();
    let Some(rounded) = size.checked_add(ps - 1).map(|len| len & !(ps - 1)) else {
        set_errno(libc::ENOMEM);
        return std::ptr::null_mut();
    };
    aligned_or_errno(ps, rounded)
}

// ---------------------------------------------------------------------------
// size queries and tuning
// ---------------------------------------------------------------------------

/// `malloc_usable_size` -- the payload capacity of a live allocation.
/// Null yields 0.
///
/// # Safety
///
/// `ptr` must be null or a live pointer from this allocator.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn malloc_usable_size(ptr: *mut c_void) -> usize {
    if ptr.is_null() {
        return 0;
    }
    // SAFETY: forwarded caller contract.
    unsafe { pagepool_core::usable_size(ptr.cast()) }
}

/// Darwin-style alias for [`malloc_usable_size`].
///
/// # Safety
///
/// Same contract as [`malloc_usable_size`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn malloc_size(ptr: *mut c_void) -> usize {
    // SAFETY: forwarded caller contract.
    unsafe { malloc_usable_size(ptr) }
}

/// `malloc_good_size` -- the capacity `malloc(size)` would deliver.
#[unsafe(no_mangle)]
pub extern "C" fn malloc_good_size(size: usize) -> usize {
    pagepool_core::good_size(size)
}

/// `mallopt` -- accepts and ignores every tuning parameter.
///
/// Returns 1, the success indicator.
#[unsafe(no_mangle)]
pub extern "C" fn mallopt(param: c_int, value: c_int) -> c_int {
    c_int::from(pagepool_core::set_tuning(param, value))
}
