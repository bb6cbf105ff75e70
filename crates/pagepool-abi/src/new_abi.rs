//! C++ object-construction and -destruction entry points.
//!
//! Exports the Itanium-mangled `operator new`/`operator delete` families
//! so C++ code linked against this library constructs and destroys
//! through the buddy pools. Alignment arguments (`std::align_val_t`) are
//! honoured via the aligned path; the nothrow variants differ only in
//! intent, since every variant here reports failure as a null return --
//! no C++ exception machinery exists on this side of the boundary.

use std::ffi::c_void;

fn plain_new(size: usize) -> *mut c_void {
    pagepool_core::allocate(size).map_or(std::ptr::null_mut(), |p| p.as_ptr().cast())
}

fn aligned_new(size: usize, align: usize) -> *mut c_void {
    match pagepool_core::allocate_aligned(align, size) {
        Ok(ptr) => ptr.as_ptr().cast(),
        Err(_) => std::ptr::null_mut(),
    }
}

unsafe fn dispose(ptr: *mut c_void) {
    // SAFETY: operator delete receives pointers produced by operator new.
    unsafe { pagepool_core::free(ptr.cast()) };
}

/// `operator new(size_t)`
#[unsafe(export_name = "_Znwm")]
pub extern "C" fn operator_new(size: usize) -> *mut c_void {
    plain_new(size)
}

/// `operator new[](size_t)`
#[unsafe(export_name = "_Znam")]
pub extern "C" fn operator_new_array(size: usize) -> *mut c_void {
    plain_new(size)
}

/// `operator new(size_t, nothrow_t const&)`
#[unsafe(export_name = "_ZnwmRKSt9nothrow_t")]
pub extern "C" fn operator_new_nothrow(size: usize, _tag: *const c_void) -> *mut c_void {
    plain_new(size)
}

/// `operator new[](size_t, nothrow_t const&)`
#[unsafe(export_name = "_ZnamRKSt9nothrow_t")]
pub extern "C" fn operator_new_array_nothrow(size: usize, _tag: *const c_void) -> *mut c_void {
    plain_new(size)
}

/// `operator new(size_t, align_val_t)`
#[unsafe(export_name = "_ZnwmSt11align_val_t")]
pub extern "C" fn operator_new_aligned(size: usize, align: usize) -> *mut c_void {
    aligned_new(size, align)
}

/// `operator new[](size_t, align_val_t)`
#[unsafe(export_name = "_ZnamSt11align_val_t")]
pub extern "C" fn operator_new_array_aligned(size: usize, align: usize) -> *mut c_void {
    aligned_new(size, align)
}

/// `operator new(size_t, align_val_t, nothrow_t const&)`
#[unsafe(export_name = "_ZnwmSt11align_val_tRKSt9nothrow_t")]
pub extern "C" fn operator_new_aligned_nothrow(
    size: usize,
    align: usize,
    _tag: *const c_void,
) -> *mut c_void {
    aligned_new(size, align)
}

/// `operator new[](size_t, align_val_t, nothrow_t const&)`
#[unsafe(export_name = "_ZnamSt11align_val_tRKSt9nothrow_t")]
pub extern "C" fn operator_new_array_aligned_nothrow(
    size: usize,
    align: usize,
    _tag: *const c_void,
) -> *mut c_void {
    aligned_new(size, align)
}

/// `operator delete(void*)`
///
/// # Safety
///
/// `ptr` must be null or a pointer from the operator new family.
#[unsafe(export_name = "_ZdlPv")]
pub unsafe extern "C" fn operator_delete(ptr: *mut c_void) {
    // SAFETY: forwarded caller contract.
    unsafe { dispose(ptr) };
}

/// `operator delete[](void*)`
///
/// # Safety
///
/// `ptr` must be null or a pointer from the operator new family.
#[unsafe(export_name = "_ZdaPv")]
pub unsafe extern "C" fn operator_delete_array(ptr: *mut c_void) {
    // SAFETY: forwarded caller contract.
    unsafe { dispose(ptr) };
}

/// `operator delete(void*, size_t)` -- the size hint is not needed, the
/// header already knows.
///
/// # Safety
///
/// `ptr` must be null or a pointer from the operator new family.
#[unsafe(export_name = "_ZdlPvm")]
pub unsafe extern "C" fn operator_delete_sized(ptr: *mut c_void, _size: usize) {
    // SAFETY: forwarded caller contract.
    unsafe { dispose(ptr) };
}

/// `operator delete[](void*, size_t)`
///
/// # Safety
///
/// `ptr` must be null or a pointer from the operator new family.
#[unsafe(export_name = "_ZdaPvm")]
pub unsafe extern "C" fn operator_delete_array_sized(ptr: *mut c_void, _size: usize) {
    // SAFETY: forwarded caller contract.
    unsafe { dispose(ptr) };
}

/// `operator delete(void*, nothrow_t const&)`
///
/// # Safety
///
/// `ptr` must be null or a pointer from the operator new family.
#[unsafe(export_name = "_ZdlPvRKSt9nothrow_t")]
pub unsafe extern "C" fn operator_delete_nothrow(ptr: *mut c_void, _tag: *const c_void) {
    // SAFETY: forwarded caller contract.
    unsafe { dispose(ptr) };
}

/// `operator delete[](void*, nothrow_t const&)`
///
/// # Safety
///
/// `ptr` must be null or a pointer from the operator new family.
#[unsafe(export_name = "_ZdaPvRKSt9nothrow_t")]
pub unsafe extern "C" fn operator_delete_array_nothrow(ptr: *mut c_void, _tag: *const c_void) {
    // SAFETY: forwarded caller contract.
    unsafe { dispose(ptr) };
}

/// `operator delete(void*, align_val_t)`
///
/// # Safety
///
/// `ptr` must be null or a pointer from the operator new family.
#[unsafe(export_name = "_ZdlPvSt11align_val_t")]
pub unsafe extern "C" fn operator_delete_aligned(ptr: *mut c_void, _align: usize) {
    // SAFETY: forwarded caller contract.
    unsafe { dispose(ptr) };
}

/// `operator delete[](void*, align_val_t)`
///
/// # Safety
///
/// `ptr` must be null or a pointer from the operator new family.
#[unsafe(export_name = "_ZdaPvSt11align_val_t")]
pub unsafe extern "C" fn operator_delete_array_aligned(ptr: *mut c_void, _align: usize) {
    // SAFETY: forwarded caller contract.
    unsafe { dispose(ptr) };
}

/// `operator delete(void*, size_t, align_val_t)`
///
/// # Safety
///
/// `ptr` must be null or a pointer from the operator new family.
#[unsafe(export_name = "_ZdlPvmSt11align_val_t")]
pub unsafe extern "C" fn operator_delete_sized_aligned(
    ptr: *mut c_void,
    _size: usize,
    _align: usize,
) {
    // SAFETY: forwarded caller contract.
    unsafe { dispose(ptr) };
}

/// `operator delete[](void*, size_t, align_val_t)`
///
/// # Safety
///
/// `ptr` must be null or a pointer from the operator new family.
#[unsafe(export_name = "_ZdaPvmSt11align_val_t")]
pub unsafe extern "C" fn operator_delete_array_sized_aligned(
    ptr: *mut c_void,
    _size: usize,
    _align: usize,
) {
    // SAFETY: forwarded caller contract.
    unsafe { dispose(ptr) };
}
