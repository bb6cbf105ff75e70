//! `GlobalAlloc` adapter.
//!
//! Lets Rust programs adopt the allocator wholesale:
//!
//! ```ignore
//! #[global_allocator]
//! static HEAP: pagepool_core::PagePool = pagepool_core::PagePool;
//! ```

use core::alloc::{GlobalAlloc, Layout};
use core::ptr::{self, NonNull};

use crate::aligned::allocate_aligned;
use crate::alloc::{allocate, free, usable_size};
use crate::header::HEADER_SIZE;
use crate::resize::resize;

/// The process-wide buddy heap as a Rust global allocator.
pub struct PagePool;

unsafe impl GlobalAlloc for PagePool {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let out = if layout.align() <= HEADER_SIZE {
            allocate(layout.size())
        } else {
            allocate_aligned(layout.align(), layout.size()).ok()
        };
        out.map_or(ptr::null_mut(), NonNull::as_ptr)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, _layout: Layout) {
        // SAFETY: `ptr` came from this allocator per the GlobalAlloc contract.
        unsafe { free(ptr) };
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        if layout.align() <= HEADER_SIZE {
            // SAFETY: `ptr` came from this allocator per the contract.
            return unsafe { resize(ptr, new_size) }.map_or(ptr::null_mut(), NonNull::as_ptr);
        }
        // Alignments above the header cannot ride the plain resize path:
        // the replacement block must be re-carved aligned.
        let Ok(fresh) = allocate_aligned(layout.align(), new_size) else {
            return ptr::null_mut();
        };
        if !ptr.is_null() {
            // SAFETY: `ptr` is live with `usable_size` readable bytes and
            // `fresh` holds at least `new_size`.
            unsafe {
                let keep = usable_size(ptr).min(new_size);
                ptr::copy_nonoverlapping(ptr, fresh.as_ptr(), keep);
                free(ptr);
            }
        }
        fresh.as_ptr()
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        // SAFETY: same contract as `alloc`.
        let out = unsafe { self.alloc(layout) };
        if !out.is_null() {
            // SAFETY: `out` holds at least `layout.size()` usable bytes.
            unsafe { ptr::write_bytes(out, 0, layout.size()) };
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_honours_large_alignments() {
        let heap = PagePool;
        let layout = Layout::from_size_align(64, 4096).expect("valid layout");
        // SAFETY: layout is valid; pointer freed below.
        unsafe {
            let ptr = heap.alloc(layout);
            assert!(!ptr.is_null());
            assert_eq!(ptr as usize % 4096, 0);
            heap.dealloc(ptr, layout);
        }
    }

    #[test]
    fn realloc_keeps_alignment_and_contents() {
        let heap = PagePool;
        let layout = Layout::from_size_align(32, 512).expect("valid layout");
        // SAFETY: layout is valid; every pointer below is live when used.
        unsafe {
            let ptr = heap.alloc(layout);
            assert!(!ptr.is_null());
            ptr::write_bytes(ptr, 0x42, 32);
            let grown = heap.realloc(ptr, layout, 10_000);
            assert!(!grown.is_null());
            assert_eq!(grown as usize % 512, 0);
            assert_eq!(*grown.add(31), 0x42);
            heap.dealloc(grown, Layout::from_size_align(10_000, 512).expect("valid layout"));
        }
    }

    #[test]
    fn alloc_zeroed_zeroes() {
        let heap = PagePool;
        let layout = Layout::from_size_align(96, 8).expect("valid layout");
        // SAFETY: layout is valid; pointer freed below.
        unsafe {
            let ptr = heap.alloc_zeroed(layout);
            assert!(!ptr.is_null());
            for i in 0..96 {
                assert_eq!(*ptr.add(i), 0);
            }
            heap.dealloc(ptr, layout);
        }
    }
}
