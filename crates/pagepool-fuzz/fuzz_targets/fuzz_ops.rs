#![no_main]
use libfuzzer_sys::fuzz_target;

// Interpret the input as a sequence of alloc/free/resize/aligned ops and
// check that every live block keeps the byte pattern written into it.
fuzz_target!(|data: &[u8]| {
    let mut live: Vec<(*mut u8, usize, u8)> = Vec::new();

    for chunk in data.chunks_exact(4) {
        let op = chunk[0] % 4;
        let arg = u16::from_le_bytes([chunk[1], chunk[2]]) as usize;
        let tag = chunk[3] | 1;

        match op {
            0 => {
                if let Some(ptr) = pagepool_core::allocate(arg) {
                    // SAFETY: freshly allocated with at least `arg` bytes.
                    unsafe { std::ptr::write_bytes(ptr.as_ptr(), tag, arg) };
                    live.push((ptr.as_ptr(), arg, tag));
                }
            }
            1 => {
                if !live.is_empty() {
                    let (ptr, size, tag) = live.swap_remove(arg % live.len());
                    // SAFETY: the block is live and holds `tag` bytes.
                    unsafe {
                        if size > 0 {
                            assert_eq!(*ptr.add(size - 1), tag);
                        }
                        pagepool_core::free(ptr);
                    }
                }
            }
            2 => {
                if !live.is_empty() {
                    let idx = arg % live.len();
                    let (ptr, size, tag) = live[idx];
                    let new_size = usize::from(chunk[3]) * 32;
                    // SAFETY: the block is live; resize consumes it.
                    match unsafe { pagepool_core::resize(ptr, new_size) } {
                        Some(grown) => {
                            // SAFETY: the prefix survived the move.
                            unsafe {
                                let keep = size.min(new_size);
                                if keep > 0 {
                                    assert_eq!(*grown.as_ptr().add(keep - 1), tag);
                                }
                                std::ptr::write_bytes(grown.as_ptr(), tag, new_size);
                            }
                            live[idx] = (grown.as_ptr(), new_size, tag);
                        }
                        None => {
                            // new_size == 0 freed the block; any other
                            // failure leaves the old block live.
                            if new_size == 0 {
                                live.swap_remove(idx);
                            }
                        }
                    }
                }
            }
            _ => {
                let align = 1usize << (chunk[3] % 18);
                if let Ok(ptr) = pagepool_core::allocate_aligned(align, arg) {
                    assert_eq!(ptr.as_ptr() as usize % align, 0);
                    // SAFETY: freshly allocated with at least `arg` bytes.
                    unsafe { std::ptr::write_bytes(ptr.as_ptr(), tag, arg) };
                    live.push((ptr.as_ptr(), arg, tag));
                }
            }
        }
    }

    for (ptr, size, tag) in live {
        // SAFETY: every tracked block is still live.
        unsafe {
            if size > 0 {
                assert_eq!(*ptr.add(size - 1), tag);
            }
            pagepool_core::free(ptr);
        }
    }
});
