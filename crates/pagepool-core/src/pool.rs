//! Size-class free-list pools.
//!
//! One Treiber-style LIFO per power-of-two size class, each protected by a
//! single compare-and-swap on its head word. Pools are static, start empty,
//! and live for the whole process; blocks pushed here are never returned to
//! the OS.
//!
//! The head word packs the block address into the low 48 bits and a
//! monotonic tag into the upper 16. The tag is bumped on every successful
//! push and pop, so the classical ABA interleaving (a popper stalls between
//! reading the head and its link, the head block is recycled and re-pushed)
//! fails its compare-and-swap and retries instead of installing a stale
//! link.

use core::ptr::NonNull;
use core::sync::atomic::{AtomicU64, Ordering};

use crate::header::Header;
use crate::stats;

/// Number of size-class pools. Pool `i` holds blocks of exactly `1 << i`
/// bytes, header included.
pub const POOL_COUNT: usize = 16;

/// Index of the only pool that refills from the OS.
pub(crate) const TOP_CLASS: usize = POOL_COUNT - 1;

/// Byte length of a top-class block, and of every span requested for refill.
pub(crate) const TOP_BLOCK_SIZE: usize = 1 << TOP_CLASS;

/// Low 48 bits of the head word hold the block address; Linux user-space
/// addresses fit there on every supported 64-bit target.
const ADDR_MASK: u64 = (1 << 48) - 1;

const _: () = assert!(usize::BITS == 64);

fn pack(block: *mut Header, tag: u16) -> u64 {
    (block as u64 & ADDR_MASK) | (u64::from(tag) << 48)
}

fn unpack_block(word: u64) -> *mut Header {
    (word & ADDR_MASK) as *mut Header
}

fn unpack_tag(word: u64) -> u16 {
    (word >> 48) as u16
}

/// A single size-class pool.
pub(crate) struct Pool {
    head: AtomicU64,
}

impl Pool {
    const fn new() -> Self {
        Self {
            head: AtomicU64::new(0),
        }
    }

    /// Pops the most recently pushed block, or `None` if the pool is
    /// observed empty (the caller falls through to refill).
    pub(crate) fn pop(&self, class: usize) -> Option<NonNull<Header>> {
        let mut observed = self.head.load(Ordering::Acquire);
        loop {
            let block = NonNull::new(unpack_block(observed))?;
            // SAFETY: blocks reachable from a pool head stay mapped forever.
            // The link word is atomic; if another thread already won this
            // block and restamped it, the tag check below rejects our CAS.
            let next = unsafe { (*block.as_ptr()).next.load(Ordering::Relaxed) };
            let replacement = pack(next, unpack_tag(observed).wrapping_add(1));
            match self.head.compare_exchange_weak(
                observed,
                replacement,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    stats::note_pool_pop(class);
                    return Some(block);
                }
                Err(current) => observed = current,
            }
        }
    }

    /// Pushes a block whose header is already stamped with this pool's
    /// index. The release CAS publishes the stamp along with the link.
    pub(crate) fn push(&self, block: NonNull<Header>, class: usize) {
        let mut observed = self.head.load(Ordering::Relaxed);
        loop {
            // SAFETY: the caller owns `block`; nothing else writes its link
            // until the CAS below publishes it.
            unsafe {
                (*block.as_ptr())
                    .next
                    .store(unpack_block(observed), Ordering::Relaxed);
            }
            let replacement = pack(block.as_ptr(), unpack_tag(observed).wrapping_add(1));
            match self.head.compare_exchange_weak(
                observed,
                replacement,
                Ordering::Release,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    stats::note_pool_push(class);
                    return;
                }
                Err(current) => observed = current,
            }
        }
    }
}

/// The process-wide pool array. Static zero-initialisation doubles as the
/// empty state, so there is no one-time init on any entry point.
pub(crate) static POOLS: [Pool; POOL_COUNT] = [const { Pool::new() }; POOL_COUNT];

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicPtr;

    fn fresh_block() -> NonNull<Header> {
        let boxed = Box::new(Header {
            size: 0,
            next: AtomicPtr::new(core::ptr::null_mut()),
        });
        NonNull::new(Box::into_raw(boxed)).unwrap()
    }

    fn release(block: NonNull<Header>) {
        // SAFETY: test blocks come from `fresh_block`.
        drop(unsafe { Box::from_raw(block.as_ptr()) });
    }

    #[test]
    fn pop_on_empty_pool_is_none() {
        let pool = Pool::new();
        assert!(pool.pop(0).is_none());
    }

    #[test]
    fn push_pop_is_lifo() {
        let pool = Pool::new();
        let a = fresh_block();
        let b = fresh_block();
        pool.push(a, 0);
        pool.push(b, 0);
        assert_eq!(pool.pop(0), Some(b));
        assert_eq!(pool.pop(0), Some(a));
        assert!(pool.pop(0).is_none());
        release(a);
        release(b);
    }

    #[test]
    fn tag_survives_many_generations() {
        // Drive the 16-bit tag through several wraps on a single block.
        let pool = Pool::new();
        let block = fresh_block();
        for _ in 0..200_000 {
            pool.push(block, 0);
            assert_eq!(pool.pop(0), Some(block));
        }
        release(block);
    }

    #[test]
    fn concurrent_push_pop_conserves_blocks() {
        use std::collections::HashSet;
        use std::sync::Arc;

        let pool = Arc::new(Pool::new());
        let per_thread = 64;
        let threads = 4;

        // Threads trade in raw addresses; NonNull is not Send.
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let pool = Arc::clone(&pool);
                std::thread::spawn(move || {
                    let mut held: Vec<usize> =
                        (0..per_thread).map(|_| fresh_block().as_ptr() as usize).collect();
                    for _ in 0..500 {
                        for addr in held.drain(..) {
                            let block = NonNull::new(addr as *mut Header).unwrap();
                            pool.push(block, 0);
                        }
                        while held.len() < per_thread {
                            if let Some(block) = pool.pop(0) {
                                held.push(block.as_ptr() as usize);
                            } else {
                                std::hint::spin_loop();
                            }
                        }
                    }
                    held
                })
            })
            .collect();

        let mut all: Vec<usize> = Vec::new();
        for handle in handles {
            all.extend(handle.join().expect("worker thread panicked"));
        }
        // Every block injected is accounted for exactly once.
        let distinct: HashSet<usize> = all.iter().copied().collect();
        assert_eq!(distinct.len(), threads * per_thread);
        assert!(pool.pop(0).is_none());
        for addr in all {
            release(NonNull::new(addr as *mut Header).unwrap());
        }
    }
}
