//! # pagepool-core
//!
//! A drop-in, lock-free, segregated buddy free-list heap allocator.
//!
//! Sixteen power-of-two size-class pools serve all small requests; pool
//! `i` holds blocks of exactly `1 << i` bytes, header included. Each pool
//! is a Treiber LIFO behind a single tagged compare-and-swap. An empty
//! pool refills by splitting one block from the class above; the cascade
//! ends at the top pool, which maps one block-sized span of anonymous
//! pages. Requests beyond the top class get a dedicated page-multiple
//! mapping and go straight back to the OS on free.
//!
//! Every returned pointer is preceded by a two-word in-band header that
//! records the block's class (or raw mapping length) and doubles as the
//! free-list link, so any freed pointer finds its pool without a metadata
//! table. While a block is live the link slot holds a self-pointer
//! sentinel that lets free reject stale pointers.
//!
//! There are no per-thread caches, no coalescing of buddies on free, and
//! no teardown: pools are static, zero-initialised, and live for the
//! whole process.

mod aligned;
mod alloc;
mod error;
mod global;
mod header;
mod os;
mod pool;
mod resize;
mod stats;

pub use aligned::allocate_aligned;
pub use alloc::{allocate, free, good_size, usable_size};
pub use error::AllocError;
pub use global::PagePool;
pub use header::HEADER_SIZE;
pub use os::page_size;
pub use pool::POOL_COUNT;
pub use resize::{allocate_counted, resize};
pub use stats::{bad_free_count, set_tuning};
