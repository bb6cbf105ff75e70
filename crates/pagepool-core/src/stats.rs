//! Allocation statistics and the dump-at-exit report.
//!
//! All counters are process-wide atomics; races that slightly misreport are
//! tolerated, the counters are advisory and not part of the correctness
//! contract. The bad-free counter is always present (rejected frees are
//! counted, not propagated); everything else sits behind the `stats`
//! feature.

use core::sync::atomic::{AtomicU64, Ordering};

#[cfg(feature = "stats")]
use crate::pool::POOL_COUNT;

static BAD_FREES: AtomicU64 = AtomicU64::new(0);

/// Counts a free whose pointer failed the live-sentinel check.
pub(crate) fn note_bad_free() {
    BAD_FREES.fetch_add(1, Ordering::Relaxed);
}

/// Number of frees rejected by the live-sentinel check so far.
pub fn bad_free_count() -> u64 {
    BAD_FREES.load(Ordering::Relaxed)
}

#[cfg(feature = "stats")]
mod counters {
    use super::*;

    pub(crate) struct PoolCounters {
        /// Allocation requests routed at this class.
        pub(crate) alloc_calls: AtomicU64,
        /// Blocks of this class currently handed out.
        pub(crate) live_blocks: AtomicU64,
        /// Blocks currently sitting free in this pool.
        pub(crate) free_blocks: AtomicU64,
    }

    impl PoolCounters {
        const fn new() -> Self {
            Self {
                alloc_calls: AtomicU64::new(0),
                live_blocks: AtomicU64::new(0),
                free_blocks: AtomicU64::new(0),
            }
        }
    }

    pub(crate) static POOL_COUNTERS: [PoolCounters; POOL_COUNT] =
        [const { PoolCounters::new() }; POOL_COUNT];

    pub(crate) static ALLOC_CALLS: AtomicU64 = AtomicU64::new(0);
    pub(crate) static ALIGNED_CALLS: AtomicU64 = AtomicU64::new(0);
    pub(crate) static RESIZE_CALLS: AtomicU64 = AtomicU64::new(0);
    pub(crate) static TUNING_CALLS: AtomicU64 = AtomicU64::new(0);
}

#[cfg(feature = "stats")]
use counters::*;

#[cfg(feature = "stats")]
pub(crate) fn note_class_request(class: usize) {
    POOL_COUNTERS[class].alloc_calls.fetch_add(1, Ordering::Relaxed);
}

#[cfg(feature = "stats")]
pub(crate) fn note_pool_pop(class: usize) {
    let c = &POOL_COUNTERS[class];
    c.live_blocks.fetch_add(1, Ordering::Relaxed);
    c.free_blocks.fetch_sub(1, Ordering::Relaxed);
}

#[cfg(feature = "stats")]
pub(crate) fn note_pool_push(class: usize) {
    let c = &POOL_COUNTERS[class];
    c.live_blocks.fetch_sub(1, Ordering::Relaxed);
    c.free_blocks.fetch_add(1, Ordering::Relaxed);
}

#[cfg(feature = "stats")]
pub(crate) fn note_top_refill(class: usize) {
    POOL_COUNTERS[class].live_blocks.fetch_add(1, Ordering::Relaxed);
}

/// One class-(i+1) live block becomes two class-i live blocks; the spare
/// half is re-counted by the push that follows.
#[cfg(feature = "stats")]
pub(crate) fn note_split(class: usize) {
    POOL_COUNTERS[class + 1]
        .live_blocks
        .fetch_sub(1, Ordering::Relaxed);
    POOL_COUNTERS[class].live_blocks.fetch_add(2, Ordering::Relaxed);
}

#[cfg(feature = "stats")]
pub(crate) fn note_alloc() {
    ALLOC_CALLS.fetch_add(1, Ordering::Relaxed);
}

#[cfg(feature = "stats")]
pub(crate) fn note_aligned() {
    ALIGNED_CALLS.fetch_add(1, Ordering::Relaxed);
}

#[cfg(feature = "stats")]
pub(crate) fn note_resize() {
    RESIZE_CALLS.fetch_add(1, Ordering::Relaxed);
}

#[cfg(feature = "stats")]
pub(crate) fn note_tuning() {
    TUNING_CALLS.fetch_add(1, Ordering::Relaxed);
}

#[cfg(not(feature = "stats"))]
mod noop {
    pub(crate) fn note_class_request(_class: usize) {}
    pub(crate) fn note_pool_pop(_class: usize) {}
    pub(crate) fn note_pool_push(_class: usize) {}
    pub(crate) fn note_top_refill(_class: usize) {}
    pub(crate) fn note_split(_class: usize) {}
    pub(crate) fn note_alloc() {}
    pub(crate) fn note_aligned() {}
    pub(crate) fn note_resize() {}
    pub(crate) fn note_tuning() {}
}

#[cfg(not(feature = "stats"))]
pub(crate) use noop::*;

/// Tuning hook behind `mallopt`. Every parameter is accepted and ignored.
pub fn set_tuning(_param: i32, _value: i32) -> bool {
    note_tuning();
    true
}

/// Registers the exit-time report writer once. Called from the allocation
/// entry points so a process that never allocates never registers it.
#[cfg(feature = "stats")]
pub(crate) fn ensure_exit_report() {
    use std::sync::Once;
    static REGISTER: Once = Once::new();
    REGISTER.call_once(|| {
        // SAFETY: the handler is an extern "C" fn with no preconditions.
        unsafe { libc::atexit(report_at_exit) };
    });
}

#[cfg(not(feature = "stats"))]
pub(crate) fn ensure_exit_report() {}

#[cfg(feature = "stats")]
extern "C" fn report_at_exit() {
    use std::fs::File;
    use std::path::PathBuf;

    let path = std::env::var_os("PAGEPOOL_STATS_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(format!("/tmp/pagepool.log-{}", std::process::id())));
    if let Ok(mut out) = File::create(path) {
        let _ = render_report(&mut out);
    }
}

/// Writes the human-readable report: global counters followed by one
/// `class: requests live free` line per pool.
#[cfg(feature = "stats")]
pub(crate) fn render_report<W: std::io::Write>(out: &mut W) -> std::io::Result<()> {
    writeln!(out, "-------")?;
    writeln!(out, "page size.......: {}", crate::os::page_size())?;
    writeln!(out, "pool count......: {POOL_COUNT}")?;
    writeln!(out, "bad free........: {}", bad_free_count())?;
    writeln!(out, "alloc...........: {}", ALLOC_CALLS.load(Ordering::Relaxed))?;
    writeln!(out, "aligned alloc...: {}", ALIGNED_CALLS.load(Ordering::Relaxed))?;
    writeln!(out, "resize..........: {}", RESIZE_CALLS.load(Ordering::Relaxed))?;
    writeln!(out, "tuning..........: {}", TUNING_CALLS.load(Ordering::Relaxed))?;
    for (class, c) in POOL_COUNTERS.iter().enumerate() {
        writeln!(
            out,
            "{class}: {} {} {}",
            c.alloc_calls.load(Ordering::Relaxed),
            c.live_blocks.load(Ordering::Relaxed),
            c.free_blocks.load(Ordering::Relaxed),
        )?;
    }
    writeln!(out, "-------")
}
