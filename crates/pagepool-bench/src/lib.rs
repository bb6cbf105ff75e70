//! Benchmark-only crate; see `benches/malloc_throughput.rs`.
