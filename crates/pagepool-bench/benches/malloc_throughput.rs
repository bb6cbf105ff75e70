//! Allocator throughput benchmarks.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use pagepool_core::{allocate, allocate_aligned, free, resize};

fn bench_alloc_free_cycle(c: &mut Criterion) {
    let sizes: &[usize] = &[16, 64, 256, 1024, 4096, 32768, 262_144];
    let mut group = c.benchmark_group("alloc_free_cycle");

    for &size in sizes {
        group.bench_with_input(BenchmarkId::new("pagepool", size), &size, |b, &sz| {
            b.iter(|| {
                let ptr = allocate(sz).expect("allocation");
                // SAFETY: live pointer, freed immediately.
                unsafe { free(criterion::black_box(ptr).as_ptr()) };
            });
        });
    }
    group.finish();
}

fn bench_alloc_burst(c: &mut Criterion) {
    let mut group = c.benchmark_group("alloc_burst");

    group.bench_function("1000x64B", |b| {
        let mut held = Vec::with_capacity(1000);
        b.iter(|| {
            for _ in 0..1000 {
                held.push(allocate(64).expect("allocation"));
            }
            for ptr in held.drain(..) {
                // SAFETY: live pointer, freed exactly once.
                unsafe { free(ptr.as_ptr()) };
            }
        });
    });

    group.finish();
}

fn bench_aligned(c: &mut Criterion) {
    let mut group = c.benchmark_group("aligned_alloc");

    for align in [64usize, 4096, 16384] {
        group.bench_with_input(BenchmarkId::new("align", align), &align, |b, &al| {
            b.iter(|| {
                let ptr = allocate_aligned(al, 256).expect("aligned allocation");
                // SAFETY: live pointer, freed immediately.
                unsafe { free(criterion::black_box(ptr).as_ptr()) };
            });
        });
    }
    group.finish();
}

fn bench_resize_ladder(c: &mut Criterion) {
    c.bench_function("resize_ladder", |b| {
        b.iter(|| {
            let mut ptr = allocate(16).expect("allocation").as_ptr();
            for size in [64usize, 512, 4096, 65536] {
                // SAFETY: `ptr` stays live across the ladder.
                ptr = unsafe { resize(ptr, size) }.expect("regrow").as_ptr();
            }
            // SAFETY: final pointer is live.
            unsafe { free(ptr) };
        });
    });
}

criterion_group!(
    benches,
    bench_alloc_free_cycle,
    bench_alloc_burst,
    bench_aligned,
    bench_resize_ladder
);
criterion_main!(benches);
