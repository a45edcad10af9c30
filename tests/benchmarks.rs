/*
 * Performance sanity checks for the allocator.
 *
 * These tests ensure we don't regress catastrophically on throughput.
 * They use wide tolerances to avoid flaky failures on CI systems under
 * load; for precise numbers run them in isolation on an idle machine.
 *
 * Run with: cargo test --release --test benchmarks
 * The --release flag is important for realistic numbers.
 */

#![allow(clippy::uninlined_format_args)]

use std::time::{Duration, Instant};

use brkheap::Heap;

/* =========================================================================
 * PAIRED ALLOCATE/RELEASE - the pure tail-shrink fast path
 * ========================================================================= */

#[test]
fn bench_paired_allocate_release() {
    /*
     * Allocate and immediately release: every release takes the shrink
     * path, the registry never grows past one entry, and the backing
     * capacity is reused throughout. This is the cheapest possible
     * workload; it should be very fast.
     */
    let heap = Heap::new();
    let iterations = 100_000u32;
    let start = Instant::now();

    for i in 0..iterations {
        let size = 1 + (i as usize % 512);
        let handle = heap.allocate(size).expect("allocate should succeed");
        heap.release(Some(handle));
    }

    let total = start.elapsed();
    println!(
        "paired allocate/release: {:?} total, {:?} per pair ({} pairs)",
        total,
        total / iterations,
        iterations
    );

    assert!(
        total < Duration::from_secs(5),
        "paired allocate/release too slow: {:?}",
        total
    );
}

/* =========================================================================
 * FIRST-FIT SCAN - reuse against a long registry
 * ========================================================================= */

#[test]
fn bench_first_fit_reuse_with_long_list() {
    /*
     * Build a registry of a few thousand blocks and free only the back
     * half, so every reuse scans past two thousand in-use blocks before
     * the first fit. The scan is linear on purpose; this pins down
     * "linear and acceptable", not "accidentally quadratic".
     */
    let heap = Heap::new();
    let blocks: Vec<_> = (0..4_000)
        .map(|_| heap.allocate(8).expect("allocate should succeed"))
        .collect();
    /* free the second half (minus the tail pin): every scan now walks
     * 2000 in-use blocks before the first fit */
    for handle in &blocks[2_000..3_999] {
        heap.release(Some(*handle));
    }

    let iterations = 10_000u32;
    let start = Instant::now();
    for _ in 0..iterations {
        let handle = heap.allocate(8).expect("reuse should succeed");
        heap.release(Some(handle));
    }
    let total = start.elapsed();
    println!(
        "first-fit reuse over ~4k blocks: {:?} total, {:?} per cycle",
        total,
        total / iterations
    );

    assert!(
        total < Duration::from_secs(10),
        "first-fit reuse too slow: {:?}",
        total
    );
}

/* =========================================================================
 * CONTENDED THROUGHPUT - the single lock under load
 * ========================================================================= */

#[test]
fn bench_contended_allocate_release() {
    /*
     * All threads fight over the one lock. Throughput per thread drops,
     * but the total must stay within an order of magnitude of sane.
     */
    let heap = Heap::new();
    let threads = 4;
    let per_thread = 25_000u32;
    let start = Instant::now();

    std::thread::scope(|scope| {
        for _ in 0..threads {
            let heap = &heap;
            scope.spawn(move || {
                for i in 0..per_thread {
                    let handle = heap
                        .allocate(1 + (i as usize % 128))
                        .expect("allocate should succeed");
                    heap.release(Some(handle));
                }
            });
        }
    });

    let total = start.elapsed();
    println!(
        "contended allocate/release: {:?} total for {} threads x {} pairs",
        total, threads, per_thread
    );

    assert!(
        total < Duration::from_secs(20),
        "contended throughput too slow: {:?}",
        total
    );
}
