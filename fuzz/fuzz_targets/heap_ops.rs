/*
 * fuzz_targets/heap_ops.rs
 *
 * fuzz target for the allocator's whole public surface. interprets the
 * input as a tape of operations over one heap and requires that nothing
 * ever panics - every misuse the safe API can express (dead handles,
 * overruns, zero sizes, overflowing products) must come back as a value.
 *
 * edge cases: release of stale handles, reallocate of released blocks,
 * reads at wild offsets, zero counts, usize::MAX products
 */

#![no_main]

use libfuzzer_sys::fuzz_target;

use brkheap::{Handle, Heap, HeapConfig};

fuzz_target!(|data: &[u8]| {
    /* cap the break so the fuzzer can explore exhaustion cheaply */
    let heap = Heap::with_config(HeapConfig {
        limit: Some(1 << 20),
        ..Default::default()
    });
    let mut handles: Vec<Handle> = Vec::new();

    let mut tape = data.iter().copied();
    while let (Some(op), Some(a), Some(b)) = (tape.next(), tape.next(), tape.next()) {
        let a = a as usize;
        let b = b as usize;
        match op % 8 {
            0 => {
                if let Ok(handle) = heap.allocate(a * 17) {
                    handles.push(handle);
                }
            }
            1 => {
                if let Ok(handle) = heap.zero_allocate(a, b) {
                    handles.push(handle);
                }
            }
            2 => {
                /* release a tracked handle; duplicates stay in the pool
                 * on purpose so later ops hit dead handles */
                if !handles.is_empty() {
                    let handle = handles[a % handles.len()];
                    heap.release(Some(handle));
                }
            }
            3 => {
                heap.release(None);
            }
            4 => {
                if !handles.is_empty() {
                    let slot = a % handles.len();
                    if let Ok(resized) = heap.reallocate(Some(handles[slot]), b * 13) {
                        handles[slot] = resized;
                    }
                }
            }
            5 => {
                if !handles.is_empty() {
                    let handle = handles[a % handles.len()];
                    let mut buf = [0u8; 32];
                    let _ = heap.read(handle, b * 7, &mut buf);
                }
            }
            6 => {
                if !handles.is_empty() {
                    let handle = handles[a % handles.len()];
                    let _ = heap.write(handle, b, &[0xC3; 16]);
                    let _ = heap.fill(handle, b as u8);
                }
            }
            _ => {
                /* introspection must hold under any interleaving; dead
                 * handles included */
                if !handles.is_empty() {
                    let _ = heap.usable_size(handles[b % handles.len()]);
                }
                let _ = heap.blocks();
                let _ = heap.brk();
            }
        }
    }
});
