// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! A reset adapter must push a new stream through without touching the
//! allocator. Allocations are counted per thread so the test harness's own
//! threads do not interfere.

use block_pool::MultiPool;
use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;
use std::io::{Read, Write};
use zstream::{Compressor, Decompressor, Format, Level};

struct Counting;

thread_local! {
    static COUNTING: Cell<bool> = const { Cell::new(false) };
    static ALLOCATED: Cell<usize> = const { Cell::new(0) };
}

unsafe impl GlobalAlloc for Counting {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        record(layout.size());
        System.alloc(layout)
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        record(layout.size());
        System.alloc_zeroed(layout)
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        record(new_size);
        System.realloc(ptr, layout, new_size)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout)
    }
}

#[global_allocator]
static GLOBAL: Counting = Counting;

fn record(bytes: usize) {
    // `try_with` tolerates allocations during thread teardown.
    let _ = COUNTING.try_with(|on| {
        if on.get() {
            let _ = ALLOCATED.try_with(|n| n.set(n.get() + bytes));
        }
    });
}

/// Bytes allocated on this thread while `f` runs.
fn allocated_during(f: impl FnOnce()) -> usize {
    ALLOCATED.with(|n| n.set(0));
    COUNTING.with(|on| on.set(true));
    f();
    COUNTING.with(|on| on.set(false));
    ALLOCATED.with(|n| n.get())
}

fn payload(seed: u8) -> Vec<u8> {
    (0..200_000u32)
        .map(|i| b"pooled streams reuse their codec "[(i % 33) as usize] ^ seed ^ (i / 511) as u8)
        .collect()
}

/// Reads `reader` to the end into a fixed scratch buffer, checking it
/// against `expected`.
fn drain_and_check<R: Read>(reader: &mut R, expected: &[u8], scratch: &mut [u8]) -> usize {
    let mut total = 0;
    loop {
        let n = reader.read(scratch).unwrap();
        if n == 0 {
            return total;
        }
        assert_eq!(&scratch[..n], &expected[total..total + n]);
        total += n;
    }
}

#[test]
fn test_reset_streams_do_not_allocate() {
    let pool = MultiPool::new();
    let mut scratch = vec![0u8; 4096];

    for format in [Format::Gzip, Format::Zlib] {
        let (first, second) = (payload(1), payload(2));
        let mut packed = Vec::new();
        for data in [&first, &second] {
            let mut w =
                Compressor::with_pool(&pool, Vec::new(), format, Level::DEFAULT, 32 * 1024).unwrap();
            w.write_all(data).unwrap();
            packed.push(w.close().unwrap());
        }

        // ── Decompressor ──
        let mut reader = Decompressor::with_pool(&pool, &packed[0][..], 32 * 1024).unwrap();
        assert_eq!(drain_and_check(&mut reader, &first, &mut scratch), first.len());
        reader.reset(&packed[1][..]).unwrap();

        let mut read = 0;
        let bytes = allocated_during(|| {
            read = drain_and_check(&mut reader, &second, &mut scratch);
        });
        assert_eq!(read, second.len());
        assert!(reader.is_finished());
        assert_eq!(bytes, 0, "{format} decompressor allocated after reset");

        // ── Compressor ──
        let mut writer =
            Compressor::with_pool(&pool, Vec::new(), format, Level::DEFAULT, 32 * 1024).unwrap();
        writer.write_all(&first).unwrap();
        writer.finish().unwrap();
        let previous = writer.reset(Vec::with_capacity(second.len())).unwrap();
        assert_eq!(previous, packed[0]);

        let bytes = allocated_during(|| {
            writer.write_all(&second).unwrap();
            writer.finish().unwrap();
        });
        assert_eq!(bytes, 0, "{format} compressor allocated after reset");
        assert_eq!(writer.get_ref(), &packed[1]);
    }
}
