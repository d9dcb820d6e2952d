// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `zpipe roundtrip` command: compress, decompress and verify data through
//! one reused transformer pair, then report pool behaviour.

use anyhow::Context;
use block_pool::ByteSize;
use std::io::{Cursor, Read, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use zstream::{CodecConfig, Compressor, Decompressor};

pub fn execute(
    config: CodecConfig,
    input: Option<PathBuf>,
    size: String,
    repeat: usize,
    json: bool,
) -> anyhow::Result<()> {
    let data = match &input {
        Some(p) => std::fs::read(p).with_context(|| format!("cannot read '{}'", p.display()))?,
        None => generate(ByteSize::parse(&size)?.as_bytes()),
    };
    let repeat = repeat.max(1);
    let pool = block_pool::global();
    let work = config.work_buffer_bytes()?;

    // ── Setup ──
    let mut encoder =
        Compressor::with_pool(pool, Vec::new(), config.format, config.level, work)?;
    let mut decoder = Decompressor::with_pool(pool, Cursor::new(Vec::new()), work)?;
    let mut spare = Vec::new();
    let mut restored = Vec::with_capacity(data.len());
    let mut packed_len = 0;
    let mut compress_time = Duration::ZERO;
    let mut decompress_time = Duration::ZERO;

    // ── Run ──
    for i in 0..repeat {
        let start = Instant::now();
        encoder.write_all(&data)?;
        encoder.finish()?;
        spare.clear();
        let packed = encoder.reset(spare)?;
        compress_time += start.elapsed();
        packed_len = packed.len();

        // The previous round's compressed buffer becomes the next sink.
        let start = Instant::now();
        restored.clear();
        spare = decoder.reset(Cursor::new(packed))?.into_inner();
        decoder.read_to_end(&mut restored)?;
        decompress_time += start.elapsed();

        if restored != data {
            anyhow::bail!("round {i}: decompressed output differs from the input");
        }
        tracing::debug!("round {}: {} -> {} bytes", i, data.len(), packed_len);
    }

    let stats = pool.stats();

    if json {
        let report = serde_json::json!({
            "mode": config.mode().to_string(),
            "input_bytes": data.len(),
            "compressed_bytes": packed_len,
            "rounds": repeat,
            "compress_ms": compress_time.as_secs_f64() * 1e3,
            "decompress_ms": decompress_time.as_secs_f64() * 1e3,
            "pool": stats,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    // ── Report ──
    println!("╔══════════════════════════════════════════╗");
    println!("║            zpipe roundtrip               ║");
    println!("╚══════════════════════════════════════════╝");
    println!();
    println!("  Mode:         {}", config.mode());
    println!("  Input:        {}", ByteSize::from_bytes(data.len()));
    println!(
        "  Compressed:   {} ({:.1}%)",
        ByteSize::from_bytes(packed_len),
        ratio(packed_len, data.len())
    );
    println!("  Rounds:       {repeat} (all verified)");
    println!("  Compress:     {:.2?} per round", compress_time / repeat as u32);
    println!("  Decompress:   {:.2?} per round", decompress_time / repeat as u32);

    println!();
    println!("── Pool Classes ──");
    println!(
        "  {:>10} {:>8} {:>8} {:>8} {:>8}",
        "block", "blocks", "free", "hits", "misses"
    );
    for class in stats.active_classes() {
        println!(
            "  {:>10} {:>8} {:>8} {:>8} {:>8}",
            ByteSize::from_bytes(class.block_size).to_string(),
            class.blocks_allocated,
            class.blocks_available,
            class.hits,
            class.misses
        );
    }
    println!();
    println!("  {}", stats.summary());

    Ok(())
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Semi-compressible text-like data.
fn generate(len: usize) -> Vec<u8> {
    const WORDS: [&[u8]; 8] = [
        b"block ", b"pool ", b"stream ", b"deflate ", b"window ", b"huffman ", b"crc ", b"\n",
    ];
    let mut state: u32 = 0x9e37_79b9;
    let mut out = Vec::with_capacity(len);
    while out.len() < len {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        out.extend_from_slice(WORDS[(state % 8) as usize]);
    }
    out.truncate(len);
    out
}
