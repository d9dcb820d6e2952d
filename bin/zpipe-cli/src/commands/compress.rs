// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `zpipe compress` command: stream a file or stdin through a gzip/zlib compressor.

use anyhow::Context;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Instant;
use zstream::{CodecConfig, Compressor, Format, Level};

pub fn execute(
    mut config: CodecConfig,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    format: Option<Format>,
    level: Option<u32>,
) -> anyhow::Result<()> {
    // ── Resolve settings ──
    if let Some(f) = format {
        config.format = f;
    }
    if let Some(l) = level {
        config.level = Level::new(l);
    }
    config.validate()?;
    let work = config.work_buffer_bytes()?;

    tracing::info!(
        "compressing {} -> {} ({}, work buffer {})",
        describe(input.as_ref(), "stdin"),
        describe(output.as_ref(), "stdout"),
        config.mode(),
        config.work_buffer
    );

    // ── Transform ──
    let start = Instant::now();
    let mut reader = super::open_input(input.as_ref())?;
    let writer = super::open_output(output.as_ref())?;
    let mut encoder = Compressor::with_pool(
        block_pool::global(),
        writer,
        config.format,
        config.level,
        work,
    )?;

    io::copy(&mut reader, &mut encoder).context("compression failed")?;
    let (total_in, total_out) = (encoder.total_in(), encoder.total_out());
    let mut writer = encoder.close()?;
    writer.flush().context("cannot flush output")?;

    // ── Report ──
    let ratio = if total_in > 0 {
        total_out as f64 / total_in as f64 * 100.0
    } else {
        0.0
    };
    tracing::info!(
        "{} bytes in, {} bytes out ({:.1}%) in {:.2?}",
        total_in,
        total_out,
        ratio,
        start.elapsed()
    );
    tracing::debug!("{}", block_pool::global().stats().summary());

    Ok(())
}

pub(crate) fn describe(path: Option<&PathBuf>, fallback: &str) -> String {
    path.map(|p| p.display().to_string())
        .unwrap_or_else(|| fallback.to_string())
}
