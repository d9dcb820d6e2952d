// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `zpipe decompress` command: inflate a gzip or zlib stream.

use anyhow::Context;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Instant;
use zstream::{CodecConfig, Decompressor};

use super::compress::describe;

pub fn execute(
    config: CodecConfig,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let work = config.work_buffer_bytes()?;
    tracing::info!(
        "decompressing {} -> {} (work buffer {})",
        describe(input.as_ref(), "stdin"),
        describe(output.as_ref(), "stdout"),
        config.work_buffer
    );

    let start = Instant::now();
    let reader = super::open_input(input.as_ref())?;
    let mut writer = super::open_output(output.as_ref())?;
    let mut decoder = Decompressor::with_pool(block_pool::global(), reader, work)?;

    io::copy(&mut decoder, &mut writer).context("decompression failed")?;
    writer.flush().context("cannot flush output")?;

    // A source that ends before the trailer is not a read error.
    if !decoder.is_finished() {
        anyhow::bail!(
            "input ended before the end of the compressed stream ({} bytes read)",
            decoder.total_in()
        );
    }

    tracing::info!(
        "{} bytes in, {} bytes out in {:.2?}",
        decoder.total_in(),
        decoder.total_out(),
        start.elapsed()
    );
    tracing::debug!("{}", block_pool::global().stats().summary());

    Ok(())
}
