// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # zpipe
//!
//! Command-line interface for the zstream gzip/zlib pipeline.
//!
//! ## Usage
//! ```bash
//! # Compress stdin to stdout
//! zpipe compress < access.log > access.log.gz
//!
//! # zlib framing, maximum level, explicit files
//! zpipe compress --format zlib --level 9 -i data.bin -o data.bin.zz
//!
//! # Decompress gzip or zlib (auto-detected)
//! zpipe decompress -i access.log.gz -o access.log
//!
//! # Compress, decompress and verify; print pool statistics
//! zpipe roundtrip --size 4M --repeat 8
//! ```

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use zstream::Format;

#[derive(Parser)]
#[command(
    name = "zpipe",
    about = "Streaming gzip/zlib compression over pooled buffers",
    version,
    author
)]
struct Cli {
    /// Path to a TOML configuration file (explicit flags take precedence).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a file or stdin.
    Compress {
        /// Input file (defaults to stdin).
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output file (defaults to stdout).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output framing: gzip or zlib.
        #[arg(short, long)]
        format: Option<Format>,

        /// Compression level, 0 through 9.
        #[arg(short, long)]
        level: Option<u32>,
    },

    /// Decompress a gzip or zlib file or stdin.
    Decompress {
        /// Input file (defaults to stdin).
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output file (defaults to stdout).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compress and decompress through the pool, verify, and report.
    Roundtrip {
        /// Input file (defaults to generated data of --size bytes).
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Size of the generated data (e.g., "1M", "64K").
        #[arg(short, long, default_value = "1M")]
        size: String,

        /// Number of streams pushed through one reused transformer pair.
        #[arg(short, long, default_value_t = 4)]
        repeat: usize,

        /// Print pool statistics as JSON.
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing/logging based on verbosity.
    commands::init_tracing(cli.verbose);

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Compress {
            input,
            output,
            format,
            level,
        } => commands::compress::execute(config, input, output, format, level),
        Commands::Decompress { input, output } => {
            commands::decompress::execute(config, input, output)
        }
        Commands::Roundtrip {
            input,
            size,
            repeat,
            json,
        } => commands::roundtrip::execute(config, input, size, repeat, json),
    }
}
