// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Subcommand implementations and shared wiring.

pub mod compress;
pub mod decompress;
pub mod roundtrip;

use anyhow::Context;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use zstream::CodecConfig;

/// Installs the stderr log subscriber.
///
/// `-v` enables info, `-vv` debug, `-vvv` trace. `RUST_LOG` overrides.
pub fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Loads and validates the config file, or returns the defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<CodecConfig> {
    let config = match path {
        Some(p) => {
            let c = CodecConfig::from_file(p)?;
            tracing::info!("loaded config from {}", p.display());
            c
        }
        None => CodecConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

/// Opens `path` for reading, or stdin.
pub fn open_input(path: Option<&PathBuf>) -> anyhow::Result<Box<dyn Read>> {
    Ok(match path {
        Some(p) => Box::new(BufReader::new(
            File::open(p).with_context(|| format!("cannot open '{}'", p.display()))?,
        )),
        None => Box::new(io::stdin().lock()),
    })
}

/// Creates `path` for writing, or stdout.
pub fn open_output(path: Option<&PathBuf>) -> anyhow::Result<Box<dyn Write>> {
    Ok(match path {
        Some(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("cannot create '{}'", p.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    })
}
