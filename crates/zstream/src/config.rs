// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Codec configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! format = "gzip"
//! level = 6
//! input_buffer = "64K"
//! output_buffer = "64K"
//! work_buffer = "32K"
//! ```

use crate::codec::{Format, Level, Mode};
use crate::StreamError;
use block_pool::{ByteSize, MAX_BLOCK_SIZE};
use std::path::Path;

/// Settings for the streaming and adapter APIs.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CodecConfig {
    /// Output framing when compressing: `"gzip"` or `"zlib"`.
    #[serde(default = "default_format")]
    pub format: Format,
    /// Compression level, 0 through 9.
    #[serde(default)]
    pub level: Level,
    /// Streaming input staging buffer (human-readable, e.g. `"64K"`).
    #[serde(default = "default_stream_buffer")]
    pub input_buffer: String,
    /// Streaming output staging buffer.
    #[serde(default = "default_stream_buffer")]
    pub output_buffer: String,
    /// Transformer work buffer used by the adapters.
    #[serde(default = "default_work_buffer")]
    pub work_buffer: String,
}

fn default_format() -> Format {
    Format::Gzip
}

fn default_stream_buffer() -> String {
    "64K".to_string()
}

fn default_work_buffer() -> String {
    "32K".to_string()
}

impl CodecConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, StreamError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            StreamError::Config(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, StreamError> {
        toml::from_str(toml_str)
            .map_err(|e| StreamError::Config(format!("TOML parse error: {e}")))
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, StreamError> {
        toml::to_string_pretty(self)
            .map_err(|e| StreamError::Config(format!("TOML serialise error: {e}")))
    }

    /// Checks the level and every buffer size.
    pub fn validate(&self) -> Result<(), StreamError> {
        if !self.level.is_valid() {
            return Err(StreamError::Config(format!(
                "level {} is out of range; expected 0 through 9",
                self.level
            )));
        }
        self.input_buffer_bytes()?;
        self.output_buffer_bytes()?;
        self.work_buffer_bytes()?;
        Ok(())
    }

    /// The compress mode described by `format` and `level`.
    pub fn mode(&self) -> Mode {
        Mode::Compress {
            format: self.format,
            level: self.level,
        }
    }

    pub fn input_buffer_bytes(&self) -> Result<usize, StreamError> {
        parse_buffer("input_buffer", &self.input_buffer)
    }

    pub fn output_buffer_bytes(&self) -> Result<usize, StreamError> {
        parse_buffer("output_buffer", &self.output_buffer)
    }

    pub fn work_buffer_bytes(&self) -> Result<usize, StreamError> {
        parse_buffer("work_buffer", &self.work_buffer)
    }
}

fn parse_buffer(field: &str, value: &str) -> Result<usize, StreamError> {
    let size = ByteSize::parse(value)
        .map_err(|e| StreamError::Config(format!("invalid {field}: {e}")))?
        .as_bytes();
    if size > MAX_BLOCK_SIZE {
        return Err(StreamError::Config(format!(
            "{field} of {} exceeds the largest pool block ({})",
            ByteSize::from_bytes(size),
            ByteSize::from_bytes(MAX_BLOCK_SIZE)
        )));
    }
    Ok(size)
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            level: Level::DEFAULT,
            input_buffer: default_stream_buffer(),
            output_buffer: default_stream_buffer(),
            work_buffer: default_work_buffer(),
        }
    }
}
