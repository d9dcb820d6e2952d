// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Human-readable byte sizes for buffer configuration.
//!
//! Work-buffer and stream-buffer sizes are usually written as `"64K"` or
//! `"1M"` in configuration files and on the command line. [`ByteSize`]
//! parses and prints that notation.

use crate::PoolError;
use std::fmt;

/// A byte count with binary (1024-based) suffix parsing.
///
/// # Parsing
/// - `"512"` or `"512B"` → 512 bytes
/// - `"64K"` or `"64KB"` → 64 × 1024 bytes
/// - `"4M"` or `"4MB"` → 4 × 1024² bytes
/// - `"1G"` or `"1GB"` → 1 × 1024³ bytes
///
/// # Examples
/// ```
/// use block_pool::ByteSize;
///
/// let s = ByteSize::parse("64K").unwrap();
/// assert_eq!(s.as_bytes(), 64 * 1024);
/// assert_eq!(s.to_string(), "64 KB");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct ByteSize {
    bytes: usize,
}

impl ByteSize {
    /// Creates a size from a byte count.
    pub const fn from_bytes(bytes: usize) -> Self {
        Self { bytes }
    }

    /// Creates a size from kibibytes.
    pub const fn from_kb(kb: usize) -> Self {
        Self { bytes: kb * 1024 }
    }

    /// Creates a size from mebibytes.
    pub const fn from_mb(mb: usize) -> Self {
        Self {
            bytes: mb * 1024 * 1024,
        }
    }

    /// Returns the size in bytes.
    pub const fn as_bytes(&self) -> usize {
        self.bytes
    }

    /// Parses a human-readable size string. Case-insensitive.
    ///
    /// Zero sizes are rejected, since no pool class can serve them.
    pub fn parse(s: &str) -> Result<Self, PoolError> {
        let invalid = |reason: &str| PoolError::InvalidByteSize {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(invalid("empty string"));
        }

        let upper = trimmed.to_ascii_uppercase();
        let digits_end = upper
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(upper.len());
        let (num_str, suffix) = upper.split_at(digits_end);

        let multiplier: usize = match suffix.trim() {
            "" | "B" => 1,
            "K" | "KB" => 1024,
            "M" | "MB" => 1024 * 1024,
            "G" | "GB" => 1024 * 1024 * 1024,
            _ => return Err(invalid("expected a number followed by an optional K, M or G suffix")),
        };

        let value: usize = num_str
            .parse()
            .map_err(|_| invalid("expected a number followed by an optional K, M or G suffix"))?;

        let bytes = value
            .checked_mul(multiplier)
            .ok_or_else(|| invalid("size overflows usize"))?;

        if bytes == 0 {
            return Err(invalid("size must be greater than zero"));
        }

        Ok(Self { bytes })
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const KB: usize = 1024;
        const MB: usize = 1024 * 1024;
        const GB: usize = 1024 * 1024 * 1024;

        if self.bytes >= GB && self.bytes % GB == 0 {
            write!(f, "{} GB", self.bytes / GB)
        } else if self.bytes >= MB && self.bytes % MB == 0 {
            write!(f, "{} MB", self.bytes / MB)
        } else if self.bytes >= KB && self.bytes % KB == 0 {
            write!(f, "{} KB", self.bytes / KB)
        } else {
            write!(f, "{} B", self.bytes)
        }
    }
}

impl std::str::FromStr for ByteSize {
    type Err = PoolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
