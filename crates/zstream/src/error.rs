// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the codec pipeline.

use crate::Mode;
use std::io;

/// Why a single codec step, or the loop driving it, could not continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Fault {
    /// The compressed input is not a valid gzip or zlib stream, or it asks
    /// for a preset dictionary.
    #[error("malformed compressed input")]
    MalformedInput,

    /// The codec's internal state is inconsistent (for example, data fed
    /// after the stream was finalised).
    #[error("codec stream state is inconsistent")]
    StreamInconsistent,

    /// A caller-supplied output buffer is too small for the result.
    #[error("output buffer too small")]
    OutputExhausted,

    /// The compressed input ended before the end-of-stream marker.
    #[error("compressed input is truncated")]
    TruncatedInput,

    /// The sink accepted fewer bytes than it was offered.
    #[error("sink accepted {accepted} of {offered} bytes")]
    ShortWrite { accepted: usize, offered: usize },

    /// The codec could not be initialised (for example, an invalid level).
    #[error("codec initialisation failed")]
    InitFailed,
}

/// Errors surfaced by the one-shot, streaming and adapter APIs.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// A zero-capacity output buffer was supplied to a one-shot call.
    #[error("output buffer is not preallocated")]
    OutputNotPreallocated,

    /// Compression failed.
    #[error("compression failed: {0}")]
    Compress(Fault),

    /// Decompression failed.
    #[error("decompression failed: {0}")]
    Decompress(Fault),

    /// The transformer's codec never initialised; only release is legal.
    #[error("codec for {0} failed to initialise")]
    Init(Mode),

    /// The operation does not apply to the transformer's mode.
    #[error("'{operation}' is not supported by a {mode} transformer")]
    Unsupported { operation: &'static str, mode: Mode },

    /// The input source reported an I/O error.
    #[error("source read failed: {0}")]
    Source(#[source] io::Error),

    /// The output sink reported an I/O error.
    #[error("sink write failed: {0}")]
    Sink(#[source] io::Error),

    /// A work buffer could not be drawn from the pool.
    #[error("pool error: {0}")]
    Pool(#[from] block_pool::PoolError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl StreamError {
    /// Returns the underlying step fault, if this error carries one.
    pub fn fault(&self) -> Option<Fault> {
        match self {
            Self::Compress(f) | Self::Decompress(f) => Some(*f),
            _ => None,
        }
    }
}

impl From<StreamError> for io::Error {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::Source(e) | StreamError::Sink(e) => e,
            StreamError::Decompress(Fault::MalformedInput) => {
                io::Error::new(io::ErrorKind::InvalidData, err)
            }
            StreamError::Decompress(Fault::TruncatedInput) => {
                io::Error::new(io::ErrorKind::UnexpectedEof, err)
            }
            StreamError::Compress(Fault::ShortWrite { .. })
            | StreamError::Decompress(Fault::ShortWrite { .. }) => {
                io::Error::new(io::ErrorKind::WriteZero, err)
            }
            StreamError::Config(_) | StreamError::Unsupported { .. } => {
                io::Error::new(io::ErrorKind::InvalidInput, err)
            }
            other => io::Error::new(io::ErrorKind::Other, other),
        }
    }
}
