// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! One-shot compression into a caller-provided buffer.
//!
//! The whole input is processed in a single codec step. No pooled memory is
//! involved: the caller owns both slices.

use crate::codec::{self, Codec, Flush, Format, Level, Mode, Progress};
use crate::{Fault, StreamError};

/// Compresses `input` into `output` and returns the compressed length.
///
/// # Errors
/// - [`StreamError::OutputNotPreallocated`] if `output` is empty, checked
///   before any codec work.
/// - [`StreamError::Compress`] with [`Fault::OutputExhausted`] if the
///   compressed stream does not fit.
/// - [`StreamError::Init`] if `level` is out of range.
pub fn compress(
    format: Format,
    level: Level,
    input: &[u8],
    output: &mut [u8],
) -> Result<usize, StreamError> {
    if output.is_empty() {
        return Err(StreamError::OutputNotPreallocated);
    }
    let mode = Mode::Compress { format, level };
    let mut codec = codec::open(mode).map_err(|_| StreamError::Init(mode))?;

    let step = codec
        .step(input, output, Flush::Finish)
        .map_err(StreamError::Compress)?;
    match step.progress {
        Progress::StreamEnd => Ok(step.produced),
        _ => Err(StreamError::Compress(Fault::OutputExhausted)),
    }
}

/// Decompresses one gzip or zlib stream from `input` into `output` and
/// returns the decompressed length. Bytes after the end marker are ignored.
///
/// # Errors
/// - [`StreamError::OutputNotPreallocated`] if `output` is empty.
/// - [`StreamError::Decompress`] with [`Fault::MalformedInput`] for invalid
///   data, [`Fault::OutputExhausted`] if the result does not fit, or
///   [`Fault::TruncatedInput`] if `input` ends before the end marker.
pub fn decompress(input: &[u8], output: &mut [u8]) -> Result<usize, StreamError> {
    if output.is_empty() {
        return Err(StreamError::OutputNotPreallocated);
    }
    let mut codec = codec::Inflater::new();

    let step = codec
        .step(input, output, Flush::None)
        .map_err(StreamError::Decompress)?;
    match step.progress {
        Progress::StreamEnd => Ok(step.produced),
        Progress::OutputFull => Err(StreamError::Decompress(Fault::OutputExhausted)),
        Progress::Drained => Err(StreamError::Decompress(Fault::TruncatedInput)),
    }
}
