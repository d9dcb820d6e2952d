// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Event-based streaming: pull input through a [`Source`], push output
//! through a [`Sink`], with both staging buffers drawn from a pool.
//!
//! ```
//! use block_pool::MultiPool;
//! use zstream::{streaming, Format, Level};
//!
//! let pool = MultiPool::new();
//! let data = b"stream me".repeat(100);
//! let mut input = &data[..];
//! let mut source = |buf: &mut [u8]| {
//!     let n = buf.len().min(input.len());
//!     buf[..n].copy_from_slice(&input[..n]);
//!     input = &input[n..];
//!     n
//! };
//! let mut compressed = Vec::new();
//! let mut sink = |chunk: &[u8]| {
//!     compressed.extend_from_slice(chunk);
//!     chunk.len()
//! };
//!
//! let written = streaming::compress(
//!     &pool, Format::Gzip, Level::DEFAULT, 4096, 4096, &mut source, &mut sink,
//! ).unwrap();
//! assert_eq!(written as usize, compressed.len());
//! ```

use crate::codec::{self, Codec, Format, Level, Mode};
use crate::engine::{self, Sink, Source};
use crate::StreamError;
use block_pool::MultiPool;

/// Compresses everything `source` yields, pushing the stream to `sink`.
///
/// `input_size` and `output_size` are the staging buffer sizes drawn from
/// `pool`. Returns the total number of compressed bytes written.
pub fn compress<S, K>(
    pool: &MultiPool,
    format: Format,
    level: Level,
    input_size: usize,
    output_size: usize,
    source: &mut S,
    sink: &mut K,
) -> Result<u64, StreamError>
where
    S: Source + ?Sized,
    K: Sink + ?Sized,
{
    let mode = Mode::Compress { format, level };
    let mut in_buf = pool.acquire(input_size)?;
    let mut out_buf = pool.acquire(output_size)?;
    let mut codec = codec::open(mode).map_err(|_| StreamError::Init(mode))?;

    let written = engine::compress_stream(
        &mut *codec,
        source,
        sink,
        in_buf.storage_mut(),
        out_buf.storage_mut(),
    )?;

    tracing::debug!(
        %mode,
        bytes_in = codec.total_in(),
        bytes_out = written,
        "stream compressed"
    );
    Ok(written)
}

/// Decompresses a gzip or zlib stream from `source`, pushing the plain
/// bytes to `sink`.
///
/// Stops at the end-of-stream marker or when `source` returns zero bytes.
/// Returns the total number of decompressed bytes written.
pub fn decompress<S, K>(
    pool: &MultiPool,
    input_size: usize,
    output_size: usize,
    source: &mut S,
    sink: &mut K,
) -> Result<u64, StreamError>
where
    S: Source + ?Sized,
    K: Sink + ?Sized,
{
    let mut in_buf = pool.acquire(input_size)?;
    let mut out_buf = pool.acquire(output_size)?;
    let mut codec = codec::Inflater::new();

    let written = engine::decompress_stream(
        &mut codec,
        source,
        sink,
        in_buf.storage_mut(),
        out_buf.storage_mut(),
    )?;

    tracing::debug!(
        format = ?codec.format(),
        bytes_in = codec.total_in(),
        bytes_out = written,
        "stream decompressed"
    );
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ReadSource, WriteSink};
    use crate::Fault;

    #[test]
    fn test_roundtrip_through_pool() {
        let pool = MultiPool::new();
        let data = b"pooled streaming roundtrip ".repeat(300);

        let mut compressed = WriteSink(Vec::new());
        compress(
            &pool,
            Format::Zlib,
            Level::BEST_SPEED,
            1000,
            700,
            &mut ReadSource(&data[..]),
            &mut compressed,
        )
        .unwrap();
        let compressed = compressed.into_inner();

        let mut plain = WriteSink(Vec::new());
        let n = decompress(&pool, 513, 512, &mut ReadSource(&compressed[..]), &mut plain).unwrap();
        assert_eq!(n as usize, data.len());
        assert_eq!(plain.into_inner(), data);

        // All four staging buffers went back.
        assert_eq!(pool.stats().totals().in_flight(), 0);
    }

    #[test]
    fn test_zero_buffer_size_rejected() {
        let pool = MultiPool::new();
        let err = compress(
            &pool,
            Format::Gzip,
            Level::DEFAULT,
            0,
            512,
            &mut ReadSource(&b""[..]),
            &mut WriteSink(Vec::new()),
        )
        .unwrap_err();
        assert!(matches!(err, StreamError::Pool(_)));
    }

    #[test]
    fn test_invalid_level_releases_buffers() {
        let pool = MultiPool::new();
        let err = compress(
            &pool,
            Format::Gzip,
            Level::new(99),
            512,
            512,
            &mut ReadSource(&b"x"[..]),
            &mut WriteSink(Vec::new()),
        )
        .unwrap_err();
        assert!(matches!(err, StreamError::Init(_)));
        assert_eq!(pool.stats().totals().in_flight(), 0);
    }

    #[test]
    fn test_decompress_malformed() {
        let pool = MultiPool::new();
        let err = decompress(
            &pool,
            512,
            512,
            &mut ReadSource(&b"not a compressed stream"[..]),
            &mut WriteSink(Vec::new()),
        )
        .unwrap_err();
        assert_eq!(err.fault(), Some(Fault::MalformedInput));
    }
}
