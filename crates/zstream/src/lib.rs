// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # zstream
//!
//! gzip/zlib compression and decompression driven over pooled work buffers.
//!
//! # Layers
//! ```text
//!  Compressor<W: Write> / Decompressor<R: Read>     adapter
//!  buffer::{compress, decompress}                    one-shot
//!  streaming::{compress, decompress}                 pull/push events
//!             │
//!  Transformer (codec + pooled work buffer, reset/reuse)
//!             │
//!  engine: compress_step / decompress_step loops over Source / Sink
//!             │
//!  codec: Deflater / Inflater  (flate2)
//!             │
//!  block_pool::MultiPool       (work and staging buffers)
//! ```
//!
//! Everything that needs memory draws it from a [`block_pool::MultiPool`].
//! The `*_stream` helpers and the `new` constructors use
//! [`block_pool::global()`]; the `with_pool` variants and the
//! [`streaming`] functions take a pool explicitly.
//!
//! # Example
//! ```
//! use zstream::{decompress_buffer, zlib_compress_buffer, Level};
//!
//! let data = b"compress me, compress me, compress me";
//! let mut packed = [0u8; 128];
//! let n = zlib_compress_buffer(Level::BEST_COMPRESSION, data, &mut packed).unwrap();
//!
//! let mut unpacked = [0u8; 128];
//! let m = decompress_buffer(&packed[..n], &mut unpacked).unwrap();
//! assert_eq!(&unpacked[..m], data);
//! ```

pub mod adapter;
pub mod buffer;
pub mod codec;
mod config;
pub mod engine;
mod error;
pub mod streaming;
mod transformer;

pub use adapter::{Compressor, Decompressor, DEFAULT_BUFFER_SIZE};
pub use codec::{Codec, Deflater, Flush, Format, Inflater, Level, Mode, Progress, Step};
pub use config::CodecConfig;
pub use engine::{ReadSource, Sink, Source, WriteSink};
pub use error::{Fault, StreamError};
pub use transformer::{ReadStatus, ReadStep, Transformer, TransformerState, WriteStep};

/// gzip-compresses `input` into `output` in one call.
///
/// See [`buffer::compress`] for the error cases.
pub fn gzip_compress_buffer(
    level: Level,
    input: &[u8],
    output: &mut [u8],
) -> Result<usize, StreamError> {
    buffer::compress(Format::Gzip, level, input, output)
}

/// zlib-compresses `input` into `output` in one call.
pub fn zlib_compress_buffer(
    level: Level,
    input: &[u8],
    output: &mut [u8],
) -> Result<usize, StreamError> {
    buffer::compress(Format::Zlib, level, input, output)
}

/// Decompresses a gzip or zlib stream from `input` into `output` in one call.
pub fn decompress_buffer(input: &[u8], output: &mut [u8]) -> Result<usize, StreamError> {
    buffer::decompress(input, output)
}

/// gzip-compresses everything `source` yields into `sink`, with staging
/// buffers from the process-wide pool. Returns the compressed length.
pub fn gzip_compress_stream<S, K>(
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
    streaming::compress(
        block_pool::global(),
        Format::Gzip,
        level,
        input_size,
        output_size,
        source,
        sink,
    )
}

/// zlib-compresses everything `source` yields into `sink`, with staging
/// buffers from the process-wide pool. Returns the compressed length.
pub fn zlib_compress_stream<S, K>(
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
    streaming::compress(
        block_pool::global(),
        Format::Zlib,
        level,
        input_size,
        output_size,
        source,
        sink,
    )
}

/// Decompresses a gzip or zlib stream from `source` into `sink`, with
/// staging buffers from the process-wide pool. Returns the decompressed length.
pub fn decompress_stream<S, K>(
    input_size: usize,
    output_size: usize,
    source: &mut S,
    sink: &mut K,
) -> Result<u64, StreamError>
where
    S: Source + ?Sized,
    K: Sink + ?Sized,
{
    streaming::decompress(block_pool::global(), input_size, output_size, source, sink)
}
