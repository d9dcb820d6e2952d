// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `std::io` adapters over a [`Transformer`].
//!
//! [`Compressor`] is a [`Write`] that compresses into an inner writer;
//! [`Decompressor`] is a [`Read`] that decompresses from an inner reader.
//! Both own their inner stream and a transformer, and both can be
//! [`reset`](Compressor::reset) onto a new inner stream to reuse the codec
//! state and pooled work buffer.
//!
//! Dropping an adapter returns its work buffer to the pool but does **not**
//! finish the stream; call [`Compressor::finish`] or [`Compressor::close`]
//! to write the trailer.

use crate::codec::{Format, Level, Mode};
use crate::engine::{ReadSource, WriteSink};
use crate::transformer::{ReadStatus, Transformer};
use crate::{Fault, StreamError};
use block_pool::MultiPool;
use std::io::{self, Read, Write};

/// Work buffer size used by [`Compressor::new`] and [`Decompressor::new`].
pub const DEFAULT_BUFFER_SIZE: usize = 32 * 1024;

/// A writer that gzip- or zlib-compresses into an inner writer.
///
/// # Example
/// ```
/// use std::io::Write;
/// use zstream::{Compressor, Format, Level};
///
/// let mut gz = Compressor::new(Vec::new(), Format::Gzip, Level::DEFAULT).unwrap();
/// gz.write_all(b"hello, pool").unwrap();
/// let compressed = gz.close().unwrap();
/// assert_eq!(&compressed[..2], &[0x1f, 0x8b]);
/// ```
pub struct Compressor<W: Write> {
    transformer: Transformer,
    sink: WriteSink<W>,
    finished: bool,
}

impl<W: Write> Compressor<W> {
    /// Creates a compressor with a [`DEFAULT_BUFFER_SIZE`] work buffer from
    /// the process-wide pool.
    pub fn new(sink: W, format: Format, level: Level) -> Result<Self, StreamError> {
        Self::with_pool(block_pool::global(), sink, format, level, DEFAULT_BUFFER_SIZE)
    }

    /// Creates a compressor whose work buffer comes from `pool`.
    pub fn with_pool(
        pool: &MultiPool,
        sink: W,
        format: Format,
        level: Level,
        buffer_size: usize,
    ) -> Result<Self, StreamError> {
        let transformer = Transformer::acquire(pool, Mode::Compress { format, level }, buffer_size)?;
        transformer.check()?;
        Ok(Self {
            transformer,
            sink: WriteSink(sink),
            finished: false,
        })
    }

    /// Writes the stream trailer and flushes the inner writer.
    ///
    /// Calling it again is a no-op until the next [`reset`](Self::reset).
    pub fn finish(&mut self) -> Result<(), StreamError> {
        if self.finished {
            return Ok(());
        }
        self.transformer.write_step(&[], &mut self.sink)?;
        self.finished = true;
        self.sink.get_mut().flush().map_err(StreamError::Sink)
    }

    /// Rewinds the codec and swaps in a new inner writer. Returns the
    /// previous writer.
    ///
    /// The previous stream is not finished; call [`finish`](Self::finish)
    /// first if it should be complete.
    pub fn reset(&mut self, sink: W) -> Result<W, StreamError> {
        self.transformer.reset()?;
        self.finished = false;
        Ok(std::mem::replace(self.sink.get_mut(), sink))
    }

    /// Finishes the stream, releases the transformer and returns the inner writer.
    pub fn close(mut self) -> Result<W, StreamError> {
        self.finish()?;
        let Self {
            transformer, sink, ..
        } = self;
        transformer.release();
        Ok(sink.into_inner())
    }

    pub fn get_ref(&self) -> &W {
        self.sink.get_ref()
    }

    /// Mutable access to the inner writer. Writing to it directly corrupts
    /// the compressed stream.
    pub fn get_mut(&mut self) -> &mut W {
        self.sink.get_mut()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Uncompressed bytes accepted since the last reset.
    pub fn total_in(&self) -> u64 {
        self.transformer.total_in()
    }

    /// Compressed bytes produced since the last reset.
    pub fn total_out(&self) -> u64 {
        self.transformer.total_out()
    }
}

impl<W: Write> Write for Compressor<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.finished {
            return Err(StreamError::Compress(Fault::StreamInconsistent).into());
        }
        let step = self.transformer.write_step(buf, &mut self.sink)?;
        Ok(step.consumed)
    }

    /// Sync-flushes the codec, so everything written so far can be
    /// decompressed by the reader, then flushes the inner writer.
    fn flush(&mut self) -> io::Result<()> {
        if !self.finished {
            self.transformer.sync_step(&mut self.sink)?;
        }
        self.sink.get_mut().flush()
    }
}

impl<W: Write> std::fmt::Debug for Compressor<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compressor")
            .field("transformer", &self.transformer)
            .field("finished", &self.finished)
            .finish()
    }
}

/// A reader that decompresses gzip or zlib data from an inner reader.
///
/// Reads return `Ok(0)` once the end-of-stream marker is reached or the
/// inner reader runs dry. Use [`is_finished`](Self::is_finished) to tell the
/// two apart.
///
/// # Example
/// ```
/// use std::io::Read;
/// use zstream::{gzip_compress_buffer, Decompressor, Level};
///
/// let mut compressed = [0u8; 64];
/// let n = gzip_compress_buffer(Level::DEFAULT, b"round trip", &mut compressed).unwrap();
///
/// let mut reader = Decompressor::new(&compressed[..n]).unwrap();
/// let mut text = String::new();
/// reader.read_to_string(&mut text).unwrap();
/// assert_eq!(text, "round trip");
/// assert!(reader.is_finished());
/// ```
pub struct Decompressor<R: Read> {
    transformer: Transformer,
    source: ReadSource<R>,
}

impl<R: Read> Decompressor<R> {
    /// Creates a decompressor with a [`DEFAULT_BUFFER_SIZE`] work buffer
    /// from the process-wide pool.
    pub fn new(source: R) -> Result<Self, StreamError> {
        Self::with_pool(block_pool::global(), source, DEFAULT_BUFFER_SIZE)
    }

    /// Creates a decompressor whose work buffer comes from `pool`.
    pub fn with_pool(pool: &MultiPool, source: R, buffer_size: usize) -> Result<Self, StreamError> {
        let transformer = Transformer::acquire(pool, Mode::Decompress, buffer_size)?;
        transformer.check()?;
        Ok(Self {
            transformer,
            source: ReadSource(source),
        })
    }

    /// Rewinds the codec and swaps in a new inner reader. Returns the
    /// previous reader; any input buffered from it is discarded.
    pub fn reset(&mut self, source: R) -> Result<R, StreamError> {
        self.transformer.reset()?;
        Ok(std::mem::replace(self.source.get_mut(), source))
    }

    /// Returns `true` once the end-of-stream marker has been read.
    pub fn is_finished(&self) -> bool {
        self.transformer.is_finished()
    }

    /// Releases the transformer and returns the inner reader.
    pub fn close(self) -> R {
        let Self {
            transformer,
            source,
        } = self;
        transformer.release();
        source.into_inner()
    }

    pub fn get_ref(&self) -> &R {
        self.source.get_ref()
    }

    pub fn get_mut(&mut self) -> &mut R {
        self.source.get_mut()
    }

    /// Compressed bytes consumed since the last reset.
    pub fn total_in(&self) -> u64 {
        self.transformer.total_in()
    }

    /// Decompressed bytes produced since the last reset.
    pub fn total_out(&self) -> u64 {
        self.transformer.total_out()
    }
}

impl<R: Read> Read for Decompressor<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            let step = self.transformer.read_step(&mut self.source, buf)?;
            if step.written > 0 {
                return Ok(step.written);
            }
            match step.status {
                ReadStatus::StreamEnd | ReadStatus::SourceExhausted => return Ok(0),
                ReadStatus::MoreOutput | ReadStatus::NeedsInput => continue,
            }
        }
    }
}

impl<R: Read> std::fmt::Debug for Decompressor<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decompressor")
            .field("transformer", &self.transformer)
            .field("finished", &self.is_finished())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> MultiPool {
        MultiPool::new()
    }

    #[test]
    fn test_write_then_read() {
        let pool = pool();
        let data = b"adapters all the way down\n".repeat(500);

        let mut w = Compressor::with_pool(&pool, Vec::new(), Format::Gzip, Level::DEFAULT, 1024)
            .unwrap();
        w.write_all(&data).unwrap();
        let compressed = w.close().unwrap();

        let mut r = Decompressor::with_pool(&pool, &compressed[..], 512).unwrap();
        let mut back = Vec::new();
        r.read_to_end(&mut back).unwrap();
        assert_eq!(back, data);
        assert!(r.is_finished());
        r.close();

        assert_eq!(pool.stats().totals().in_flight(), 0);
    }

    #[test]
    fn test_empty_write_is_noop() {
        let pool = pool();
        let mut w =
            Compressor::with_pool(&pool, Vec::new(), Format::Zlib, Level::DEFAULT, 512).unwrap();
        assert_eq!(w.write(&[]).unwrap(), 0);
        assert!(!w.is_finished());
        assert_eq!(w.total_in(), 0);
    }

    #[test]
    fn test_finish_is_idempotent() {
        let pool = pool();
        let mut w =
            Compressor::with_pool(&pool, Vec::new(), Format::Gzip, Level::DEFAULT, 512).unwrap();
        w.write_all(b"once").unwrap();
        w.finish().unwrap();
        let len = w.get_ref().len();
        w.finish().unwrap();
        assert_eq!(w.get_ref().len(), len);

        let err = w.write(b"after").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Other);
    }

    #[test]
    fn test_flush_makes_prefix_readable() {
        let pool = pool();
        let mut w =
            Compressor::with_pool(&pool, Vec::new(), Format::Zlib, Level::DEFAULT, 512).unwrap();
        w.write_all(b"visible before close").unwrap();
        w.flush().unwrap();

        let partial = w.get_ref().clone();
        let mut r = Decompressor::with_pool(&pool, &partial[..], 512).unwrap();
        let mut text = String::new();
        r.read_to_string(&mut text).unwrap();
        assert_eq!(text, "visible before close");
        assert!(!r.is_finished());
    }

    #[test]
    fn test_compressor_reset_reuses_buffer() {
        let pool = pool();
        let mut w =
            Compressor::with_pool(&pool, Vec::new(), Format::Gzip, Level::DEFAULT, 2048).unwrap();

        w.write_all(b"first stream").unwrap();
        w.finish().unwrap();
        let first = w.reset(Vec::new()).unwrap();

        w.write_all(b"first stream").unwrap();
        let second = w.close().unwrap();

        assert_eq!(first, second);
        assert_eq!(pool.stats().totals().blocks_allocated, 1);
    }

    #[test]
    fn test_decompressor_reset() {
        let pool = pool();
        let mut a = [0u8; 64];
        let mut b = [0u8; 64];
        let na = crate::buffer::compress(Format::Gzip, Level::DEFAULT, b"alpha", &mut a).unwrap();
        let nb = crate::buffer::compress(Format::Zlib, Level::DEFAULT, b"beta", &mut b).unwrap();

        let mut r = Decompressor::with_pool(&pool, &a[..na], 512).unwrap();
        let mut text = String::new();
        r.read_to_string(&mut text).unwrap();
        assert_eq!(text, "alpha");

        let old = r.reset(&b[..nb]).unwrap();
        assert!(old.is_empty());
        text.clear();
        r.read_to_string(&mut text).unwrap();
        assert_eq!(text, "beta");
    }

    #[test]
    fn test_invalid_level_fails_construction() {
        let pool = pool();
        let err = Compressor::with_pool(&pool, Vec::new(), Format::Gzip, Level::new(10), 512)
            .unwrap_err();
        assert!(matches!(err, StreamError::Init(_)));
        assert_eq!(pool.stats().totals().in_flight(), 0);
    }

    #[test]
    fn test_malformed_read_is_invalid_data() {
        let pool = pool();
        let mut r = Decompressor::with_pool(&pool, &b"plain text, not zlib"[..], 512).unwrap();
        let mut out = Vec::new();
        let err = r.read_to_end(&mut out).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_drop_returns_buffer() {
        let pool = pool();
        let w = Compressor::with_pool(&pool, Vec::new(), Format::Gzip, Level::DEFAULT, 512).unwrap();
        assert_eq!(pool.stats().totals().in_flight(), 1);
        drop(w);
        assert_eq!(pool.stats().totals().in_flight(), 0);
    }
}
