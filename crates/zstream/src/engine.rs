// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Codec step engine: loops that drive a [`Codec`] between a pull-based
//! [`Source`] and a push-based [`Sink`].
//!
//! # Compression
//! ```text
//!  source.pull(in_buf) ──n>0──► compress_step(Flush::None) ──► sink.push(..)
//!        │                           ▲   │ OutputFull: go again
//!        └──n==0──► compress_step(Flush::Finish) ──► trailer ──► done
//! ```
//!
//! # Decompression
//! Each pulled chunk is drained through [`decompress_drain`] until the codec
//! either wants more input or reports the end-of-stream marker. A source that
//! returns zero bytes ends the loop without error, even if the marker was
//! never seen; only the codec's own marker signals a complete stream.
//!
//! Output already pushed to the sink before a failure is never retracted.

use crate::{Codec, Fault, Flush, Progress, Step, StreamError};
use std::io::{self, Read, Write};

/// Pull side of the engine: fills a buffer with whatever input is available.
///
/// Returning `Ok(0)` means "no more input right now".
pub trait Source {
    fn pull(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Push side of the engine: consumes a chunk of output.
///
/// Returning fewer bytes than offered is a fatal short write.
pub trait Sink {
    fn push(&mut self, data: &[u8]) -> io::Result<usize>;
}

impl<F> Source for F
where
    F: FnMut(&mut [u8]) -> usize,
{
    fn pull(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self(buf))
    }
}

impl<F> Sink for F
where
    F: FnMut(&[u8]) -> usize,
{
    fn push(&mut self, data: &[u8]) -> io::Result<usize> {
        Ok(self(data))
    }
}

/// A [`Source`] over any [`Read`]. Interrupted reads are retried.
#[derive(Debug)]
pub struct ReadSource<R>(pub R);

impl<R: Read> Source for ReadSource<R> {
    fn pull(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            match self.0.read(buf) {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                other => return other,
            }
        }
    }
}

impl<R> ReadSource<R> {
    pub fn get_ref(&self) -> &R {
        &self.0
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.0
    }

    pub fn into_inner(self) -> R {
        self.0
    }
}

/// A [`Sink`] over any [`Write`]. Each push is a `write_all`.
#[derive(Debug)]
pub struct WriteSink<W>(pub W);

impl<W: Write> Sink for WriteSink<W> {
    fn push(&mut self, data: &[u8]) -> io::Result<usize> {
        self.0.write_all(data)?;
        Ok(data.len())
    }
}

impl<W> WriteSink<W> {
    pub fn get_ref(&self) -> &W {
        &self.0
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.0
    }

    pub fn into_inner(self) -> W {
        self.0
    }
}

/// Pushes `data` in one call; a partial accept becomes `wrap(ShortWrite)`.
fn push_output<K: Sink + ?Sized>(
    sink: &mut K,
    data: &[u8],
    wrap: fn(Fault) -> StreamError,
) -> Result<(), StreamError> {
    if data.is_empty() {
        return Ok(());
    }
    match sink.push(data) {
        Ok(n) if n == data.len() => Ok(()),
        Ok(n) => Err(wrap(Fault::ShortWrite {
            accepted: n,
            offered: data.len(),
        })),
        Err(e) => Err(StreamError::Sink(e)),
    }
}

/// Compresses `input` with one flush mode, pushing every byte produced.
///
/// Steps repeatedly while the output region keeps filling, and while input
/// remains (or a finish is still being written). Advances `input` past what
/// was consumed. Returns the progress of the last step; with
/// [`Flush::Finish`] that is [`Progress::StreamEnd`].
pub fn compress_step<K: Sink + ?Sized>(
    codec: &mut dyn Codec,
    input: &mut &[u8],
    flush: Flush,
    sink: &mut K,
    out_buf: &mut [u8],
) -> Result<Progress, StreamError> {
    loop {
        let step = codec
            .step(*input, out_buf, flush)
            .map_err(StreamError::Compress)?;
        *input = &input[step.consumed..];
        push_output(sink, &out_buf[..step.produced], StreamError::Compress)?;

        match step.progress {
            Progress::OutputFull => continue,
            Progress::StreamEnd => return Ok(Progress::StreamEnd),
            Progress::Drained => {
                let unfinished = !input.is_empty() || flush == Flush::Finish;
                if unfinished && step.moved() {
                    continue;
                }
                return Ok(Progress::Drained);
            }
        }
    }
}

/// Pulls input until the source runs dry, then finishes the stream.
///
/// Returns the total number of compressed bytes pushed.
pub fn compress_stream<S, K>(
    codec: &mut dyn Codec,
    source: &mut S,
    sink: &mut K,
    in_buf: &mut [u8],
    out_buf: &mut [u8],
) -> Result<u64, StreamError>
where
    S: Source + ?Sized,
    K: Sink + ?Sized,
{
    loop {
        let n = source.pull(in_buf).map_err(StreamError::Source)?;
        if n == 0 {
            compress_step(codec, &mut &[][..], Flush::Finish, sink, out_buf)?;
            return Ok(codec.total_out());
        }

        let mut input = &in_buf[..n];
        compress_step(codec, &mut input, Flush::None, sink, out_buf)?;
        if !input.is_empty() {
            return Err(StreamError::Compress(Fault::StreamInconsistent));
        }
    }
}

/// Runs exactly one decompress increment and pushes what it produced.
///
/// Advances `input` past what was consumed. Empty input with nothing
/// buffered in the codec yields a step that moved nothing.
pub fn decompress_step<K: Sink + ?Sized>(
    codec: &mut dyn Codec,
    input: &mut &[u8],
    sink: &mut K,
    out_buf: &mut [u8],
) -> Result<Step, StreamError> {
    let step = codec
        .step(*input, out_buf, Flush::None)
        .map_err(StreamError::Decompress)?;
    *input = &input[step.consumed..];
    push_output(sink, &out_buf[..step.produced], StreamError::Decompress)?;
    Ok(step)
}

/// Decompresses `input` until the codec needs more or reaches the end marker.
pub fn decompress_drain<K: Sink + ?Sized>(
    codec: &mut dyn Codec,
    input: &mut &[u8],
    sink: &mut K,
    out_buf: &mut [u8],
) -> Result<Progress, StreamError> {
    loop {
        let step = decompress_step(codec, input, sink, out_buf)?;
        match step.progress {
            Progress::OutputFull => continue,
            Progress::StreamEnd => return Ok(Progress::StreamEnd),
            Progress::Drained if !input.is_empty() && step.moved() => continue,
            Progress::Drained => return Ok(Progress::Drained),
        }
    }
}

/// Pulls and decompresses until the end-of-stream marker or until the
/// source runs dry. Bytes pulled after the end marker are discarded.
///
/// Returns the total number of decompressed bytes pushed. A source that
/// stops before the end marker is not an error here.
pub fn decompress_stream<S, K>(
    codec: &mut dyn Codec,
    source: &mut S,
    sink: &mut K,
    in_buf: &mut [u8],
    out_buf: &mut [u8],
) -> Result<u64, StreamError>
where
    S: Source + ?Sized,
    K: Sink + ?Sized,
{
    loop {
        let n = source.pull(in_buf).map_err(StreamError::Source)?;
        if n == 0 {
            return Ok(codec.total_out());
        }

        let mut input = &in_buf[..n];
        if decompress_drain(codec, &mut input, sink, out_buf)? == Progress::StreamEnd {
            return Ok(codec.total_out());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Deflater, Inflater};
    use crate::{Format, Level};

    fn chunked_source(data: &[u8]) -> impl FnMut(&mut [u8]) -> usize + '_ {
        let mut pos = 0;
        move |buf: &mut [u8]| {
            let n = buf.len().min(data.len() - pos);
            buf[..n].copy_from_slice(&data[pos..pos + n]);
            pos += n;
            n
        }
    }

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut codec = Deflater::new(Format::Gzip, Level::DEFAULT).unwrap();
        let mut out = Vec::new();
        let mut sink = |d: &[u8]| {
            out.extend_from_slice(d);
            d.len()
        };
        let (mut inb, mut outb) = (vec![0u8; 64], vec![0u8; 64]);
        compress_stream(&mut codec, &mut chunked_source(data), &mut sink, &mut inb, &mut outb)
            .unwrap();
        out
    }

    // ── Compression ────────────────────────────────────────────

    #[test]
    fn test_compress_stream_small_buffers() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 97) as u8).collect();
        let compressed = gzip(&data);

        let mut back = Vec::new();
        flate2::read::GzDecoder::new(&compressed[..])
            .read_to_end(&mut back)
            .unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn test_compress_stream_returns_total_out() {
        let mut codec = Deflater::new(Format::Zlib, Level::DEFAULT).unwrap();
        let mut pushed = 0usize;
        let mut sink = |d: &[u8]| {
            pushed += d.len();
            d.len()
        };
        let (mut inb, mut outb) = (vec![0u8; 128], vec![0u8; 32]);
        let total = compress_stream(
            &mut codec,
            &mut chunked_source(b"count the bytes"),
            &mut sink,
            &mut inb,
            &mut outb,
        )
        .unwrap();
        assert_eq!(total as usize, pushed);
    }

    #[test]
    fn test_short_write_is_fatal() {
        let mut codec = Deflater::new(Format::Gzip, Level::DEFAULT).unwrap();
        let mut sink = |d: &[u8]| d.len() / 2;
        let mut out = vec![0u8; 64];
        let err = compress_step(&mut codec, &mut &b"abc"[..], Flush::Finish, &mut sink, &mut out)
            .unwrap_err();
        assert!(matches!(
            err,
            StreamError::Compress(Fault::ShortWrite { .. })
        ));
    }

    #[test]
    fn test_sink_io_error_is_wrapped() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::from(io::ErrorKind::BrokenPipe))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let mut codec = Deflater::new(Format::Gzip, Level::DEFAULT).unwrap();
        let mut out = vec![0u8; 64];
        let err = compress_step(
            &mut codec,
            &mut &b""[..],
            Flush::Finish,
            &mut WriteSink(Broken),
            &mut out,
        )
        .unwrap_err();
        assert!(matches!(err, StreamError::Sink(e) if e.kind() == io::ErrorKind::BrokenPipe));
    }

    #[test]
    fn test_sync_flush_emits_decodable_prefix() {
        let mut codec = Deflater::new(Format::Zlib, Level::DEFAULT).unwrap();
        let mut sink = WriteSink(Vec::new());
        let mut out = vec![0u8; 64];
        let mut input = &b"partial line\n"[..];

        compress_step(&mut codec, &mut input, Flush::None, &mut sink, &mut out).unwrap();
        let progress =
            compress_step(&mut codec, &mut &[][..], Flush::Sync, &mut sink, &mut out).unwrap();
        assert_eq!(progress, Progress::Drained);

        // A sync-flushed stream ends in the empty stored block marker.
        let bytes = sink.into_inner();
        assert_eq!(&bytes[bytes.len() - 4..], &[0x00, 0x00, 0xff, 0xff]);
    }

    // ── Decompression ──────────────────────────────────────────

    #[test]
    fn test_decompress_stream_roundtrip() {
        let data = b"round and round".repeat(200);
        let compressed = gzip(&data);

        let mut codec = Inflater::new();
        let mut sink = WriteSink(Vec::new());
        let (mut inb, mut outb) = (vec![0u8; 17], vec![0u8; 23]);
        let total = decompress_stream(
            &mut codec,
            &mut chunked_source(&compressed),
            &mut sink,
            &mut inb,
            &mut outb,
        )
        .unwrap();

        assert_eq!(total as usize, data.len());
        assert_eq!(sink.into_inner(), data);
    }

    #[test]
    fn test_decompress_step_empty_input() {
        let mut codec = Inflater::new();
        let mut sink = WriteSink(Vec::new());
        let mut out = vec![0u8; 16];
        let step = decompress_step(&mut codec, &mut &[][..], &mut sink, &mut out).unwrap();
        assert!(!step.moved());
        assert!(sink.into_inner().is_empty());
    }

    #[test]
    fn test_decompress_truncated_is_not_an_error() {
        let data = b"cut short".repeat(100);
        let compressed = gzip(&data);
        let cut = &compressed[..compressed.len() - 8];

        let mut codec = Inflater::new();
        let mut sink = WriteSink(Vec::new());
        let (mut inb, mut outb) = (vec![0u8; 64], vec![0u8; 64]);
        decompress_stream(
            &mut codec,
            &mut chunked_source(cut),
            &mut sink,
            &mut inb,
            &mut outb,
        )
        .unwrap();
        assert!(data.starts_with(&sink.into_inner()));
    }

    #[test]
    fn test_decompress_malformed() {
        let mut codec = Inflater::new();
        let mut sink = WriteSink(Vec::new());
        let (mut inb, mut outb) = (vec![0u8; 64], vec![0u8; 64]);
        let err = decompress_stream(
            &mut codec,
            &mut chunked_source(b"definitely not deflate"),
            &mut sink,
            &mut inb,
            &mut outb,
        )
        .unwrap_err();
        assert_eq!(err.fault(), Some(Fault::MalformedInput));
    }

    #[test]
    fn test_source_error_is_wrapped() {
        struct Failing;
        impl Read for Failing {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::Other, "disk gone"))
            }
        }

        let mut codec = Inflater::new();
        let mut sink = WriteSink(Vec::new());
        let (mut inb, mut outb) = (vec![0u8; 8], vec![0u8; 8]);
        let err = decompress_stream(
            &mut codec,
            &mut ReadSource(Failing),
            &mut sink,
            &mut inb,
            &mut outb,
        )
        .unwrap_err();
        assert!(matches!(err, StreamError::Source(_)));
    }
}
