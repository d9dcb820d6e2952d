// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The codec boundary: a stateful DEFLATE compressor or decompressor driven
//! one bounded step at a time.
//!
//! The bitstream work is delegated to `flate2`'s low-level [`Compress`] and
//! [`Decompress`] types. This module only normalises their status codes into
//! a tagged [`Progress`] and maps their errors onto [`Fault`].
//!
//! # Step Outcomes
//! ```text
//!  step(input, output, flush)
//!      │
//!      ├── StreamEnd   end-of-stream marker emitted/seen (wins over the others)
//!      ├── OutputFull  output filled completely; call again for more
//!      └── Drained     output has room left; codec wants more input (or a flush)
//! ```

use crate::Fault;
use flate2::{Compress, Compression, Crc, Decompress, FlushCompress, FlushDecompress, Status};
use std::fmt;
use std::str::FromStr;

/// zlib's maximum (and default) window size.
const WINDOW_BITS: u8 = 15;

/// First byte of every gzip member.
const GZIP_MAGIC: u8 = 0x1f;

/// Stream framing around the raw DEFLATE data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// RFC 1952 gzip member (10-byte header, CRC-32 + size trailer).
    Gzip,
    /// RFC 1950 zlib stream (2-byte header, Adler-32 trailer).
    Zlib,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gzip => write!(f, "gzip"),
            Self::Zlib => write!(f, "zlib"),
        }
    }
}

impl FromStr for Format {
    type Err = crate::StreamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gzip" | "gz" => Ok(Self::Gzip),
            "zlib" | "zz" => Ok(Self::Zlib),
            other => Err(crate::StreamError::Config(format!(
                "unknown format '{other}'; expected 'gzip' or 'zlib'"
            ))),
        }
    }
}

/// Compression level, `0` (store) through `9` (smallest output).
///
/// Any `u32` can be held; out-of-range values are rejected when a codec is
/// opened with them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Level(u32);

impl Level {
    pub const NONE: Level = Level(0);
    pub const BEST_SPEED: Level = Level(1);
    pub const DEFAULT: Level = Level(6);
    pub const BEST_COMPRESSION: Level = Level(9);

    pub const fn new(level: u32) -> Self {
        Self(level)
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    /// Returns `true` if a codec can be opened at this level.
    pub const fn is_valid(self) -> bool {
        self.0 <= Self::BEST_COMPRESSION.0
    }
}

impl Default for Level {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a transformer (or a one-shot call) does with its bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Compress { format: Format, level: Level },
    /// Decompress gzip or zlib, detected from the first byte.
    Decompress,
}

impl Mode {
    pub const fn gzip(level: Level) -> Self {
        Self::Compress {
            format: Format::Gzip,
            level,
        }
    }

    pub const fn zlib(level: Level) -> Self {
        Self::Compress {
            format: Format::Zlib,
            level,
        }
    }

    pub const fn is_compress(self) -> bool {
        matches!(self, Self::Compress { .. })
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compress { format, level } => write!(f, "{format} compress (level {level})"),
            Self::Decompress => write!(f, "decompress"),
        }
    }
}

/// How much a compress step should emit beyond what it must.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flush {
    /// Buffer freely; emit output only when blocks fill.
    None,
    /// Emit everything so far and byte-align, without ending the stream.
    Sync,
    /// Emit everything and write the stream trailer.
    Finish,
}

/// Where a codec stopped at the end of one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// The output region was filled; more output is pending.
    OutputFull,
    /// The output region has room; the codec needs more input to continue.
    Drained,
    /// The end-of-stream marker was written (compress) or reached (decompress).
    StreamEnd,
}

/// Result of one codec step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    /// Input bytes consumed.
    pub consumed: usize,
    /// Output bytes written to the front of the output region.
    pub produced: usize,
    pub progress: Progress,
}

impl Step {
    /// Returns `true` if the step moved any bytes at all.
    pub fn moved(&self) -> bool {
        self.consumed > 0 || self.produced > 0
    }
}

/// A stateful DEFLATE-family codec driven in bounded increments.
pub trait Codec {
    /// Runs one increment, consuming from `input` and writing to `output`.
    fn step(&mut self, input: &[u8], output: &mut [u8], flush: Flush) -> Result<Step, Fault>;

    /// Rewinds to a freshly initialised state with the same mode and level.
    fn reset(&mut self);

    /// Total bytes consumed since creation or the last reset.
    fn total_in(&self) -> u64;

    /// Total bytes produced since creation or the last reset.
    fn total_out(&self) -> u64;
}

/// Opens a codec for `mode`.
///
/// Fails with [`Fault::InitFailed`] if the level is out of range.
pub fn open(mode: Mode) -> Result<Box<dyn Codec + Send>, Fault> {
    match mode {
        Mode::Compress { format, level } => Ok(Box::new(Deflater::new(format, level)?)),
        Mode::Decompress => Ok(Box::new(Inflater::new())),
    }
}

fn classify(status: Status, produced: usize, capacity: usize) -> Progress {
    match status {
        Status::StreamEnd => Progress::StreamEnd,
        _ if capacity > 0 && produced == capacity => Progress::OutputFull,
        _ => Progress::Drained,
    }
}

// ── Compression ────────────────────────────────────────────────

/// gzip or zlib compressor.
pub struct Deflater {
    inner: Compress,
    format: Format,
    level: Level,
    finished: bool,
}

impl Deflater {
    pub fn new(format: Format, level: Level) -> Result<Self, Fault> {
        if !level.is_valid() {
            return Err(Fault::InitFailed);
        }
        let compression = Compression::new(level.get());
        let inner = match format {
            Format::Gzip => Compress::new_gzip(compression, WINDOW_BITS),
            Format::Zlib => Compress::new(compression, true),
        };
        Ok(Self {
            inner,
            format,
            level,
            finished: false,
        })
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn level(&self) -> Level {
        self.level
    }
}

impl Codec for Deflater {
    fn step(&mut self, input: &[u8], output: &mut [u8], flush: Flush) -> Result<Step, Fault> {
        if self.finished {
            if !input.is_empty() {
                return Err(Fault::StreamInconsistent);
            }
            return Ok(Step {
                consumed: 0,
                produced: 0,
                progress: Progress::StreamEnd,
            });
        }

        let (in_before, out_before) = (self.inner.total_in(), self.inner.total_out());
        let flush = match flush {
            Flush::None => FlushCompress::None,
            Flush::Sync => FlushCompress::Sync,
            Flush::Finish => FlushCompress::Finish,
        };
        let status = self
            .inner
            .compress(input, output, flush)
            .map_err(|_| Fault::StreamInconsistent)?;

        let consumed = (self.inner.total_in() - in_before) as usize;
        let produced = (self.inner.total_out() - out_before) as usize;
        let progress = classify(status, produced, output.len());
        self.finished = progress == Progress::StreamEnd;

        Ok(Step {
            consumed,
            produced,
            progress,
        })
    }

    fn reset(&mut self) {
        self.inner.reset();
        self.finished = false;
    }

    fn total_in(&self) -> u64 {
        self.inner.total_in()
    }

    fn total_out(&self) -> u64 {
        self.inner.total_out()
    }
}

impl fmt::Debug for Deflater {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deflater")
            .field("format", &self.format)
            .field("level", &self.level)
            .field("total_in", &self.inner.total_in())
            .field("total_out", &self.inner.total_out())
            .finish()
    }
}

// ── Decompression ──────────────────────────────────────────────

/// gzip flag bits (RFC 1952 §2.3.1).
const FHCRC: u8 = 0x02;
const FEXTRA: u8 = 0x04;
const FNAME: u8 = 0x08;
const FCOMMENT: u8 = 0x10;
const FRESERVED: u8 = 0xe0;

/// ID1, ID2 and CM (deflate) at the start of every gzip member.
const GZIP_ID: [u8; 3] = [GZIP_MAGIC, 0x8b, 8];
const GZIP_HEADER_LEN: usize = 10;
const GZIP_TRAILER_LEN: usize = 8;

/// Optional header fields, in stream order, with the flag that enables each.
const OPTIONAL_FIELDS: [(u8, HeaderStage); 4] = [
    (FEXTRA, HeaderStage::ExtraLen),
    (FNAME, HeaderStage::Name),
    (FCOMMENT, HeaderStage::Comment),
    (FHCRC, HeaderStage::Checksum),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderStage {
    Fixed,
    ExtraLen,
    Extra(u16),
    Name,
    Comment,
    Checksum,
    Done,
}

/// Incremental gzip header parser. Accepts the header in chunks of any size.
struct GzipHeader {
    stage: HeaderStage,
    flags: u8,
    scratch: [u8; GZIP_HEADER_LEN],
    have: usize,
    /// CRC-32 of every header byte before the optional header checksum.
    crc: Crc,
}

impl GzipHeader {
    fn new() -> Self {
        Self {
            stage: HeaderStage::Fixed,
            flags: 0,
            scratch: [0; GZIP_HEADER_LEN],
            have: 0,
            crc: Crc::new(),
        }
    }

    fn reset(&mut self) {
        self.stage = HeaderStage::Fixed;
        self.flags = 0;
        self.have = 0;
        self.crc.reset();
    }

    /// First enabled optional field at or after `OPTIONAL_FIELDS[from]`.
    fn next_stage(&self, from: usize) -> HeaderStage {
        OPTIONAL_FIELDS[from..]
            .iter()
            .find(|(flag, _)| self.flags & flag != 0)
            .map_or(HeaderStage::Done, |&(_, stage)| stage)
    }

    /// Consumes header bytes from `input`. Returns how many were taken and
    /// whether the header is now complete.
    fn feed(&mut self, input: &[u8]) -> Result<(usize, bool), Fault> {
        let mut pos = 0;
        loop {
            let rest = &input[pos..];
            match self.stage {
                HeaderStage::Done => return Ok((pos, true)),
                HeaderStage::Fixed | HeaderStage::ExtraLen | HeaderStage::Checksum => {
                    let want = match self.stage {
                        HeaderStage::Fixed => GZIP_HEADER_LEN,
                        _ => 2,
                    };
                    let n = (want - self.have).min(rest.len());
                    self.scratch[self.have..self.have + n].copy_from_slice(&rest[..n]);
                    if self.stage != HeaderStage::Checksum {
                        self.crc.update(&rest[..n]);
                    }
                    self.have += n;
                    pos += n;

                    if self.stage == HeaderStage::Fixed {
                        let known = self.have.min(GZIP_ID.len());
                        if self.scratch[..known] != GZIP_ID[..known] {
                            return Err(Fault::MalformedInput);
                        }
                    }
                    if self.have < want {
                        return Ok((pos, false));
                    }
                    self.have = 0;
                    self.complete_fixed_field()?;
                }
                HeaderStage::Extra(remaining) => {
                    let n = usize::from(remaining).min(rest.len());
                    self.crc.update(&rest[..n]);
                    pos += n;
                    let left = remaining - n as u16;
                    if left > 0 {
                        self.stage = HeaderStage::Extra(left);
                        return Ok((pos, false));
                    }
                    self.stage = self.next_stage(1);
                }
                HeaderStage::Name | HeaderStage::Comment => {
                    let Some(end) = rest.iter().position(|&b| b == 0) else {
                        self.crc.update(rest);
                        return Ok((input.len(), false));
                    };
                    self.crc.update(&rest[..=end]);
                    pos += end + 1;
                    self.stage = match self.stage {
                        HeaderStage::Name => self.next_stage(2),
                        _ => self.next_stage(3),
                    };
                }
            }
        }
    }

    fn complete_fixed_field(&mut self) -> Result<(), Fault> {
        let s = &self.scratch;
        self.stage = match self.stage {
            HeaderStage::Fixed => {
                if s[3] & FRESERVED != 0 {
                    return Err(Fault::MalformedInput);
                }
                self.flags = s[3];
                self.next_stage(0)
            }
            HeaderStage::ExtraLen => HeaderStage::Extra(u16::from_le_bytes([s[0], s[1]])),
            _ => {
                let expected = u16::from_le_bytes([s[0], s[1]]);
                if (self.crc.sum() & 0xffff) as u16 != expected {
                    return Err(Fault::MalformedInput);
                }
                HeaderStage::Done
            }
        };
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Waiting for the first byte of a stream.
    Detect,
    GzipHeader,
    Body(Format),
    GzipTrailer,
    Done,
}

/// Decompressor that accepts either gzip or zlib framing.
///
/// The framing is picked from the first input byte: `0x1f` starts a gzip
/// member, anything else is handed to the zlib decoder (which rejects it if
/// it is not a valid zlib header).
///
/// zlib streams run through a zlib-wrapped decoder. gzip members run through
/// a raw DEFLATE decoder; the header is parsed here and the trailer's CRC-32
/// and length are checked against the output. Each decoder is built the first
/// time its framing is seen and survives [`reset`](Codec::reset), so a reused
/// inflater allocates nothing per stream.
pub struct Inflater {
    phase: Phase,
    format: Option<Format>,
    zlib: Option<Decompress>,
    raw: Option<Decompress>,
    header: GzipHeader,
    /// CRC-32 and length of the gzip member's output so far.
    crc: Crc,
    trailer: [u8; GZIP_TRAILER_LEN],
    trailer_len: usize,
    total_in: u64,
    total_out: u64,
}

impl Inflater {
    pub fn new() -> Self {
        Self {
            phase: Phase::Detect,
            format: None,
            zlib: None,
            raw: None,
            header: GzipHeader::new(),
            crc: Crc::new(),
            trailer: [0; GZIP_TRAILER_LEN],
            trailer_len: 0,
            total_in: 0,
            total_out: 0,
        }
    }

    /// Returns the detected framing, once input has been seen.
    pub fn format(&self) -> Option<Format> {
        self.format
    }

    fn check_trailer(&self) -> Result<(), Fault> {
        let t = &self.trailer;
        let crc = u32::from_le_bytes([t[0], t[1], t[2], t[3]]);
        let size = u32::from_le_bytes([t[4], t[5], t[6], t[7]]);
        if crc != self.crc.sum() || size != self.crc.amount() {
            return Err(Fault::MalformedInput);
        }
        Ok(())
    }
}

impl Default for Inflater {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec for Inflater {
    fn step(&mut self, input: &[u8], output: &mut [u8], flush: Flush) -> Result<Step, Fault> {
        let flush = match flush {
            Flush::None => FlushDecompress::None,
            Flush::Sync => FlushDecompress::Sync,
            Flush::Finish => FlushDecompress::Finish,
        };
        let mut consumed = 0;
        let mut produced = 0;

        loop {
            let rest = &input[consumed..];
            match self.phase {
                Phase::Done => break,
                Phase::Detect => {
                    let Some(&first) = rest.first() else {
                        break;
                    };
                    let format = if first == GZIP_MAGIC {
                        Format::Gzip
                    } else {
                        Format::Zlib
                    };
                    self.format = Some(format);
                    self.phase = match format {
                        Format::Gzip => Phase::GzipHeader,
                        Format::Zlib => Phase::Body(Format::Zlib),
                    };
                }
                Phase::GzipHeader => {
                    let (n, complete) = self.header.feed(rest)?;
                    consumed += n;
                    if !complete {
                        break;
                    }
                    self.phase = Phase::Body(Format::Gzip);
                }
                Phase::Body(format) => {
                    let decoder = match format {
                        Format::Gzip => self.raw.get_or_insert_with(|| Decompress::new(false)),
                        Format::Zlib => self.zlib.get_or_insert_with(|| Decompress::new(true)),
                    };
                    let out = &mut output[produced..];
                    let (in_before, out_before) = (decoder.total_in(), decoder.total_out());
                    // A dictionary request is reported as an error too; no
                    // dictionary mechanism is exposed, so it is malformed input.
                    let status = decoder
                        .decompress(rest, out, flush)
                        .map_err(|_| Fault::MalformedInput)?;
                    let n_in = (decoder.total_in() - in_before) as usize;
                    let n_out = (decoder.total_out() - out_before) as usize;

                    if format == Format::Gzip {
                        self.crc.update(&out[..n_out]);
                    }
                    consumed += n_in;
                    produced += n_out;

                    if status != Status::StreamEnd {
                        break;
                    }
                    self.phase = match format {
                        Format::Gzip => Phase::GzipTrailer,
                        Format::Zlib => Phase::Done,
                    };
                }
                Phase::GzipTrailer => {
                    let n = (GZIP_TRAILER_LEN - self.trailer_len).min(rest.len());
                    self.trailer[self.trailer_len..self.trailer_len + n]
                        .copy_from_slice(&rest[..n]);
                    self.trailer_len += n;
                    consumed += n;
                    if self.trailer_len < GZIP_TRAILER_LEN {
                        break;
                    }
                    self.check_trailer()?;
                    self.phase = Phase::Done;
                }
            }
        }

        self.total_in += consumed as u64;
        self.total_out += produced as u64;

        let progress = if self.phase == Phase::Done {
            Progress::StreamEnd
        } else if !output.is_empty() && produced == output.len() {
            Progress::OutputFull
        } else {
            Progress::Drained
        };

        Ok(Step {
            consumed,
            produced,
            progress,
        })
    }

    fn reset(&mut self) {
        if let Some(decoder) = self.zlib.as_mut() {
            decoder.reset(true);
        }
        if let Some(decoder) = self.raw.as_mut() {
            decoder.reset(false);
        }
        self.header.reset();
        self.crc.reset();
        self.phase = Phase::Detect;
        self.format = None;
        self.trailer_len = 0;
        self.total_in = 0;
        self.total_out = 0;
    }

    fn total_in(&self) -> u64 {
        self.total_in
    }

    fn total_out(&self) -> u64 {
        self.total_out
    }
}

impl fmt::Debug for Inflater {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inflater")
            .field("format", &self.format)
            .field("phase", &self.phase)
            .field("total_in", &self.total_in)
            .field("total_out", &self.total_out)
            .finish()
    }
}
