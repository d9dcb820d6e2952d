// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Reusable compress/decompress unit.
//!
//! A [`Transformer`] pairs one live codec with one pooled work buffer. It is
//! acquired once, reset between unrelated streams, and released at the end,
//! so a long-running process can push many streams through it without
//! touching the allocator.
//!
//! The transformer does not hold its sink or source. Callers pass them to
//! each step; the stream adapters in [`crate::adapter`] own the pair.
//!
//! # Lifecycle
//! ```text
//!  acquire ──ok──► Ready ──write_step/read_step──► Active
//!     │              ▲                               │
//!     │              └────────────reset──────────────┘
//!     └──init fails──► Faulted (only release is legal)
//!
//!  release(self) from any state: codec ended, work buffer back to the pool
//! ```

use crate::codec::{self, Codec, Flush, Mode, Progress};
use crate::engine::{self, Sink, Source};
use crate::{Fault, StreamError};
use block_pool::{MultiPool, PooledBuf};
use std::ops::Range;

/// Observable lifecycle state of a [`Transformer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformerState {
    /// Freshly acquired or reset; no bytes processed yet.
    Ready,
    /// Some bytes have passed through since the last reset.
    Active,
    /// The codec failed to initialise.
    Faulted,
}

/// Outcome of a [`Transformer::write_step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteStep {
    /// Input bytes taken by the codec.
    pub consumed: usize,
    pub progress: Progress,
}

/// Why a [`Transformer::read_step`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// More output is pending from input already pulled; call again.
    MoreOutput,
    /// The pulled input is used up; the next call pulls from the source.
    NeedsInput,
    /// The source returned zero bytes and nothing is buffered.
    SourceExhausted,
    /// The end-of-stream marker was reached.
    StreamEnd,
}

/// Outcome of a [`Transformer::read_step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadStep {
    /// Bytes written to the front of the caller's output buffer.
    pub written: usize,
    pub status: ReadStatus,
}

/// A reusable codec plus pooled work buffer.
///
/// In compress mode the work buffer is the codec's output staging area and
/// the caller supplies input directly. In decompress mode it holds input
/// pulled from the source, and output goes straight into the caller's buffer.
///
/// Not safe for concurrent use; drive each instance from one thread at a time.
pub struct Transformer {
    mode: Mode,
    /// `None` when initialisation failed.
    codec: Option<Box<dyn Codec + Send>>,
    work: PooledBuf,
    /// Unconsumed input inside `work` (decompress mode).
    pending: Range<usize>,
    /// The last decompress step filled the caller's buffer.
    more_output: bool,
    finished: bool,
}

impl Transformer {
    /// Acquires a work buffer of `work_size` bytes from `pool` and opens a
    /// codec for `mode`.
    ///
    /// A pool failure is an error. A codec initialisation failure is not:
    /// the transformer is still returned, in the
    /// [`Faulted`](TransformerState::Faulted) state, so it can be released
    /// like any other. Call [`check`](Self::check) before use.
    pub fn acquire(pool: &MultiPool, mode: Mode, work_size: usize) -> Result<Self, StreamError> {
        let work = pool.acquire(work_size)?;
        let codec = match codec::open(mode) {
            Ok(codec) => Some(codec),
            Err(fault) => {
                tracing::warn!("transformer for {mode} failed to initialise: {fault}");
                None
            }
        };

        tracing::debug!(%mode, work_size, "transformer acquired");

        Ok(Self {
            mode,
            codec,
            work,
            pending: 0..0,
            more_output: false,
            finished: false,
        })
    }

    /// Returns an error if the codec failed to initialise.
    pub fn check(&self) -> Result<(), StreamError> {
        match self.codec {
            Some(_) => Ok(()),
            None => Err(StreamError::Init(self.mode)),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn state(&self) -> TransformerState {
        match &self.codec {
            None => TransformerState::Faulted,
            Some(c) if c.total_in() == 0 && c.total_out() == 0 && !self.finished => {
                TransformerState::Ready
            }
            Some(_) => TransformerState::Active,
        }
    }

    /// Size of the pooled work buffer.
    pub fn work_size(&self) -> usize {
        self.work.capacity()
    }

    /// Returns `true` once the end-of-stream marker was written or read.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn total_in(&self) -> u64 {
        self.codec.as_ref().map_or(0, |c| c.total_in())
    }

    pub fn total_out(&self) -> u64 {
        self.codec.as_ref().map_or(0, |c| c.total_out())
    }

    /// Feeds `input` to the compressor and pushes the output to `sink`.
    ///
    /// Empty input finishes the stream: the codec flushes everything and
    /// writes the trailer.
    pub fn write_step<K: Sink + ?Sized>(
        &mut self,
        input: &[u8],
        sink: &mut K,
    ) -> Result<WriteStep, StreamError> {
        let flush = if input.is_empty() {
            Flush::Finish
        } else {
            Flush::None
        };
        self.compress(input, flush, sink, "write")
    }

    /// Emits all pending compressed output, byte-aligned, without ending
    /// the stream.
    pub fn sync_step<K: Sink + ?Sized>(&mut self, sink: &mut K) -> Result<WriteStep, StreamError> {
        self.compress(&[], Flush::Sync, sink, "sync")
    }

    fn compress<K: Sink + ?Sized>(
        &mut self,
        input: &[u8],
        flush: Flush,
        sink: &mut K,
        operation: &'static str,
    ) -> Result<WriteStep, StreamError> {
        if !self.mode.is_compress() {
            return Err(StreamError::Unsupported {
                operation,
                mode: self.mode,
            });
        }
        let codec = self.codec.as_deref_mut().ok_or(StreamError::Init(self.mode))?;

        let mut rest = input;
        let progress =
            engine::compress_step(codec, &mut rest, flush, sink, self.work.storage_mut())?;
        if progress == Progress::StreamEnd {
            self.finished = true;
        }

        Ok(WriteStep {
            consumed: input.len() - rest.len(),
            progress,
        })
    }

    /// Runs one decompress increment into `output`.
    ///
    /// If no input is buffered and no output is pending, first pulls a chunk
    /// from `source` into the work buffer. Output is written directly into
    /// `output`, not staged.
    pub fn read_step<S: Source + ?Sized>(
        &mut self,
        source: &mut S,
        output: &mut [u8],
    ) -> Result<ReadStep, StreamError> {
        if self.mode.is_compress() {
            return Err(StreamError::Unsupported {
                operation: "read",
                mode: self.mode,
            });
        }
        let codec = self.codec.as_deref_mut().ok_or(StreamError::Init(self.mode))?;

        if self.finished {
            return Ok(ReadStep {
                written: 0,
                status: ReadStatus::StreamEnd,
            });
        }
        if output.is_empty() {
            let status = if self.more_output || !self.pending.is_empty() {
                ReadStatus::MoreOutput
            } else {
                ReadStatus::NeedsInput
            };
            return Ok(ReadStep { written: 0, status });
        }

        if self.pending.is_empty() && !self.more_output {
            let n = source
                .pull(self.work.storage_mut())
                .map_err(StreamError::Source)?;
            if n == 0 {
                return Ok(ReadStep {
                    written: 0,
                    status: ReadStatus::SourceExhausted,
                });
            }
            self.pending = 0..n;
        }

        let input = &self.work.storage()[self.pending.clone()];
        let step = codec
            .step(input, output, Flush::None)
            .map_err(StreamError::Decompress)?;
        self.pending.start += step.consumed;

        let status = match step.progress {
            Progress::StreamEnd => {
                self.finished = true;
                self.more_output = false;
                ReadStatus::StreamEnd
            }
            Progress::OutputFull => {
                self.more_output = true;
                ReadStatus::MoreOutput
            }
            Progress::Drained => {
                self.more_output = false;
                if self.pending.is_empty() {
                    ReadStatus::NeedsInput
                } else if step.moved() {
                    ReadStatus::MoreOutput
                } else {
                    return Err(StreamError::Decompress(Fault::StreamInconsistent));
                }
            }
        };

        Ok(ReadStep {
            written: step.produced,
            status,
        })
    }

    /// Rewinds the codec for a new, unrelated stream.
    ///
    /// The work buffer is kept. Buffered input and pending-output state are
    /// discarded. Fails only for a faulted transformer.
    pub fn reset(&mut self) -> Result<(), StreamError> {
        let codec = self.codec.as_deref_mut().ok_or(StreamError::Init(self.mode))?;
        codec.reset();
        self.pending = 0..0;
        self.more_output = false;
        self.finished = false;
        tracing::debug!(mode = %self.mode, "transformer reset");
        Ok(())
    }

    /// Ends the codec and returns the work buffer to its pool.
    pub fn release(self) {
        tracing::debug!(
            mode = %self.mode,
            total_in = self.total_in(),
            total_out = self.total_out(),
            "transformer released"
        );
    }
}

impl std::fmt::Debug for Transformer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transformer")
            .field("mode", &self.mode)
            .field("state", &self.state())
            .field("work_size", &self.work.capacity())
            .field("total_in", &self.total_in())
            .field("total_out", &self.total_out())
            .finish()
    }
}
