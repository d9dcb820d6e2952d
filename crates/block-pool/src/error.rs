// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the block pool.

/// Errors that can occur while acquiring pooled buffers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// Attempted to acquire a zero-sized buffer.
    #[error("cannot acquire a zero-sized buffer")]
    ZeroSizedRequest,

    /// The request does not fit in the largest size class.
    #[error("requested {requested} bytes, but the largest size class holds {max} bytes")]
    SizeTooLarge { requested: usize, max: usize },

    /// The backing allocator could not provide a fresh block.
    #[error("backing allocator failed to provide a {size}-byte block")]
    AllocationFailed { size: usize },

    /// A human-readable size string could not be parsed.
    #[error("invalid byte size '{input}': {reason}")]
    InvalidByteSize { input: String, reason: String },
}
