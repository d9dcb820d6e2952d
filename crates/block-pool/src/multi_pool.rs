// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Size-class router over a fixed set of free lists.
//!
//! The [`MultiPool`] owns one [`FreeListPool`] per power-of-two size class,
//! from [`MIN_BLOCK_SIZE`] (512 B) to [`MAX_BLOCK_SIZE`] (4 MiB). A request
//! for `n` bytes is served by the smallest class whose block size is `>= n`;
//! an exact power of two maps to its own class, never the next one up.
//!
//! # Size Classes
//! ```text
//!  index:   0     1     2    ...   12      13
//!  block:  512   1K    2K    ...   2M      4M
//! ```
//!
//! # Process-wide Instance
//! [`global()`] returns a lazily created pool with `'static` lifetime. All
//! codec machinery that is not handed an explicit pool draws from it. It is
//! never torn down before process exit.

use crate::{FreeListPool, PoolError, PoolStats, PooledBuf};
use std::sync::{Arc, OnceLock};

/// Bits covered by the smallest class (`2^9 = 512`).
pub const MIN_CLASS_BITS: u32 = 9;

/// Number of size classes.
pub const CLASS_COUNT: usize = 14;

/// Block size of the smallest class.
pub const MIN_BLOCK_SIZE: usize = 1 << MIN_CLASS_BITS;

/// Block size of the largest class, and the largest request accepted.
pub const MAX_BLOCK_SIZE: usize = 1 << (MIN_CLASS_BITS as usize + CLASS_COUNT - 1);

static GLOBAL_POOL: OnceLock<MultiPool> = OnceLock::new();

/// Returns the process-wide multi-pool, creating it on first use.
pub fn global() -> &'static MultiPool {
    GLOBAL_POOL.get_or_init(|| {
        tracing::debug!(
            classes = CLASS_COUNT,
            max_block = MAX_BLOCK_SIZE,
            "process-wide block pool created"
        );
        MultiPool::new()
    })
}

/// Returns the class index that serves a request of `size` bytes.
///
/// Returns `None` for zero and for sizes above [`MAX_BLOCK_SIZE`].
pub fn size_class_index(size: usize) -> Option<usize> {
    if size == 0 {
        return None;
    }
    let scaled = (size - 1) >> MIN_CLASS_BITS;
    let index = (usize::BITS - scaled.leading_zeros()) as usize;
    (index < CLASS_COUNT).then_some(index)
}

/// Returns the block size of class `index`.
pub fn class_block_size(index: usize) -> usize {
    1 << (MIN_CLASS_BITS as usize + index)
}

/// A thread-safe router over [`CLASS_COUNT`] size-class free lists.
///
/// Cloning is cheap and yields another handle to the same classes.
///
/// # Example
/// ```
/// use block_pool::MultiPool;
///
/// let pool = MultiPool::new();
/// let buf = pool.acquire(3000).unwrap();
/// assert_eq!(buf.capacity(), 3000);
/// assert_eq!(buf.block_size(), 4096);
///
/// pool.release(buf);
/// assert_eq!(pool.stats().totals().blocks_available, 1);
/// ```
#[derive(Clone)]
pub struct MultiPool {
    classes: Arc<[Arc<FreeListPool>]>,
}

impl MultiPool {
    /// Creates a router with all classes empty.
    pub fn new() -> Self {
        let classes: Vec<_> = (0..CLASS_COUNT)
            .map(|i| FreeListPool::new(class_block_size(i)))
            .collect();
        Self {
            classes: classes.into(),
        }
    }

    /// Acquires a buffer with length zero and capacity `size`.
    ///
    /// The backing block comes from the smallest class that fits; its
    /// contents are whatever the previous holder left behind.
    pub fn acquire(&self, size: usize) -> Result<PooledBuf, PoolError> {
        if size == 0 {
            return Err(PoolError::ZeroSizedRequest);
        }
        let index = size_class_index(size).ok_or(PoolError::SizeTooLarge {
            requested: size,
            max: MAX_BLOCK_SIZE,
        })?;
        self.classes[index].acquire_with_capacity(size)
    }

    /// Returns a buffer to the class it came from. Equivalent to dropping it.
    pub fn release(&self, buf: PooledBuf) {
        drop(buf);
    }

    /// Drops this handle to the classes.
    ///
    /// Blocks are freed once the last handle and the last outstanding
    /// [`PooledBuf`] of each class are gone; buffers still in flight keep
    /// their own class alive.
    pub fn teardown(self) {
        tracing::debug!("{}", self.stats().summary());
        drop(self);
    }

    /// Returns the free list backing class `index`, if it exists.
    pub fn class(&self, index: usize) -> Option<&Arc<FreeListPool>> {
        self.classes.get(index)
    }

    /// Returns the block size of every class, smallest first.
    pub fn class_sizes(&self) -> impl Iterator<Item = usize> + '_ {
        self.classes.iter().map(|c| c.block_size())
    }

    /// Returns a snapshot of every class's counters.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            classes: self.classes.iter().map(|c| c.stats()).collect(),
        }
    }
}

impl Default for MultiPool {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MultiPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let totals = self.stats().totals();
        f.debug_struct("MultiPool")
            .field("classes", &self.classes.len())
            .field("blocks_allocated", &totals.blocks_allocated)
            .field("blocks_available", &totals.blocks_available)
            .finish()
    }
}
