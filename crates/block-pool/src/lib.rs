// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # block-pool
//!
//! A lock-free, size-segregated pool of reusable byte buffers for
//! allocation-heavy hot paths such as compression work buffers.
//!
//! # Key Components
//!
//! - [`FreeListPool`]: one size class. A Treiber stack of fixed-size blocks
//!   with constant-time, non-blocking acquire and release.
//! - [`MultiPool`]: fourteen power-of-two classes from 512 B to 4 MiB;
//!   routes each request to the smallest class that fits.
//! - [`PooledBuf`]: an RAII handle to one block. Dropping it pushes the
//!   block back onto its free list.
//! - [`global()`]: the process-wide [`MultiPool`].
//! - [`PoolStats`] / [`ClassStats`]: hit/miss and occupancy counters.
//! - [`ByteSize`]: `"64K"`-style size parsing for configuration.
//!
//! # Ownership Model
//!
//! ```text
//! MultiPool::acquire(size)
//!       │  size_class_index(size)
//!       ▼
//!   FreeListPool::pop() ──(empty)──► allocate fresh block
//!       │
//!       ▼
//!   PooledBuf  ◄─── owns slot index, holds Arc<FreeListPool>
//!       │
//!       │  drop()
//!       ▼
//!   FreeListPool::push()  ──► free list (never back to the OS)
//! ```
//!
//! Memory is only returned to the allocator when a class is dropped, which
//! cannot happen while any of its buffers is still held.
//!
//! # Example
//! ```
//! use block_pool::MultiPool;
//!
//! let pool = MultiPool::new();
//!
//! let a = pool.acquire(1000).unwrap();  // served by the 1 KiB class
//! let b = pool.acquire(4096).unwrap();  // exact fit, 4 KiB class
//! assert_eq!(a.block_size(), 1024);
//! assert_eq!(b.block_size(), 4096);
//!
//! drop(a);
//! drop(b);
//! assert_eq!(pool.stats().totals().blocks_available, 2);
//! ```

mod buffer;
mod error;
mod free_list;
mod multi_pool;
mod size;
mod stats;

pub use buffer::PooledBuf;
pub use error::PoolError;
pub use free_list::FreeListPool;
pub use multi_pool::{
    class_block_size, global, size_class_index, MultiPool, CLASS_COUNT, MAX_BLOCK_SIZE,
    MIN_BLOCK_SIZE, MIN_CLASS_BITS,
};
pub use size::ByteSize;
pub use stats::{ClassStats, PoolStats};
