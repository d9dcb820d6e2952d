// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Single-size-class, lock-free free list.
//!
//! A [`FreeListPool`] hands out blocks of exactly one size. Returned blocks
//! are pushed onto a Treiber stack and reused by the next acquire; they are
//! never handed back to the allocator while the pool is alive.
//!
//! # Layout
//! ```text
//!  head: AtomicU64 = [ tag: u32 | top slot + 1: u32 ]
//!                                   │
//!  segments[k] ──► [Slot; 2^k]      ▼
//!                  Slot { next: AtomicU32, block: Box<[u8]> }
//! ```
//!
//! Slots live in an append-only segmented arena: segment `k` holds `2^k`
//! slots and is never moved or freed until the pool is dropped, so a slot
//! index is a stable address for the lifetime of the pool. A slot's `next`
//! link is only meaningful while the slot sits on the free list.
//!
//! # ABA
//! Every successful CAS on `head` increments the tag. A pop that read
//! `(tag, X)` and `X.next = Y` can only install `Y` if no other push or pop
//! happened in between, so a block that was popped and pushed back
//! concurrently can never be handed to two callers.

use crate::{ClassStats, PoolError, PooledBuf};
use std::cell::UnsafeCell;
use std::ptr;
use std::sync::atomic::{AtomicPtr, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Number of arena segments. Segment `k` holds `2^k` slots.
const SEGMENT_COUNT: usize = 32;

/// Largest usable slot index. Indices are stored as `index + 1` in 32 bits.
const MAX_SLOT_INDEX: usize = u32::MAX as usize - 1;

/// Encoded "no slot" marker for `head` and `next` links.
const NIL: u32 = 0;

struct Slot {
    /// Encoded index (`slot + 1`) of the next free slot, or [`NIL`].
    next: AtomicU32,
    /// The block itself. Empty until the slot is first claimed.
    block: UnsafeCell<Box<[u8]>>,
}

impl Slot {
    fn vacant() -> Self {
        Self {
            next: AtomicU32::new(NIL),
            block: UnsafeCell::new(Box::default()),
        }
    }
}

/// A lock-free pool of fixed-size byte blocks.
///
/// Blocks are acquired as [`PooledBuf`] handles; dropping a handle pushes
/// its block back onto this pool's free list. Each handle holds an `Arc`
/// to the pool, so the pool (and every block it ever allocated) is freed
/// only after the last outstanding handle is gone.
///
/// # Example
/// ```
/// use block_pool::FreeListPool;
///
/// let pool = FreeListPool::new(4096);
/// let buf = pool.acquire().unwrap();
/// assert_eq!(buf.capacity(), 4096);
/// assert!(buf.is_empty());
///
/// drop(buf);
/// assert_eq!(pool.available(), 1);
/// ```
pub struct FreeListPool {
    block_size: usize,
    /// Packed `(tag << 32) | (top slot + 1)`.
    head: AtomicU64,
    segments: [AtomicPtr<Slot>; SEGMENT_COUNT],
    /// Next never-used slot index.
    next_slot: AtomicUsize,
    /// Blocks created so far (live or free).
    allocated: AtomicUsize,
    /// Blocks currently on the free list (may briefly over-count during a push).
    available: AtomicUsize,
    hits: AtomicU64,
    misses: AtomicU64,
    releases: AtomicU64,
}

// SAFETY: a slot's `block` cell is only touched by the single owner that
// claimed or popped the slot; ownership moves between threads through the
// Release/Acquire CAS on `head`. All other shared state is atomic.
unsafe impl Send for FreeListPool {}
unsafe impl Sync for FreeListPool {}

impl FreeListPool {
    /// Creates an empty pool of `block_size`-byte blocks.
    ///
    /// No memory is reserved up front; the pool grows on demand.
    ///
    /// # Panics
    /// Panics if `block_size` is zero.
    pub fn new(block_size: usize) -> Arc<Self> {
        assert!(block_size > 0, "block size must be non-zero");
        Arc::new(Self {
            block_size,
            head: AtomicU64::new(pack(0, NIL)),
            segments: std::array::from_fn(|_| AtomicPtr::new(ptr::null_mut())),
            next_slot: AtomicUsize::new(0),
            allocated: AtomicUsize::new(0),
            available: AtomicUsize::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            releases: AtomicU64::new(0),
        })
    }

    /// Acquires one block with capacity equal to the pool's block size.
    ///
    /// Reuses the most recently released block if there is one; otherwise a
    /// fresh block is taken from the backing allocator.
    pub fn acquire(self: &Arc<Self>) -> Result<PooledBuf, PoolError> {
        self.acquire_with_capacity(self.block_size)
    }

    /// Returns a buffer to its pool. Equivalent to dropping it.
    pub fn release(buf: PooledBuf) {
        drop(buf);
    }

    /// Acquires a block but exposes only `capacity` bytes of it.
    pub(crate) fn acquire_with_capacity(
        self: &Arc<Self>,
        capacity: usize,
    ) -> Result<PooledBuf, PoolError> {
        debug_assert!(capacity <= self.block_size);

        let index = match self.pop() {
            Some(index) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                index
            }
            None => {
                let index = self.grow()?;
                self.misses.fetch_add(1, Ordering::Relaxed);
                index
            }
        };

        Ok(PooledBuf::new(Arc::clone(self), index, capacity))
    }

    /// Returns the fixed size of every block in this pool.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Returns the number of blocks currently on the free list.
    pub fn available(&self) -> usize {
        self.available.load(Ordering::Acquire)
    }

    /// Returns the number of blocks ever allocated by this pool.
    pub fn allocated(&self) -> usize {
        self.allocated.load(Ordering::Acquire)
    }

    /// Returns a snapshot of this pool's counters.
    pub fn stats(&self) -> ClassStats {
        ClassStats {
            block_size: self.block_size,
            blocks_allocated: self.allocated(),
            blocks_available: self.available(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            releases: self.releases.load(Ordering::Relaxed),
        }
    }

    /// Pushes a slot back onto the free list. Called by `PooledBuf::drop`.
    pub(crate) fn push(&self, index: u32) {
        let slot = self.slot(index);
        let encoded = index + 1;

        // Counted before the CAS so a racing pop can never decrement first.
        self.available.fetch_add(1, Ordering::Relaxed);

        let mut head = self.head.load(Ordering::Relaxed);
        loop {
            slot.next.store(top_of(head), Ordering::Relaxed);
            let new_head = pack(tag_of(head).wrapping_add(1), encoded);
            match self.head.compare_exchange_weak(
                head,
                new_head,
                Ordering::Release,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => head = actual,
            }
        }

        self.releases.fetch_add(1, Ordering::Relaxed);
    }

    /// Raw pointer to a slot's block. The caller must own the slot.
    pub(crate) fn block_cell(&self, index: u32) -> *mut Box<[u8]> {
        self.slot(index).block.get()
    }

    fn pop(&self) -> Option<u32> {
        let mut head = self.head.load(Ordering::Acquire);
        loop {
            let top = top_of(head);
            if top == NIL {
                return None;
            }

            // The slot may be popped and re-pushed under us; the tag check
            // in the CAS rejects any `next` we read in that window.
            let next = self.slot(top - 1).next.load(Ordering::Acquire);
            let new_head = pack(tag_of(head).wrapping_add(1), next);

            match self.head.compare_exchange_weak(
                head,
                new_head,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    self.available.fetch_sub(1, Ordering::Relaxed);
                    return Some(top - 1);
                }
                Err(actual) => head = actual,
            }
        }
    }

    /// Claims a never-used slot and allocates its block.
    fn grow(&self) -> Result<u32, PoolError> {
        let index = self.next_slot.fetch_add(1, Ordering::Relaxed);
        if index > MAX_SLOT_INDEX {
            return Err(PoolError::AllocationFailed {
                size: self.block_size,
            });
        }
        let index = index as u32;

        let (segment, offset) = locate(index);
        let slots = self.ensure_segment(segment);
        let block = allocate_block(self.block_size)?;

        // SAFETY: `index` came from `fetch_add`, so no other thread knows
        // this slot yet.
        unsafe {
            let slot: &Slot = &*slots.add(offset);
            *slot.block.get() = block;
        }

        let total = self.allocated.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::trace!(
            block_size = self.block_size,
            blocks = total,
            "free list grew by one block"
        );

        Ok(index)
    }

    fn slot(&self, index: u32) -> &Slot {
        let (segment, offset) = locate(index);
        let base = self.segments[segment].load(Ordering::Acquire);
        debug_assert!(!base.is_null(), "slot {index} lives in an unallocated segment");
        // SAFETY: a slot index is only observed after `grow` has installed
        // its segment, and segments are never freed while `self` is alive.
        unsafe { &*base.add(offset) }
    }

    fn ensure_segment(&self, segment: usize) -> *mut Slot {
        let current = self.segments[segment].load(Ordering::Acquire);
        if !current.is_null() {
            return current;
        }

        let fresh: Box<[Slot]> = (0..segment_len(segment)).map(|_| Slot::vacant()).collect();
        let fresh = Box::into_raw(fresh) as *mut Slot;

        match self.segments[segment].compare_exchange(
            ptr::null_mut(),
            fresh,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => fresh,
            Err(winner) => {
                // SAFETY: `fresh` was never published.
                unsafe { free_segment(fresh, segment) };
                winner
            }
        }
    }
}

impl Drop for FreeListPool {
    fn drop(&mut self) {
        for (segment, ptr) in self.segments.iter_mut().enumerate() {
            let base = *ptr.get_mut();
            if !base.is_null() {
                // SAFETY: `&mut self` proves no handle refers to this pool.
                unsafe { free_segment(base, segment) };
            }
        }
    }
}

impl std::fmt::Debug for FreeListPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FreeListPool")
            .field("block_size", &self.block_size)
            .field("allocated", &self.allocated())
            .field("available", &self.available())
            .finish()
    }
}

fn pack(tag: u32, top: u32) -> u64 {
    (u64::from(tag) << 32) | u64::from(top)
}

fn tag_of(head: u64) -> u32 {
    (head >> 32) as u32
}

fn top_of(head: u64) -> u32 {
    head as u32
}

fn segment_len(segment: usize) -> usize {
    1usize << segment
}

/// Maps a slot index to `(segment, offset)`.
fn locate(index: u32) -> (usize, usize) {
    let n = u64::from(index) + 1;
    let segment = (63 - n.leading_zeros()) as usize;
    (segment, (n - (1u64 << segment)) as usize)
}

unsafe fn free_segment(base: *mut Slot, segment: usize) {
    drop(Box::from_raw(ptr::slice_from_raw_parts_mut(
        base,
        segment_len(segment),
    )));
}

fn allocate_block(size: usize) -> Result<Box<[u8]>, PoolError> {
    let mut block = Vec::new();
    block
        .try_reserve_exact(size)
        .map_err(|_| PoolError::AllocationFailed { size })?;
    block.resize(size, 0);
    Ok(block.into_boxed_slice())
}
