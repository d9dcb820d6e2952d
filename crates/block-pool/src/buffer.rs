// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! RAII handle for a pooled block.
//!
//! [`PooledBuf`] is the only way to reach a block's memory. It owns the
//! block exclusively while alive and pushes it back onto the owning
//! [`FreeListPool`]'s free list when dropped. Because the handle is moved
//! into `drop`, a block cannot be released twice, and because it holds an
//! `Arc` to its pool, the pool cannot be torn down underneath it.
//!
//! Contents are **not** scrubbed between uses: a freshly allocated block is
//! zero-filled once, and a reused block still holds whatever its previous
//! owner wrote.

use crate::FreeListPool;
use std::io;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

/// A fixed-capacity byte buffer borrowed from a pool.
///
/// Behaves like a `Vec<u8>` that can never reallocate: it starts with
/// length zero and capacity equal to the requested size, and it can only
/// grow up to that capacity.
///
/// # Example
/// ```
/// use block_pool::MultiPool;
/// use std::io::Write;
///
/// let pool = MultiPool::new();
/// let mut buf = pool.acquire(100).unwrap();
/// assert_eq!((buf.len(), buf.capacity()), (0, 100));
///
/// buf.write_all(b"hello").unwrap();
/// assert_eq!(&buf[..], b"hello");
/// ```
pub struct PooledBuf {
    pool: Arc<FreeListPool>,
    index: u32,
    capacity: usize,
    len: usize,
}

impl PooledBuf {
    pub(crate) fn new(pool: Arc<FreeListPool>, index: u32, capacity: usize) -> Self {
        Self {
            pool,
            index,
            capacity,
            len: 0,
        }
    }

    /// Returns the number of initialised-by-caller bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the buffer holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the usable capacity (the size originally requested).
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the size class of the underlying block.
    pub fn block_size(&self) -> usize {
        self.pool.block_size()
    }

    /// Sets the length, exposing whatever bytes the block already holds.
    ///
    /// Block memory is always initialised, so this is safe; it simply
    /// reveals stale contents from a previous owner.
    ///
    /// # Panics
    /// Panics if `len` exceeds the capacity.
    pub fn set_len(&mut self, len: usize) {
        assert!(
            len <= self.capacity,
            "length {len} exceeds capacity {}",
            self.capacity
        );
        self.len = len;
    }

    /// Truncates the length to zero. Contents are left in place.
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Returns the bytes in `[0, len)`.
    pub fn as_slice(&self) -> &[u8] {
        &self.storage()[..self.len]
    }

    /// Returns the bytes in `[0, len)` mutably.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        let len = self.len;
        &mut self.storage_mut()[..len]
    }

    /// Returns the whole `[0, capacity)` region regardless of length.
    pub fn storage(&self) -> &[u8] {
        // SAFETY: this handle owns the slot until it is dropped.
        let block: &[u8] = unsafe { &*self.pool.block_cell(self.index) };
        &block[..self.capacity]
    }

    /// Returns the whole `[0, capacity)` region mutably.
    pub fn storage_mut(&mut self) -> &mut [u8] {
        // SAFETY: this handle owns the slot until it is dropped, and
        // `&mut self` rules out any other live borrow of it.
        let block: &mut [u8] = unsafe { &mut *self.pool.block_cell(self.index) };
        &mut block[..self.capacity]
    }

    /// Returns the unused tail `[len, capacity)`.
    pub fn spare_capacity_mut(&mut self) -> &mut [u8] {
        let len = self.len;
        &mut self.storage_mut()[len..]
    }

    /// Appends as much of `data` as fits and returns the number of bytes copied.
    pub fn extend_from_slice(&mut self, data: &[u8]) -> usize {
        let spare = self.spare_capacity_mut();
        let n = spare.len().min(data.len());
        spare[..n].copy_from_slice(&data[..n]);
        self.len += n;
        n
    }

    #[cfg(test)]
    pub(crate) fn slot_index(&self) -> u32 {
        self.index
    }
}

impl Drop for PooledBuf {
    fn drop(&mut self) {
        self.pool.push(self.index);
    }
}

impl Deref for PooledBuf {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl DerefMut for PooledBuf {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.as_mut_slice()
    }
}

impl AsRef<[u8]> for PooledBuf {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl io::Write for PooledBuf {
    /// Copies up to the remaining capacity. Returns `Ok(0)` once full.
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        Ok(self.extend_from_slice(data))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl std::fmt::Debug for PooledBuf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledBuf")
            .field("len", &self.len)
            .field("capacity", &self.capacity)
            .field("block_size", &self.block_size())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::FreeListPool;
    use std::io::Write;

    #[test]
    fn test_starts_empty() {
        let pool = FreeListPool::new(512);
        let buf = pool.acquire().unwrap();
        assert_eq!(buf.len(), 0);
        assert!(buf.is_empty());
        assert_eq!(buf.capacity(), 512);
        assert_eq!(buf.storage().len(), 512);
    }

    #[test]
    fn test_extend_is_bounded() {
        let pool = FreeListPool::new(512);
        let mut buf = pool.acquire().unwrap();
        let data = vec![7u8; 600];

        assert_eq!(buf.extend_from_slice(&data), 512);
        assert_eq!(buf.len(), 512);
        assert_eq!(buf.extend_from_slice(&data), 0);
    }

    #[test]
    fn test_write_all_fails_when_full() {
        let pool = FreeListPool::new(512);
        let mut buf = pool.acquire().unwrap();
        let err = buf.write_all(&[1u8; 513]).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::WriteZero);
    }

    #[test]
    fn test_set_len_reveals_previous_contents() {
        let pool = FreeListPool::new(512);
        let mut buf = pool.acquire().unwrap();
        buf.write_all(b"stale").unwrap();
        drop(buf);

        let mut buf = pool.acquire().unwrap();
        assert!(buf.is_empty());
        buf.set_len(5);
        assert_eq!(&buf[..], b"stale");
    }

    #[test]
    #[should_panic(expected = "exceeds capacity")]
    fn test_set_len_past_capacity_panics() {
        let pool = FreeListPool::new(512);
        let mut buf = pool.acquire().unwrap();
        buf.set_len(513);
    }

    #[test]
    fn test_deref_mut_and_clear() {
        let pool = FreeListPool::new(512);
        let mut buf = pool.acquire().unwrap();
        buf.extend_from_slice(b"abc");
        buf[0] = b'x';
        assert_eq!(buf.as_slice(), b"xbc");

        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(&buf.storage()[..3], b"xbc");
    }

    #[test]
    fn test_storage_views_are_bounded_by_capacity() {
        let pool = crate::MultiPool::new();
        let mut buf = pool.acquire(700).unwrap();
        assert_eq!(buf.block_size(), 1024);

        buf.storage_mut().fill(0x5A);
        assert_eq!(buf.storage_mut().len(), 700);
        assert_eq!(buf.storage().len(), 700);
        assert!(buf.storage().iter().all(|&b| b == 0x5A));
    }

    #[test]
    fn test_debug_format() {
        let pool = FreeListPool::new(512);
        let buf = pool.acquire().unwrap();
        let debug = format!("{buf:?}");
        assert!(debug.contains("PooledBuf"));
        assert!(debug.contains("capacity"));
    }
}
