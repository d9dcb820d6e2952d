// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Pool statistics for profiling and diagnostics.
//!
//! [`ClassStats`] is a snapshot of one size class; [`PoolStats`] collects
//! one per class of a [`MultiPool`](crate::MultiPool). Counters are read
//! with relaxed loads while other threads may be mutating them, so a
//! snapshot is approximate under contention.

/// Counters for a single size class.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ClassStats {
    /// Block size of this class in bytes.
    pub block_size: usize,
    /// Blocks ever taken from the backing allocator.
    pub blocks_allocated: usize,
    /// Blocks currently sitting on the free list.
    pub blocks_available: usize,
    /// Acquires served from the free list.
    pub hits: u64,
    /// Acquires that needed a fresh block.
    pub misses: u64,
    /// Blocks returned to the free list.
    pub releases: u64,
}

impl ClassStats {
    /// Returns the fraction of acquires served from the free list.
    ///
    /// Returns `0.0` if nothing has been acquired.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64
    }

    /// Returns the number of blocks currently held by callers.
    pub fn in_flight(&self) -> usize {
        self.blocks_allocated.saturating_sub(self.blocks_available)
    }

    /// Returns the bytes this class has reserved from the allocator.
    pub fn reserved_bytes(&self) -> usize {
        self.blocks_allocated * self.block_size
    }
}

/// Counters for every class of a multi-pool, smallest class first.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct PoolStats {
    pub classes: Vec<ClassStats>,
}

impl PoolStats {
    /// Returns the sum of all classes (with `block_size` left at zero).
    pub fn totals(&self) -> ClassStats {
        self.classes
            .iter()
            .fold(ClassStats::default(), |mut acc, c| {
                acc.blocks_allocated += c.blocks_allocated;
                acc.blocks_available += c.blocks_available;
                acc.hits += c.hits;
                acc.misses += c.misses;
                acc.releases += c.releases;
                acc
            })
    }

    /// Returns the bytes reserved across all classes.
    pub fn reserved_bytes(&self) -> usize {
        self.classes.iter().map(ClassStats::reserved_bytes).sum()
    }

    /// Returns only the classes that have ever allocated a block.
    pub fn active_classes(&self) -> impl Iterator<Item = &ClassStats> {
        self.classes.iter().filter(|c| c.blocks_allocated > 0)
    }

    /// Returns a human-readable one-line summary.
    pub fn summary(&self) -> String {
        let totals = self.totals();
        let reserved_mb = self.reserved_bytes() as f64 / (1024.0 * 1024.0);
        format!(
            "Pool: {} blocks ({} free, {} in flight), {} hits / {} misses ({:.0}% hit rate), \
             {} releases, {:.2} MB reserved",
            totals.blocks_allocated,
            totals.blocks_available,
            totals.in_flight(),
            totals.hits,
            totals.misses,
            totals.hit_ratio() * 100.0,
            totals.releases,
            reserved_mb,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(block_size: usize, allocated: usize, available: usize, hits: u64, misses: u64) -> ClassStats {
        ClassStats {
            block_size,
            blocks_allocated: allocated,
            blocks_available: available,
            hits,
            misses,
            releases: hits + misses,
        }
    }

    #[test]
    fn test_default() {
        let s = ClassStats::default();
        assert_eq!(s.hit_ratio(), 0.0);
        assert_eq!(s.in_flight(), 0);
    }

    #[test]
    fn test_hit_ratio() {
        let s = class(512, 1, 1, 2, 1);
        assert!((s.hit_ratio() - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_in_flight_and_reserved() {
        let s = class(1024, 4, 1, 0, 4);
        assert_eq!(s.in_flight(), 3);
        assert_eq!(s.reserved_bytes(), 4096);
    }

    #[test]
    fn test_totals() {
        let stats = PoolStats {
            classes: vec![class(512, 2, 2, 5, 2), class(1024, 1, 0, 0, 1)],
        };
        let t = stats.totals();
        assert_eq!(t.blocks_allocated, 3);
        assert_eq!(t.blocks_available, 2);
        assert_eq!(t.hits, 5);
        assert_eq!(t.misses, 3);
        assert_eq!(stats.reserved_bytes(), 2 * 512 + 1024);
        assert_eq!(stats.active_classes().count(), 2);
    }

    #[test]
    fn test_summary() {
        let stats = PoolStats {
            classes: vec![class(512, 2, 1, 1, 2)],
        };
        let summary = stats.summary();
        assert!(summary.contains("2 blocks"));
        assert!(summary.contains("1 free"));
        assert!(summary.contains("1 in flight"));
        assert!(summary.contains("1 hits / 2 misses"));
    }

    #[test]
    fn test_serialize() {
        let stats = PoolStats {
            classes: vec![class(512, 1, 1, 0, 1)],
        };
        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains("\"block_size\":512"));
    }
}
