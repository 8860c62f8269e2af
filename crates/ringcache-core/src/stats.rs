//! Allocation statistics for monitoring and debugging.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for ring activity.
///
/// All counters use relaxed atomics; they are diagnostics, not part of the
/// ring's synchronization protocol.
#[derive(Debug, Default)]
pub struct RingStats {
    /// Successful allocations.
    allocs: AtomicU64,
    /// Allocation attempts that found no space.
    alloc_failures: AtomicU64,
    /// Releases that advanced the free cursor in place.
    fast_releases: AtomicU64,
    /// Releases deferred through the header flag.
    deferred_releases: AtomicU64,
    /// Times the sweep found the ring drained and reset both cursors.
    resets: AtomicU64,
}

impl RingStats {
    /// Creates new statistics.
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn record_alloc(&self) {
        self.allocs.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_alloc_failure(&self) {
        self.alloc_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_fast_release(&self) {
        self.fast_releases.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_deferred_release(&self) {
        self.deferred_releases.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_reset(&self) {
        self.resets.fetch_add(1, Ordering::Relaxed);
    }

    /// Takes a point-in-time snapshot of all counters.
    pub fn snapshot(&self) -> RingStatsSnapshot {
        RingStatsSnapshot {
            allocs: self.allocs.load(Ordering::Relaxed),
            alloc_failures: self.alloc_failures.load(Ordering::Relaxed),
            fast_releases: self.fast_releases.load(Ordering::Relaxed),
            deferred_releases: self.deferred_releases.load(Ordering::Relaxed),
            resets: self.resets.load(Ordering::Relaxed),
        }
    }

    /// Resets all counters to zero.
    pub fn reset(&self) {
        self.allocs.store(0, Ordering::Relaxed);
        self.alloc_failures.store(0, Ordering::Relaxed);
        self.fast_releases.store(0, Ordering::Relaxed);
        self.deferred_releases.store(0, Ordering::Relaxed);
        self.resets.store(0, Ordering::Relaxed);
    }
}

/// A point-in-time copy of [`RingStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RingStatsSnapshot {
    /// Successful allocations.
    pub allocs: u64,
    /// Allocation attempts that found no space.
    pub alloc_failures: u64,
    /// Releases that advanced the free cursor in place.
    pub fast_releases: u64,
    /// Releases deferred through the header flag.
    pub deferred_releases: u64,
    /// Times the sweep reset both cursors.
    pub resets: u64,
}

impl RingStatsSnapshot {
    /// Total releases observed, on either path.
    pub fn releases(&self) -> u64 {
        self.fast_releases + self.deferred_releases
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_counters() {
        let stats = RingStats::new();
        stats.record_alloc();
        stats.record_alloc();
        stats.record_alloc_failure();
        stats.record_fast_release();
        stats.record_deferred_release();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.allocs, 2);
        assert_eq!(snapshot.alloc_failures, 1);
        assert_eq!(snapshot.releases(), 2);
    }

    #[test]
    fn test_stats_reset() {
        let stats = RingStats::new();
        stats.record_alloc();
        stats.reset();
        assert_eq!(stats.snapshot(), RingStatsSnapshot::default());
    }
}
