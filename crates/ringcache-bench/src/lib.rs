//! RingCache benchmarks.
//!
//! Run with:
//! ```bash
//! cargo bench -p ringcache-bench
//! ```

/// Ring capacity used across the benchmarks (128 KB).
pub const BENCH_CAPACITY: usize = 128 * 1024;
