//! Ring configuration.

use crate::error::{RingError, RingResult};
use crate::header::HEADER_LEN;

/// Default ring capacity (64 KB).
pub const DEFAULT_CAPACITY: usize = 64 * 1024;

/// Configuration for a ring buffer.
#[derive(Debug, Clone)]
pub struct RingConfig {
    /// Usable payload capacity in bytes. The backing region is
    /// `capacity + HEADER_LEN` bytes so a slot spanning the full capacity
    /// always fits together with its header.
    pub capacity: usize,

    /// Whether to collect allocation statistics.
    pub enable_stats: bool,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            enable_stats: true,
        }
    }
}

impl RingConfig {
    /// Creates a configuration with the given capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Default::default()
        }
    }

    /// Enables or disables statistics collection.
    #[must_use]
    pub fn with_stats(mut self, enable: bool) -> Self {
        self.enable_stats = enable;
        self
    }

    /// Largest payload a single slot can carry under this configuration.
    ///
    /// Bounded by the capacity and by the header's 16-bit length field.
    pub fn max_slot_len(&self) -> usize {
        self.capacity.min(u16::MAX as usize)
    }

    /// Size of the backing region this configuration requires.
    pub fn region_len(&self) -> usize {
        self.capacity + HEADER_LEN
    }

    /// Validates the configuration.
    pub fn validate(&self) -> RingResult<()> {
        if self.capacity == 0 {
            return Err(RingError::config("capacity must be greater than 0"));
        }
        Ok(())
    }
}
