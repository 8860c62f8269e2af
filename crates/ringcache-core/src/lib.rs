//! # ringcache-core
//!
//! A fixed-capacity, contiguous byte arena that hands out variable-sized,
//! caller-owned slots and reclaims their storage when the handles drop.
//!
//! The ring allocates its backing region exactly once. Two atomic cursors
//! (`write` and `free`) delimit the occupied range; every slot is prefixed
//! by a 4-byte header carrying its length and a released flag, which lets
//! holders return slots in any order while reclamation stays a forward
//! sweep from the oldest slot.
//!
//! Allocation never blocks and never touches the heap after construction:
//! [`RingBuffer::try_alloc`] either returns a [`Slot`] or `None` when the
//! request cannot be satisfied right now.
//!
//! # Example
//!
//! ```rust
//! use ringcache_core::RingBuffer;
//!
//! let ring = RingBuffer::new(1024);
//!
//! let mut slot = ring.try_alloc(128).expect("empty ring has space");
//! slot.as_mut_slice().fill(0xAB);
//! slot.flush();
//!
//! // Storage is reclaimed when the slot drops.
//! drop(slot);
//! assert!(ring.try_alloc(1024).is_some());
//! ```
//!
//! # Thread model
//!
//! Single producer, multiple releasers: one thread calls `try_alloc`, any
//! number of threads may hold and drop slots. Payload visibility across
//! threads uses the explicit [`Slot::flush`] / [`Slot::synchronize`] pair.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod header;
mod region;
pub mod ring;
pub mod slot;
pub mod stats;

pub use config::RingConfig;
pub use error::{RingError, RingResult};
pub use header::{SlotHeader, HEADER_LEN};
pub use ring::RingBuffer;
pub use slot::Slot;
pub use stats::{RingStats, RingStatsSnapshot};
