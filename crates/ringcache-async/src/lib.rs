//! # ringcache-async
//!
//! Suspending allocation on top of [`ringcache_core`].
//!
//! [`AsyncRing`] wraps a ring buffer and turns its non-blocking
//! `try_alloc` into an `async fn alloc` with backpressure: when the ring
//! has no space, the request parks in a FIFO queue and resumes once
//! released slots make room. Waiters wake strictly in arrival order; a
//! head request that still does not fit keeps every later waiter parked,
//! even smaller ones that would fit. That head-of-line policy is
//! deliberate — it keeps large requests from starving behind a stream of
//! small ones.
//!
//! # Example
//!
//! ```rust
//! use ringcache_async::AsyncRing;
//!
//! # async fn example() -> Result<(), ringcache_async::AllocError> {
//! let ring = AsyncRing::new(1024);
//!
//! let mut slot = ring.alloc(512).await?;
//! slot.as_mut_slice().fill(0x00);
//! slot.flush();
//!
//! // Dropping the slot frees space and wakes the next waiter, if any.
//! drop(slot);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod ring;

pub use error::{AllocError, AllocResult};
pub use ring::{AsyncRing, SharedSlot};
