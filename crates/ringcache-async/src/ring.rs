//! Suspending allocation with a FIFO waiter queue.
//!
//! The queue holds one record per parked request: the length it asked for
//! and a oneshot sender that resumes it. Every slot release re-runs the
//! head retry loop — allocate for the head, deliver, pop, repeat — and
//! stops at the first head that still does not fit, which is what keeps
//! wakeups FIFO and the head request safe from starvation.
//!
//! The queue mutex is held around every underlying `try_alloc` call, so
//! concurrent `alloc` callers and the wake path never allocate at the same
//! time; the ring below stays single-producer.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, trace};

use ringcache_core::{RingBuffer, RingConfig, RingResult, RingStatsSnapshot, Slot};

use crate::error::{AllocError, AllocResult};

/// A parked allocation request.
struct Waiter {
    /// Requested payload length.
    len: usize,
    /// Completion channel. A closed receiver means the waiter's future
    /// was dropped before it could be woken.
    tx: oneshot::Sender<SharedSlot>,
}

struct WaiterQueue {
    queue: VecDeque<Waiter>,
    closed: bool,
}

struct Shared {
    ring: RingBuffer,
    waiters: Mutex<WaiterQueue>,
}

impl Shared {
    /// Head retry loop, run after storage returns to the ring.
    fn wake_released(self: &Arc<Self>) {
        loop {
            let woken = {
                let mut waiters = self.waiters.lock();
                match waiters.queue.front() {
                    Some(head) => match self.ring.try_alloc(head.len) {
                        Some(slot) => waiters.queue.pop_front().map(|w| (slot, w)),
                        // the head still does not fit; later waiters stay
                        // parked behind it
                        None => None,
                    },
                    None => None,
                }
            };

            let Some((slot, waiter)) = woken else {
                return;
            };

            trace!(len = waiter.len, "waking parked allocation");
            if let Err(unclaimed) = waiter.tx.send(SharedSlot::wrap(slot, Arc::clone(self))) {
                // the waiter cancelled; recycling its slot re-enters this
                // loop and services the remaining waiters
                drop(unclaimed);
            }
        }
    }
}

/// A ring buffer with suspending allocation.
///
/// Cheap to clone; clones share the ring and the waiter queue. See the
/// [crate docs](crate) for the wakeup policy.
#[derive(Clone)]
pub struct AsyncRing {
    shared: Arc<Shared>,
}

impl AsyncRing {
    /// Creates a ring with the given payload capacity in bytes.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero. Use [`AsyncRing::with_config`] for a
    /// fallible constructor.
    pub fn new(capacity: usize) -> Self {
        Self::wrap_ring(RingBuffer::new(capacity))
    }

    /// Creates a ring from a configuration.
    pub fn with_config(config: RingConfig) -> RingResult<Self> {
        Ok(Self::wrap_ring(RingBuffer::with_config(config)?))
    }

    fn wrap_ring(ring: RingBuffer) -> Self {
        Self {
            shared: Arc::new(Shared {
                ring,
                waiters: Mutex::new(WaiterQueue {
                    queue: VecDeque::new(),
                    closed: false,
                }),
            }),
        }
    }

    /// Returns the payload capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.shared.ring.capacity()
    }

    /// Number of allocation requests currently parked.
    pub fn pending_waiters(&self) -> usize {
        self.shared.waiters.lock().queue.len()
    }

    /// Returns true once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.shared.waiters.lock().closed
    }

    /// Takes a snapshot of the underlying ring's allocation counters.
    pub fn stats(&self) -> RingStatsSnapshot {
        self.shared.ring.stats()
    }

    /// Allocates a slot with `len` payload bytes, waiting for space.
    ///
    /// Completes immediately when the queue is empty and the ring has
    /// room. Otherwise the request parks in FIFO order and resumes once
    /// enough released storage reaches the head of the queue.
    ///
    /// Dropping the returned future cancels the request; a cancelled
    /// waiter is skipped at wake time and its storage goes to the next
    /// one in line.
    ///
    /// # Errors
    ///
    /// - [`AllocError::ZeroLength`] / [`AllocError::TooLarge`] for
    ///   requests the ring could never satisfy — parking them would block
    ///   the queue forever
    /// - [`AllocError::Closed`] if the ring is closed before or while the
    ///   request is parked
    pub async fn alloc(&self, len: usize) -> AllocResult<SharedSlot> {
        if len == 0 {
            return Err(AllocError::ZeroLength);
        }
        let max = self.shared.ring.max_slot_len();
        if len > max {
            return Err(AllocError::TooLarge {
                requested: len,
                max,
            });
        }

        let rx = {
            let mut waiters = self.shared.waiters.lock();
            if waiters.closed {
                return Err(AllocError::Closed);
            }

            // allocate directly only when no one is parked ahead of us
            if waiters.queue.is_empty() {
                if let Some(slot) = self.shared.ring.try_alloc(len) {
                    return Ok(SharedSlot::wrap(slot, Arc::clone(&self.shared)));
                }
            }

            let (tx, rx) = oneshot::channel();
            waiters.queue.push_back(Waiter { len, tx });
            trace!(len, parked = waiters.queue.len(), "parking allocation");
            rx
        };

        rx.await.map_err(|_| AllocError::Closed)
    }

    /// Tries to allocate without waiting.
    ///
    /// Returns `None` while waiters are parked, even if the request would
    /// fit: jumping the queue would break FIFO fairness.
    pub fn try_alloc(&self, len: usize) -> Option<SharedSlot> {
        let waiters = self.shared.waiters.lock();
        if waiters.closed || !waiters.queue.is_empty() {
            return None;
        }
        self.shared
            .ring
            .try_alloc(len)
            .map(|slot| SharedSlot::wrap(slot, Arc::clone(&self.shared)))
    }

    /// Closes the ring: every parked request and every later `alloc`
    /// fails with [`AllocError::Closed`]. Slots already handed out remain
    /// usable and still return their storage on drop.
    pub fn close(&self) {
        let drained: Vec<Waiter> = {
            let mut waiters = self.shared.waiters.lock();
            if waiters.closed {
                return;
            }
            waiters.closed = true;
            waiters.queue.drain(..).collect()
        };

        if !drained.is_empty() {
            debug!(failed = drained.len(), "closed ring with parked waiters");
        }
        // dropping the senders fails the parked requests
    }
}

impl fmt::Debug for AsyncRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncRing")
            .field("capacity", &self.capacity())
            .field("pending_waiters", &self.pending_waiters())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// A slot whose release feeds the waiter queue.
///
/// Wraps a [`Slot`] and exposes the same surface; dropping it first
/// returns the storage to the ring, then runs the wakeup loop so parked
/// requests can claim the space.
pub struct SharedSlot {
    slot: Option<Slot>,
    shared: Arc<Shared>,
}

impl SharedSlot {
    fn wrap(slot: Slot, shared: Arc<Shared>) -> Self {
        Self {
            slot: Some(slot),
            shared,
        }
    }

    /// Returns true while the slot references a live byte range.
    pub fn is_valid(&self) -> bool {
        self.slot.as_ref().is_some_and(Slot::is_valid)
    }

    /// Payload length in bytes; 0 once released.
    pub fn len(&self) -> usize {
        self.slot.as_ref().map_or(0, Slot::len)
    }

    /// Returns true if the slot holds no payload bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The payload bytes. Empty once released.
    pub fn as_slice(&self) -> &[u8] {
        self.slot.as_ref().map_or(&[], Slot::as_slice)
    }

    /// The payload bytes, mutably. Empty once released.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        match &mut self.slot {
            Some(slot) => slot.as_mut_slice(),
            None => &mut [],
        }
    }

    /// Publishes payload writes to other threads.
    pub fn flush(&self) {
        if let Some(slot) = &self.slot {
            slot.flush();
        }
    }

    /// Observes payload writes published by another thread.
    pub fn synchronize(&self) {
        if let Some(slot) = &self.slot {
            slot.synchronize();
        }
    }

    /// Returns the slot's storage to the ring and wakes parked waiters.
    ///
    /// Idempotent; dropping the slot does the same.
    pub fn release(&mut self) {
        if let Some(slot) = self.slot.take() {
            // storage must be back in the ring before the head retry runs
            drop(slot);
            self.shared.wake_released();
        }
    }
}

impl Drop for SharedSlot {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for SharedSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedSlot")
            .field("valid", &self.is_valid())
            .field("len", &self.len())
            .finish()
    }
}
