//! The ring allocator.
//!
//! A single preallocated region of `capacity + HEADER_LEN` bytes, wrapped
//! by two advancing cursors:
//!
//! - `write` — the next byte available to hand out
//! - `free` — the oldest byte not yet reclaimed
//!
//! The occupied range runs from `free` to `write`, wrapping at the region
//! end. Equal cursors mean the ring is empty; the next allocation rewinds
//! both to the region start. While the ring is non-empty the cursors are
//! kept strictly apart, so equality stays unambiguous.
//!
//! Allocation is single-producer and lock-free. Release is lock-free and
//! may happen from any thread: the oldest slot advances `free` with a
//! single CAS, any other slot flags itself released in its header and the
//! next allocation's sweep reclaims it. Header visibility across threads
//! rides on one atomic publish flag: writers publish with a release store,
//! the sweep observes with an acquire load before reading headers.

use std::fmt;
use std::ptr::{self, NonNull};
use std::sync::atomic::{fence, AtomicBool, AtomicPtr, Ordering};
use std::sync::Arc;

use tracing::trace;

use crate::config::RingConfig;
use crate::error::RingResult;
use crate::header::{SlotHeader, FLAG_OFFSET, HEADER_LEN, RELEASED};
use crate::region::{CacheAligned, Region};
use crate::slot::Slot;
use crate::stats::{RingStats, RingStatsSnapshot};

/// A fixed-capacity ring allocator for variable-sized byte slots.
///
/// Cheap to clone; clones and outstanding slots share the same backing
/// region, which lives until the last of them drops. See the
/// [crate docs](crate) for the thread model and an example.
#[derive(Clone)]
pub struct RingBuffer {
    inner: Arc<RingInner>,
}

impl RingBuffer {
    /// Creates a ring with the given payload capacity in bytes.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero. Use [`RingBuffer::with_config`] for a
    /// fallible constructor.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be greater than 0");
        Self::build(RingConfig::with_capacity(capacity))
    }

    /// Creates a ring from a configuration.
    pub fn with_config(config: RingConfig) -> RingResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: RingConfig) -> Self {
        let region = Region::new(config.region_len());
        let start = region.start();

        Self {
            inner: Arc::new(RingInner {
                region,
                config,
                stats: RingStats::new(),
                publish_flag: CacheAligned(AtomicBool::new(false)),
                write: CacheAligned(AtomicPtr::new(start)),
                free: CacheAligned(AtomicPtr::new(start)),
            }),
        }
    }

    /// Returns the payload capacity in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.inner.config.capacity
    }

    /// Largest payload a single slot can carry.
    #[inline]
    pub fn max_slot_len(&self) -> usize {
        self.inner.config.max_slot_len()
    }

    /// Offset of the write cursor from the region start. Diagnostic.
    pub fn write_offset(&self) -> usize {
        self.inner.write.load(Ordering::Relaxed) as usize - self.inner.region.start() as usize
    }

    /// Offset of the free cursor from the region start. Diagnostic.
    pub fn free_offset(&self) -> usize {
        self.inner.free.load(Ordering::Relaxed) as usize - self.inner.region.start() as usize
    }

    /// Takes a snapshot of the allocation counters.
    pub fn stats(&self) -> RingStatsSnapshot {
        self.inner.stats.snapshot()
    }

    /// Tries to allocate a slot with `len` payload bytes.
    ///
    /// Returns `None` when no contiguous span fits right now, or when
    /// `len` is zero or exceeds [`max_slot_len`](Self::max_slot_len).
    /// Failure is expected, not exceptional; the caller may retry once
    /// slots have been released. Never blocks, never allocates.
    ///
    /// The payload bytes of a fresh slot are unspecified.
    ///
    /// Single-producer: at most one thread may allocate at a time.
    pub fn try_alloc(&self, len: usize) -> Option<Slot> {
        if len == 0 || len > self.max_slot_len() {
            if self.inner.config.enable_stats {
                self.inner.stats.record_alloc_failure();
            }
            return None;
        }

        match self.inner.reserve(len) {
            Some(at) => {
                if self.inner.config.enable_stats {
                    self.inner.stats.record_alloc();
                }
                Some(Slot::new(Arc::clone(&self.inner), at, len))
            }
            None => {
                trace!(requested = len, "no contiguous span available");
                if self.inner.config.enable_stats {
                    self.inner.stats.record_alloc_failure();
                }
                None
            }
        }
    }
}

impl fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity())
            .field("write_offset", &self.write_offset())
            .field("free_offset", &self.free_offset())
            .finish()
    }
}

/// State shared between ring handles and their outstanding slots.
pub(crate) struct RingInner {
    region: Region,
    config: RingConfig,
    stats: RingStats,

    /// Ordering token for header and payload visibility. The stored value
    /// carries no meaning; the release store / acquire load pair does.
    publish_flag: CacheAligned<AtomicBool>,

    /// Next byte to hand out. Mutated only by the producer.
    write: CacheAligned<AtomicPtr<u8>>,

    /// Oldest byte not yet reclaimed. Advanced by the producer's sweep and
    /// by the release fast-path CAS.
    free: CacheAligned<AtomicPtr<u8>>,
}

impl RingInner {
    /// Finds a span for `len + HEADER_LEN` bytes, stamps its header, and
    /// advances the write cursor past it.
    fn reserve(&self, len: usize) -> Option<*mut u8> {
        let required = len + HEADER_LEN;
        debug_assert!(required <= self.region.len());

        self.sweep();

        let start = self.region.start();
        let end = self.region.end();
        let wp = self.write.load(Ordering::Relaxed);
        let fp = self.free.load(Ordering::Relaxed);

        if wp == fp {
            // empty: rewind both cursors and place the slot at the start
            self.free.store(start, Ordering::Relaxed);
            // SAFETY: required <= region_len, so the span fits at start
            unsafe {
                self.stamp_header(start, len as u16);
                self.write.store(start.add(required), Ordering::Relaxed);
            }
            return Some(start);
        }

        if (wp as usize) < (fp as usize) {
            // one gap, between the cursors; the strict inequality keeps
            // them apart so equality still means empty
            let gap = fp as usize - wp as usize;
            if required < gap {
                // SAFETY: wp + required < fp stays inside the region
                unsafe {
                    self.stamp_header(wp, len as u16);
                    self.write.store(wp.add(required), Ordering::Relaxed);
                }
                return Some(wp);
            }
            return None;
        }

        // fp < wp: try the tail of the region first
        let tail_gap = end as usize - wp as usize;
        if required <= tail_gap {
            // the cursors cannot collide through this branch, so the
            // span may run right up to the region end
            // SAFETY: wp + required <= end
            unsafe {
                self.stamp_header(wp, len as u16);
                self.write.store(wp.add(required), Ordering::Relaxed);
            }
            return Some(wp);
        }

        // wrap: zero the abandoned tail so the sweep sees "no slot here",
        // then place the slot at the region start
        let head_gap = fp as usize - start as usize;
        if required < head_gap {
            trace!(abandoned = tail_gap, "wrapping to region start");
            // SAFETY: [wp, end) and [start, start + required) are unowned
            unsafe {
                ptr::write_bytes(wp, 0, tail_gap);
                self.stamp_header(start, len as u16);
                self.write.store(start.add(required), Ordering::Relaxed);
            }
            return Some(start);
        }

        None
    }

    /// Advances `free` past every contiguously released slot, stopping at
    /// the first still-held slot or at `write`.
    ///
    /// Runs on the producer thread only. Cursor stores are relaxed; the
    /// acquire at entry pairs with the releasers' publish and makes their
    /// header flags visible. A cursor is only ever stored when it actually
    /// moves: a same-value store at the head slot could race with that
    /// slot's release CAS and rewind `free`.
    fn sweep(&self) {
        self.observe();

        let start = self.region.start();
        let end = self.region.end();
        let wp = self.write.load(Ordering::Relaxed);
        let fp = self.free.load(Ordering::Relaxed);

        if (wp as usize) < (fp as usize) {
            // occupied range wraps: sweep the tail side first
            let mut i = fp;
            while (i as usize) < end as usize - HEADER_LEN {
                // SAFETY: i stays header-aligned within the region
                let header = unsafe { self.header_at(i) };
                if header.length == 0 {
                    // no more slots tail-side
                    break;
                }
                if header.is_released() {
                    // SAFETY: slot spans stay inside the region
                    i = unsafe { i.add(header.length as usize + HEADER_LEN) };
                } else {
                    if i != fp {
                        self.free.store(i, Ordering::Relaxed);
                    }
                    return;
                }
            }

            // then the front, from the region start up to `write`
            let mut i = start;
            while (i as usize) < wp as usize {
                // SAFETY: as above
                let header = unsafe { self.header_at(i) };
                if header.length > 0 && header.is_released() {
                    // SAFETY: as above
                    i = unsafe { i.add(header.length as usize + HEADER_LEN) };
                } else {
                    if i != fp {
                        self.free.store(i, Ordering::Relaxed);
                    }
                    return;
                }
            }
        } else {
            let mut i = fp;
            while (i as usize) < wp as usize {
                // SAFETY: as above
                let header = unsafe { self.header_at(i) };
                if header.is_released() {
                    // SAFETY: as above
                    i = unsafe { i.add(header.length as usize + HEADER_LEN) };
                } else {
                    if i != fp {
                        self.free.store(i, Ordering::Relaxed);
                    }
                    return;
                }
            }
        }

        // every slot between the cursors was released: the ring is empty.
        // Rewinding is race-free here because each swept slot's holder has
        // already finished its release.
        if fp != start || wp != start {
            trace!("ring drained, rewinding cursors");
            self.free.store(start, Ordering::Relaxed);
            self.write.store(start, Ordering::Relaxed);
            if self.config.enable_stats {
                self.stats.record_reset();
            }
        }
    }

    /// Returns a slot's storage to the ring.
    ///
    /// Fast path: if this is the oldest slot, advance `free` past it in
    /// place. Otherwise flag the slot released in its header and publish;
    /// the next sweep reclaims it.
    pub(crate) fn release(&self, at: NonNull<u8>, len: usize) {
        // SAFETY: the slot's span lies inside the region
        let next = unsafe { at.as_ptr().add(len + HEADER_LEN) };
        if self
            .free
            .compare_exchange(at.as_ptr(), next, Ordering::Release, Ordering::Relaxed)
            .is_ok()
        {
            if self.config.enable_stats {
                self.stats.record_fast_release();
            }
            return;
        }

        // Not the oldest slot. The flag bytes are exclusively ours until
        // this write lands, so a plain store suffices; the publish makes it
        // visible to the sweep.
        let flag = RELEASED.to_le_bytes();
        // SAFETY: we own the header bytes at `at`
        unsafe {
            ptr::copy_nonoverlapping(flag.as_ptr(), at.as_ptr().add(FLAG_OFFSET), flag.len());
        }
        self.publish();
        if self.config.enable_stats {
            self.stats.record_deferred_release();
        }
    }

    /// Release-publishes prior writes to the region.
    pub(crate) fn publish(&self) {
        fence(Ordering::Release);
        self.publish_flag.store(true, Ordering::Release);
    }

    /// Acquire-observes writes published by other threads.
    pub(crate) fn observe(&self) {
        let _ = self.publish_flag.load(Ordering::Acquire);
        fence(Ordering::Acquire);
    }

    /// Writes a held-slot header at `at` and publishes it.
    ///
    /// # Safety
    ///
    /// `at` must point at `HEADER_LEN` unowned bytes inside the region.
    unsafe fn stamp_header(&self, at: *mut u8, len: u16) {
        let bytes = SlotHeader::new(len).to_bytes();
        ptr::copy_nonoverlapping(bytes.as_ptr(), at, HEADER_LEN);
        self.publish();
    }

    /// Reads the header at `at`.
    ///
    /// # Safety
    ///
    /// `at` must point at least `HEADER_LEN` bytes before the region end.
    unsafe fn header_at(&self, at: *const u8) -> SlotHeader {
        let mut bytes = [0u8; HEADER_LEN];
        ptr::copy_nonoverlapping(at, bytes.as_mut_ptr(), HEADER_LEN);
        SlotHeader::from_bytes(&bytes)
    }
}
