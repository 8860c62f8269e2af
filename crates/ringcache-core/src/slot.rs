//! The slot handle.
//!
//! A [`Slot`] owns a sub-range of the ring's backing region for its
//! lifetime. Dropping it (or calling [`release`](Slot::release)) returns
//! the storage to the ring exactly once.

use std::fmt;
use std::ptr::NonNull;
use std::slice;
use std::sync::Arc;

use crate::header::HEADER_LEN;
use crate::ring::RingInner;

/// Exclusive handle to an allocated byte range in a ring.
///
/// Move-only: there is no way to clone a slot, so the byte range has one
/// owner at all times. After [`release`](Slot::release) the handle is
/// inert; `is_valid` reports `false`, byte access yields an empty slice,
/// and dropping it does nothing further.
///
/// # Cross-thread publishing
///
/// The payload is raw memory, so handing its contents to another thread
/// needs the explicit pairing: the writer calls [`flush`](Slot::flush)
/// after its writes, the reader calls [`synchronize`](Slot::synchronize)
/// before its reads.
pub struct Slot {
    ring: Arc<RingInner>,
    /// Header start; `None` once released.
    start: Option<NonNull<u8>>,
    /// Payload length, excluding the header.
    len: usize,
}

// SAFETY: the slot exclusively owns its byte range, the Arc keeps the
// region alive, and shared access is limited to reads and the ring's
// atomics.
unsafe impl Send for Slot {}
unsafe impl Sync for Slot {}

impl Slot {
    pub(crate) fn new(ring: Arc<RingInner>, start: *mut u8, len: usize) -> Self {
        Self {
            ring,
            start: NonNull::new(start),
            len,
        }
    }

    /// Returns true while the slot references a live byte range.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.start.is_some()
    }

    /// Payload length in bytes; 0 once released.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the slot holds no payload bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The payload bytes. Empty once released.
    pub fn as_slice(&self) -> &[u8] {
        match self.start {
            // SAFETY: the span [start + HEADER_LEN, start + HEADER_LEN + len)
            // is inside the region and owned by this slot
            Some(at) => unsafe { slice::from_raw_parts(at.as_ptr().add(HEADER_LEN), self.len) },
            None => &[],
        }
    }

    /// The payload bytes, mutably. Empty once released.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        match self.start {
            // SAFETY: as above, plus &mut self gives exclusive access
            Some(at) => unsafe {
                slice::from_raw_parts_mut(at.as_ptr().add(HEADER_LEN), self.len)
            },
            None => &mut [],
        }
    }

    /// Publishes payload writes to other threads.
    ///
    /// Call after writing bytes a consumer on another thread should see;
    /// the consumer pairs it with [`synchronize`](Slot::synchronize).
    pub fn flush(&self) {
        self.ring.publish();
    }

    /// Observes payload writes published by another thread.
    pub fn synchronize(&self) {
        self.ring.observe();
    }

    /// Returns the slot's storage to the ring and invalidates the handle.
    ///
    /// Idempotent; dropping the slot does the same.
    pub fn release(&mut self) {
        if let Some(at) = self.start.take() {
            self.ring.release(at, self.len);
            self.len = 0;
        }
    }
}

impl Drop for Slot {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("valid", &self.is_valid())
            .field("len", &self.len)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ring::RingBuffer;

    #[test]
    fn test_release_is_idempotent() {
        let ring = RingBuffer::new(64);

        let mut slot = ring.try_alloc(16).unwrap();
        slot.release();
        assert!(!slot.is_valid());
        assert_eq!(slot.len(), 0);
        assert!(slot.as_slice().is_empty());

        // a second release and the drop are both no-ops
        slot.release();
        drop(slot);
        assert_eq!(ring.stats().releases(), 1);
    }

    #[test]
    fn test_write_then_read_back() {
        let ring = RingBuffer::new(64);

        let mut slot = ring.try_alloc(32).unwrap();
        for (i, byte) in slot.as_mut_slice().iter_mut().enumerate() {
            *byte = i as u8;
        }

        let read: Vec<u8> = slot.as_slice().to_vec();
        assert_eq!(read, (0..32).map(|i| i as u8).collect::<Vec<_>>());
    }

    #[test]
    fn test_publish_across_threads() {
        let ring = RingBuffer::new(64);

        let mut slot = ring.try_alloc(16).unwrap();
        slot.as_mut_slice().fill(0x5A);
        slot.flush();

        let handle = std::thread::spawn(move || {
            slot.synchronize();
            assert!(slot.as_slice().iter().all(|&b| b == 0x5A));
            slot
        });

        drop(handle.join().unwrap());
        assert!(ring.try_alloc(64).is_some());
    }

    #[test]
    fn test_debug_format() {
        let ring = RingBuffer::new(64);
        let slot = ring.try_alloc(8).unwrap();
        let rendered = format!("{:?}", slot);
        assert!(rendered.contains("valid: true"));
    }
}
