// src/buffer/ring_buffer.rs
//! Lock-free ring of quantized output samples
//!
//! One producer and one consumer share a fixed array of DAC codes. The
//! producer is the only writer of the write cursor and the consumer the only
//! writer of the read cursor, so neither side ever takes a lock. One slot is
//! always left empty: `write == read` means empty, `write + 1 == read` means
//! full.
//!
//! Cursors are kept in `[0, capacity)` and the capacity is a power of two,
//! so occupancy is `(write + capacity - read) & mask` and never depends on
//! unsigned wraparound of the cursor values themselves.

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::hal::types::DacSample;

/// Ring buffer error types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingBufferError {
    Full,
    InvalidCapacity(usize),
}

impl std::fmt::Display for RingBufferError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RingBufferError::Full => write!(f, "Sample ring is full"),
            RingBufferError::InvalidCapacity(cap) => {
                write!(f, "Invalid ring capacity {} (must be a power of 2, at least 2)", cap)
            }
        }
    }
}

impl std::error::Error for RingBufferError {}

/// Shared storage and cursors of the sample ring
pub struct SampleRing {
    slots: Box<[AtomicU8]>,
    capacity: usize,
    mask: usize,
    write: AtomicUsize,
    read: AtomicUsize,
}

impl SampleRing {
    /// Create new ring with power-of-2 capacity
    pub fn new(capacity: usize) -> Result<Self, RingBufferError> {
        if capacity < 2 || !capacity.is_power_of_two() {
            return Err(RingBufferError::InvalidCapacity(capacity));
        }

        let slots = (0..capacity)
            .map(|_| AtomicU8::new(crate::hal::types::DAC_MID_SCALE))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Ok(Self {
            slots,
            capacity,
            mask: capacity - 1,
            write: AtomicUsize::new(0),
            read: AtomicUsize::new(0),
        })
    }

    /// Allocate a ring and hand out its two halves.
    ///
    /// The halves are not `Clone`, so at most one producer and one consumer
    /// exist for a given ring.
    pub fn split(capacity: usize) -> Result<(RingProducer, RingConsumer), RingBufferError> {
        let ring = Arc::new(Self::new(capacity)?);
        Ok((
            RingProducer { ring: Arc::clone(&ring) },
            RingConsumer { ring },
        ))
    }

    /// Number of samples waiting to be consumed
    pub fn occupancy(&self) -> usize {
        let write = self.write.load(Ordering::Acquire);
        let read = self.read.load(Ordering::Acquire);
        Self::distance(write, read, self.capacity, self.mask)
    }

    /// Slots the producer may still fill: `capacity - occupancy - 1`
    pub fn free_space(&self) -> usize {
        self.capacity - self.occupancy() - 1
    }

    /// Get buffer capacity, including the reserved empty slot
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Largest occupancy the ring can reach
    pub fn usable_capacity(&self) -> usize {
        self.capacity - 1
    }

    /// Get current buffer utilization (0.0 to 1.0)
    pub fn utilization(&self) -> f32 {
        self.occupancy() as f32 / self.usable_capacity() as f32
    }

    pub fn is_empty(&self) -> bool {
        self.occupancy() == 0
    }

    pub fn is_full(&self) -> bool {
        self.occupancy() == self.usable_capacity()
    }

    /// Current `(write, read)` cursor pair, for diagnostics
    pub fn cursors(&self) -> (usize, usize) {
        (
            self.write.load(Ordering::Acquire),
            self.read.load(Ordering::Acquire),
        )
    }

    /// Rewind both cursors to zero.
    ///
    /// Only valid while neither half is in use: the engine calls this with the
    /// output timer disabled and the generator lock held.
    pub(crate) fn reset(&self) {
        self.read.store(0, Ordering::Release);
        self.write.store(0, Ordering::Release);
    }

    #[inline]
    fn distance(write: usize, read: usize, capacity: usize, mask: usize) -> usize {
        (write + capacity - read) & mask
    }
}

impl std::fmt::Debug for SampleRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (write, read) = self.cursors();
        f.debug_struct("SampleRing")
            .field("capacity", &self.capacity)
            .field("write", &write)
            .field("read", &read)
            .finish()
    }
}

/// Write half of the ring, owned by the producer task
#[derive(Debug)]
pub struct RingProducer {
    ring: Arc<SampleRing>,
}

impl RingProducer {
    /// Append one sample. Rejected when the ring is full; callers are
    /// expected to check [`free_space`](Self::free_space) first.
    pub fn push(&mut self, sample: DacSample) -> Result<(), RingBufferError> {
        let ring = &*self.ring;
        let write = ring.write.load(Ordering::Relaxed);
        let next = (write + 1) & ring.mask;

        if next == ring.read.load(Ordering::Acquire) {
            return Err(RingBufferError::Full);
        }

        ring.slots[write].store(sample, Ordering::Relaxed);
        ring.write.store(next, Ordering::Release);
        Ok(())
    }

    /// Append as many samples from `samples` as fit, returning how many were taken
    pub fn push_slice(&mut self, samples: &[DacSample]) -> usize {
        let ring = &*self.ring;
        let mut write = ring.write.load(Ordering::Relaxed);
        let read = ring.read.load(Ordering::Acquire);
        let free = ring.capacity - SampleRing::distance(write, read, ring.capacity, ring.mask) - 1;
        let count = free.min(samples.len());

        for &sample in &samples[..count] {
            ring.slots[write].store(sample, Ordering::Relaxed);
            write = (write + 1) & ring.mask;
        }

        ring.write.store(write, Ordering::Release);
        count
    }

    pub fn free_space(&self) -> usize {
        self.ring.free_space()
    }

    /// Shared view of the ring for diagnostics
    pub fn ring(&self) -> &Arc<SampleRing> {
        &self.ring
    }
}

/// Read half of the ring, owned by the output interrupt
#[derive(Debug)]
pub struct RingConsumer {
    ring: Arc<SampleRing>,
}

impl RingConsumer {
    /// Take the oldest sample, or `None` when `read == write`
    #[inline]
    pub fn pop(&mut self) -> Option<DacSample> {
        let ring = &*self.ring;
        let read = ring.read.load(Ordering::Relaxed);

        if read == ring.write.load(Ordering::Acquire) {
            return None;
        }

        let sample = ring.slots[read].load(Ordering::Relaxed);
        ring.read.store((read + 1) & ring.mask, Ordering::Release);
        Some(sample)
    }

    pub fn occupancy(&self) -> usize {
        self.ring.occupancy()
    }

    pub fn ring(&self) -> &Arc<SampleRing> {
        &self.ring
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spsc_basic_operations() {
        let (mut tx, mut rx) = SampleRing::split(8).unwrap();

        assert!(tx.push(42).is_ok());
        assert!(tx.push(43).is_ok());

        assert_eq!(rx.pop(), Some(42));
        assert_eq!(rx.pop(), Some(43));
        assert_eq!(rx.pop(), None);
    }

    #[test]
    fn test_one_slot_stays_empty() {
        let (mut tx, _rx) = SampleRing::split(4).unwrap();

        for i in 0..3 {
            assert!(tx.push(i).is_ok());
        }

        assert_eq!(tx.push(99), Err(RingBufferError::Full));
        assert!(tx.ring().is_full());
        assert_eq!(tx.free_space(), 0);
    }

    #[test]
    fn test_push_slice_stops_at_capacity() {
        let (mut tx, mut rx) = SampleRing::split(8).unwrap();
        let block = [7u8; 10];

        assert_eq!(tx.push_slice(&block), 7);
        assert_eq!(tx.push_slice(&block), 0);

        rx.pop();
        rx.pop();
        assert_eq!(tx.push_slice(&block), 2);
    }

    #[test]
    fn test_occupancy_across_every_cursor_pair() {
        // Walk the ring through every (write, read) combination reachable by
        // legal operations and check the free-space identity at each step.
        for capacity in [2usize, 4, 8, 16] {
            let (mut tx, mut rx) = SampleRing::split(capacity).unwrap();
            for _ in 0..capacity {
                for fill in 0..capacity {
                    for _ in 0..fill {
                        tx.push(1).unwrap();
                    }
                    let ring = tx.ring();
                    assert_eq!(ring.occupancy(), fill);
                    assert_eq!(ring.free_space(), capacity - fill - 1);
                    assert!(ring.occupancy() <= capacity - 1);
                    assert_eq!(ring.is_empty(), fill == 0);
                    assert_eq!(ring.is_full(), fill == capacity - 1);
                    while rx.pop().is_some() {}
                }
                // advance both cursors by one so the next round starts elsewhere
                tx.push(0).unwrap();
                rx.pop();
                let (w, r) = tx.ring().cursors();
                assert_eq!(w, r);
                assert!(w < capacity);
            }
        }
    }

    #[test]
    fn test_reset_rewinds_cursors() {
        let (mut tx, rx) = SampleRing::split(8).unwrap();
        tx.push(1).unwrap();
        tx.push(2).unwrap();

        rx.ring().reset();
        assert_eq!(rx.ring().cursors(), (0, 0));
        assert!(rx.ring().is_empty());
    }

    #[test]
    fn test_concurrent_spsc_preserves_order() {
        use std::thread;

        let (mut tx, mut rx) = SampleRing::split(64).unwrap();
        let total = 20_000usize;

        let producer = thread::spawn(move || {
            for i in 0..total {
                while tx.push((i % 251) as u8).is_err() {
                    thread::yield_now();
                }
            }
        });

        let mut received = 0usize;
        while received < total {
            if let Some(sample) = rx.pop() {
                assert_eq!(sample, (received % 251) as u8);
                received += 1;
            } else {
                thread::yield_now();
            }
        }

        producer.join().unwrap();
        assert!(rx.ring().is_empty());
    }

    #[test]
    fn test_invalid_capacity() {
        assert!(SampleRing::new(0).is_err());
        assert!(SampleRing::new(1).is_err());
        assert_eq!(SampleRing::new(3).unwrap_err(), RingBufferError::InvalidCapacity(3));
        assert!(SampleRing::new(8).is_ok());
    }
}
