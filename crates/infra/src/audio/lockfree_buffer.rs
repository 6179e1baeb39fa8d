//! Lock-free ring buffer for real-time audio processing
//!
//! Moves interleaved samples from the input stream callback to the output
//! stream callback. The buffer is split into a producer and a consumer half so
//! each callback owns exactly one side.
//!
//! Performance characteristics:
//! - Lock-free (no mutex contention)
//! - Wait-free for single producer/consumer
//! - Cache-friendly sequential access
//! - No allocations in hot path

use crossbeam::utils::CachePadded;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

struct Shared {
    /// Sample slots holding f32 bit patterns
    slots: Box<[AtomicU32]>,

    /// Total samples ever written (cache-padded to prevent false sharing)
    write_pos: CachePadded<AtomicUsize>,

    /// Total samples ever read (cache-padded to prevent false sharing)
    read_pos: CachePadded<AtomicUsize>,

    /// Mask for fast modulo operation (capacity - 1)
    mask: usize,
}

impl Shared {
    fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    fn len(&self) -> usize {
        let write_pos = self.write_pos.load(Ordering::Acquire);
        let read_pos = self.read_pos.load(Ordering::Acquire);
        write_pos.wrapping_sub(read_pos)
    }
}

/// Create a single-producer single-consumer ring of f32 samples.
///
/// Capacity will be rounded up to the next power of 2.
pub fn sample_ring(capacity: usize) -> (RingProducer, RingConsumer) {
    let capacity = capacity.max(2).next_power_of_two();
    let shared = Arc::new(Shared {
        slots: (0..capacity).map(|_| AtomicU32::new(0)).collect(),
        write_pos: CachePadded::new(AtomicUsize::new(0)),
        read_pos: CachePadded::new(AtomicUsize::new(0)),
        mask: capacity - 1,
    });

    (
        RingProducer {
            shared: Arc::clone(&shared),
        },
        RingConsumer { shared },
    )
}

/// Writing half of a [`sample_ring`]
pub struct RingProducer {
    shared: Arc<Shared>,
}

impl RingProducer {
    /// Write samples to the buffer
    ///
    /// Returns the number of samples actually written.
    pub fn write(&mut self, samples: &[f32]) -> usize {
        self.write_from_iter(samples.iter().copied())
    }

    /// Write samples from an iterator until it ends or the buffer is full
    pub fn write_from_iter<I>(&mut self, samples: I) -> usize
    where
        I: Iterator<Item = f32>,
    {
        let shared = &*self.shared;
        let write_pos = shared.write_pos.load(Ordering::Relaxed);
        let read_pos = shared.read_pos.load(Ordering::Acquire);
        let available = shared.capacity() - write_pos.wrapping_sub(read_pos);

        let mut written = 0;
        for sample in samples.take(available) {
            let slot = &shared.slots[write_pos.wrapping_add(written) & shared.mask];
            slot.store(sample.to_bits(), Ordering::Relaxed);
            written += 1;
        }

        // Release makes the slot stores visible before the new position
        shared
            .write_pos
            .store(write_pos.wrapping_add(written), Ordering::Release);
        written
    }

    /// Free space in samples
    pub fn available_write(&self) -> usize {
        self.shared.capacity() - self.shared.len()
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity()
    }
}

/// Reading half of a [`sample_ring`]
pub struct RingConsumer {
    shared: Arc<Shared>,
}

impl RingConsumer {
    /// Read samples from the buffer
    ///
    /// Returns the number of samples actually read.
    pub fn read(&mut self, buffer: &mut [f32]) -> usize {
        let shared = &*self.shared;
        let read_pos = shared.read_pos.load(Ordering::Relaxed);
        let write_pos = shared.write_pos.load(Ordering::Acquire);
        let to_read = buffer.len().min(write_pos.wrapping_sub(read_pos));

        for (i, out) in buffer[..to_read].iter_mut().enumerate() {
            let slot = &shared.slots[read_pos.wrapping_add(i) & shared.mask];
            *out = f32::from_bits(slot.load(Ordering::Relaxed));
        }

        shared
            .read_pos
            .store(read_pos.wrapping_add(to_read), Ordering::Release);
        to_read
    }

    /// Drop up to `count` samples without copying them
    pub fn skip(&mut self, count: usize) -> usize {
        let shared = &*self.shared;
        let read_pos = shared.read_pos.load(Ordering::Relaxed);
        let write_pos = shared.write_pos.load(Ordering::Acquire);
        let skipped = count.min(write_pos.wrapping_sub(read_pos));
        shared
            .read_pos
            .store(read_pos.wrapping_add(skipped), Ordering::Release);
        skipped
    }

    /// Get available read samples
    pub fn available_read(&self) -> usize {
        self.shared.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity()
    }
}
