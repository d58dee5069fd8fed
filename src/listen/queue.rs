//! Bounded SPSC queue between a device worker and its consumer
//!
//! Architecture:
//! - Producer (device worker): never blocks inside the queue; when the queue
//!   is full the push hands the record back so the worker can wait and retry
//!   without losing or reordering events
//! - Consumer (caller thread): drains records in order
//!
//! The design uses the `rtrb` crate for the core ring buffer implementation.

use crate::event::EventRecord;
use rtrb::{Consumer, Producer, RingBuffer};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Default queue capacity (must be power of 2)
pub const DEFAULT_CAPACITY: usize = 1024;

/// Queue statistics for monitoring
#[derive(Debug, Default)]
pub struct QueueStats {
    /// Total records pushed
    pub events_pushed: AtomicU64,
    /// Pushes refused because the queue was full
    pub full_rejections: AtomicU64,
    /// Records handed to the consumer
    pub events_consumed: AtomicU64,
    /// Peak queue occupancy
    pub peak_occupancy: AtomicU64,
}

/// Bounded event queue, split once into its two halves
pub struct EventQueue {
    producer: Producer<EventRecord>,
    consumer: Consumer<EventRecord>,
    stats: Arc<QueueStats>,
    capacity: usize,
}

impl EventQueue {
    /// Create a new queue with default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a new queue with specified capacity
    ///
    /// # Panics
    /// Panics if capacity is not a power of 2
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(
            capacity.is_power_of_two(),
            "Queue capacity must be a power of 2"
        );

        let (producer, consumer) = RingBuffer::new(capacity);

        Self {
            producer,
            consumer,
            stats: Arc::new(QueueStats::default()),
            capacity,
        }
    }

    /// Split into the producer (device worker) and consumer halves
    pub fn split(self) -> (EventProducer, EventConsumer) {
        (
            EventProducer {
                inner: self.producer,
                stats: Arc::clone(&self.stats),
                capacity: self.capacity,
            },
            EventConsumer {
                inner: self.consumer,
                stats: self.stats,
            },
        )
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get statistics
    pub fn stats(&self) -> Arc<QueueStats> {
        Arc::clone(&self.stats)
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Producer half (device worker thread)
pub struct EventProducer {
    inner: Producer<EventRecord>,
    stats: Arc<QueueStats>,
    capacity: usize,
}

impl EventProducer {
    /// Push a record, handing it back if the queue is full
    #[inline]
    pub fn push(&mut self, event: EventRecord) -> Result<(), EventRecord> {
        match self.inner.push(event) {
            Ok(()) => {
                self.stats.events_pushed.fetch_add(1, Ordering::Relaxed);

                let occupied = (self.capacity - self.inner.slots()) as u64;
                self.stats
                    .peak_occupancy
                    .fetch_max(occupied, Ordering::Relaxed);
                Ok(())
            }
            Err(rtrb::PushError::Full(event)) => {
                self.stats.full_rejections.fetch_add(1, Ordering::Relaxed);
                Err(event)
            }
        }
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.inner.is_full()
    }

    /// Whether the consumer half has been dropped
    #[inline]
    pub fn is_abandoned(&self) -> bool {
        self.inner.is_abandoned()
    }
}

/// Consumer half (caller thread)
pub struct EventConsumer {
    inner: Consumer<EventRecord>,
    stats: Arc<QueueStats>,
}

impl EventConsumer {
    /// Pop the oldest record
    #[inline]
    pub fn pop(&mut self) -> Option<EventRecord> {
        match self.inner.pop() {
            Ok(event) => {
                self.stats.events_consumed.fetch_add(1, Ordering::Relaxed);
                Some(event)
            }
            Err(_) => None,
        }
    }

    /// Look at the oldest record without removing it
    #[inline]
    pub fn peek(&self) -> Option<&EventRecord> {
        self.inner.peek().ok()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Number of queued records
    #[inline]
    pub fn available(&self) -> usize {
        self.inner.slots()
    }

    /// Pop up to `max_count` records at once
    pub fn pop_batch(&mut self, max_count: usize) -> Vec<EventRecord> {
        let mut batch = Vec::with_capacity(max_count.min(self.available()));
        for _ in 0..max_count {
            match self.pop() {
                Some(event) => batch.push(event),
                None => break,
            }
        }
        batch
    }

    pub fn stats(&self) -> Arc<QueueStats> {
        Arc::clone(&self.stats)
    }
}
