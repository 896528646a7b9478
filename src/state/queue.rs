use std::mem;

use parking_lot::Mutex;
use thiserror::Error;

use crate::state::buttons::ButtonEvent;

/// Error returned when the edge handler outpaces the main loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("event queue full ({capacity} pending events)")]
pub struct QueueFull {
    /// Capacity of the queue that rejected the event.
    pub capacity: usize,
}

/// Bounded FIFO between the edge handler (producer) and the main loop (consumer).
///
/// The buffer is pre-allocated so that [`EventQueue::enqueue`] never allocates;
/// [`EventQueue::drain_all`] swaps in a fresh buffer under the lock.
pub struct EventQueue {
    pending: Mutex<Vec<ButtonEvent>>,
    capacity: usize,
}

impl EventQueue {
    /// Create an empty queue holding at most `capacity` events.
    pub fn new(capacity: usize) -> Self {
        Self {
            pending: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
        }
    }

    /// Append an event, refusing it once the queue is full.
    pub fn enqueue(&self, event: ButtonEvent) -> Result<(), QueueFull> {
        let mut pending = self.pending.lock();
        if pending.len() >= self.capacity {
            return Err(QueueFull {
                capacity: self.capacity,
            });
        }
        pending.push(event);
        Ok(())
    }

    /// Whether another event fits.
    pub fn has_room(&self) -> bool {
        self.pending.lock().len() < self.capacity
    }

    /// Take every pending event in arrival order, leaving the queue empty.
    pub fn drain_all(&self) -> Vec<ButtonEvent> {
        let fresh = Vec::with_capacity(self.capacity);
        mem::replace(&mut *self.pending.lock(), fresh)
    }

    /// Number of undrained events.
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Whether no event is waiting.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
