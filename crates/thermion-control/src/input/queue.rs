// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use thermion_core::InputEvent;

/// Thread-safe FIFO overflow buffer with a fixed capacity.
///
/// When full, enqueuing evicts the oldest entry and bumps the drop counter.
#[derive(Debug)]
pub struct BoundedInputQueue {
    items: Mutex<VecDeque<InputEvent>>,
    capacity: usize,
    dropped: AtomicU64,
}

impl BoundedInputQueue {
    /// Creates an empty queue holding at most `capacity` events (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            dropped: AtomicU64::new(0),
        }
    }

    /// Appends `event`, returning the evicted oldest event on overflow.
    pub fn enqueue(&self, event: InputEvent) -> Option<InputEvent> {
        let mut items = self.lock();
        let evicted = if items.len() >= self.capacity {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            items.pop_front()
        } else {
            None
        };
        items.push_back(event);
        if let Some(old) = &evicted {
            log::debug!(
                "BoundedInputQueue: full ({}), dropped action {}",
                self.capacity,
                old.action_id
            );
        }
        evicted
    }

    /// Removes and returns up to `max` events, oldest first.
    pub fn drain(&self, max: usize) -> Vec<InputEvent> {
        let mut items = self.lock();
        let count = max.min(items.len());
        items.drain(..count).collect()
    }

    /// Events currently buffered.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` when nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Maximum number of buffered events.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Events evicted by overflow since creation.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Discards every buffered event without counting them as dropped.
    pub fn clear(&self) {
        self.lock().clear();
    }

    // A panic while holding the lock cannot leave the deque half-updated.
    fn lock(&self) -> MutexGuard<'_, VecDeque<InputEvent>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn ids(events: &[InputEvent]) -> Vec<u32> {
        events.iter().map(|e| e.action_id).collect()
    }

    #[test]
    fn test_fifo_drain() {
        let queue = BoundedInputQueue::new(8);
        for id in 0..5 {
            assert!(queue.enqueue(InputEvent::new(id)).is_none());
        }
        assert_eq!(ids(&queue.drain(3)), vec![0, 1, 2]);
        assert_eq!(ids(&queue.drain(10)), vec![3, 4]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_overflow_evicts_oldest() {
        let queue = BoundedInputQueue::new(3);
        for id in 0..3 {
            queue.enqueue(InputEvent::new(id));
        }
        let evicted = queue.enqueue(InputEvent::new(3));
        assert_eq!(evicted.map(|e| e.action_id), Some(0));
        assert_eq!(queue.dropped_count(), 1);
        assert_eq!(queue.len(), 3);
        assert_eq!(ids(&queue.drain(3)), vec![1, 2, 3]);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let queue = BoundedInputQueue::new(0);
        assert_eq!(queue.capacity(), 1);
    }

    #[test]
    fn test_clear_does_not_count_drops() {
        let queue = BoundedInputQueue::new(2);
        queue.enqueue(InputEvent::new(1));
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.dropped_count(), 0);
    }

    #[test]
    fn test_concurrent_producers_respect_capacity() {
        let queue = Arc::new(BoundedInputQueue::new(64));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    for i in 0..100 {
                        queue.enqueue(InputEvent::new(t * 1000 + i));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(queue.len(), 64);
        assert_eq!(queue.dropped_count(), 400 - 64);
    }
}
