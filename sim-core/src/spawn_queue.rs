use crate::error::SimError;
use glam::Vec2;
use std::collections::VecDeque;

/// Bounded FIFO of pending spawn positions.
///
/// The input layer pushes requests whenever they arrive; the stepper drains
/// at most `spawn_rate` of them once per tick. This decouples input cadence
/// from tick cadence: given the same request sequence, the same particles
/// are created on the same ticks.
#[derive(Debug)]
pub struct SpawnQueue {
    pending: VecDeque<Vec2>,
    capacity: usize,
}

impl SpawnQueue {
    /// Creates an empty queue holding at most `capacity` requests.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pending: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Enqueues one request.
    ///
    /// ### Returns
    /// `Err(SimError::QueueFull)` if `capacity` requests are already
    /// pending; the new request is dropped and the queue is unchanged.
    pub fn push(&mut self, pos: Vec2) -> Result<(), SimError> {
        if self.pending.len() >= self.capacity {
            return Err(SimError::QueueFull {
                capacity: self.capacity,
            });
        }
        self.pending.push_back(pos);
        Ok(())
    }

    /// Removes and yields up to `max` of the oldest requests.
    pub fn drain_up_to(&mut self, max: usize) -> impl Iterator<Item = Vec2> + '_ {
        let n = max.min(self.pending.len());
        self.pending.drain(..n)
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_until_full_then_rejects() {
        let mut q = SpawnQueue::with_capacity(2);
        assert!(q.push(Vec2::ZERO).is_ok());
        assert!(q.push(Vec2::ONE).is_ok());

        assert_eq!(q.push(Vec2::X), Err(SimError::QueueFull { capacity: 2 }));
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn drain_is_fifo_and_bounded() {
        let mut q = SpawnQueue::with_capacity(8);
        for i in 0..5 {
            q.push(Vec2::new(i as f32, 0.0)).unwrap();
        }

        let first: Vec<Vec2> = q.drain_up_to(3).collect();
        assert_eq!(
            first,
            vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(2.0, 0.0)]
        );
        assert_eq!(q.len(), 2);

        let rest: Vec<Vec2> = q.drain_up_to(10).collect();
        assert_eq!(rest.len(), 2);
        assert!(q.is_empty());
    }

    #[test]
    fn drained_slots_can_be_reused() {
        let mut q = SpawnQueue::with_capacity(1);
        q.push(Vec2::ZERO).unwrap();
        assert_eq!(q.drain_up_to(1).count(), 1);
        assert!(q.push(Vec2::ONE).is_ok());
    }

    #[test]
    fn clear_discards_pending_requests() {
        let mut q = SpawnQueue::with_capacity(4);
        q.push(Vec2::ZERO).unwrap();
        q.push(Vec2::ONE).unwrap();
        q.clear();
        assert!(q.is_empty());
        assert_eq!(q.drain_up_to(4).count(), 0);
    }
}
