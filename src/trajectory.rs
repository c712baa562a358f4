// src/trajectory.rs
//
// Fixed-capacity history of tracked centroids. Storage is allocated once;
// at capacity the oldest slot is overwritten in place.

use crate::types::Position;

pub const DEFAULT_CAPACITY: usize = 1000;

#[derive(Debug, Clone)]
pub struct Trajectory {
    slots: Vec<Position>,
    head: usize, // index of the oldest point once full
    capacity: usize,
}

impl Trajectory {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// A capacity of zero is treated as one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Vec::with_capacity(capacity),
            head: 0,
            capacity,
        }
    }

    pub fn push(&mut self, position: Position) {
        if self.slots.len() < self.capacity {
            self.slots.push(position);
        } else {
            self.slots[self.head] = position;
            self.head = (self.head + 1) % self.capacity;
        }
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.head = 0;
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Oldest to newest.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            slots: &self.slots,
            head: self.head,
            index: 0,
        }
    }

    pub fn snapshot(&self) -> Vec<Position> {
        self.iter().collect()
    }
}

impl Default for Trajectory {
    fn default() -> Self {
        Self::new()
    }
}

impl Extend<Position> for Trajectory {
    fn extend<T: IntoIterator<Item = Position>>(&mut self, iter: T) {
        for position in iter {
            self.push(position);
        }
    }
}

pub struct Iter<'a> {
    slots: &'a [Position],
    head: usize,
    index: usize,
}

impl Iterator for Iter<'_> {
    type Item = Position;

    fn next(&mut self) -> Option<Position> {
        if self.index >= self.slots.len() {
            return None;
        }
        let position = self.slots[(self.head + self.index) % self.slots.len()];
        self.index += 1;
        Some(position)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.slots.len() - self.index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl Clone for Iter<'_> {
    fn clone(&self) -> Self {
        Self {
            slots: self.slots,
            head: self.head,
            index: self.index,
        }
    }
}
