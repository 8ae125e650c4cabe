//! [`RingBuffer`] – fixed-capacity FIFO with index wraparound.
//!
//! Storage is allocated once up to `capacity` slots.  Once full, each push
//! overwrites the oldest slot and advances the head, so sustained input never
//! allocates.
//!
//! ```rust
//! use glytch_memory::RingBuffer;
//!
//! let mut ring = RingBuffer::new(3);
//! for n in 1..=5 {
//!     ring.push(n);
//! }
//! assert_eq!(ring.to_vec(), vec![3, 4, 5]);
//! ```

#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    slots: Vec<T>,
    /// Index of the oldest element once the buffer is full; 0 before that.
    head: usize,
    capacity: usize,
}

impl<T> RingBuffer<T> {
    /// Create an empty ring holding at most `capacity` elements (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Vec::with_capacity(capacity),
            head: 0,
            capacity,
        }
    }

    /// Append `value`, returning the evicted oldest element when full.
    pub fn push(&mut self, value: T) -> Option<T> {
        if self.slots.len() < self.capacity {
            self.slots.push(value);
            return None;
        }
        let evicted = std::mem::replace(&mut self.slots[self.head], value);
        self.head = (self.head + 1) % self.capacity;
        Some(evicted)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterate oldest → newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        let (newer, older) = self.slots.split_at(self.head);
        older.iter().chain(newer.iter())
    }

    /// Most recently pushed element.
    pub fn latest(&self) -> Option<&T> {
        if self.slots.is_empty() {
            return None;
        }
        let idx = (self.head + self.slots.len() - 1) % self.slots.len();
        self.slots.get(idx)
    }
}

impl<T: Clone> RingBuffer<T> {
    /// Owned snapshot, oldest → newest.
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_without_evicting() {
        let mut ring = RingBuffer::new(3);
        assert!(ring.push('a').is_none());
        assert!(ring.push('b').is_none());
        assert_eq!(ring.to_vec(), vec!['a', 'b']);
        assert_eq!(ring.latest(), Some(&'b'));
    }

    #[test]
    fn evicts_oldest_first() {
        let mut ring = RingBuffer::new(3);
        ring.push(1);
        ring.push(2);
        ring.push(3);
        assert_eq!(ring.push(4), Some(1));
        assert_eq!(ring.push(5), Some(2));
        assert_eq!(ring.to_vec(), vec![3, 4, 5]);
        assert_eq!(ring.latest(), Some(&5));
        assert_eq!(ring.len(), 3);
    }

    #[test]
    fn wraps_around_many_times() {
        let mut ring = RingBuffer::new(4);
        for n in 0..103 {
            ring.push(n);
        }
        assert_eq!(ring.to_vec(), vec![99, 100, 101, 102]);
        assert_eq!(ring.latest(), Some(&102));
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut ring = RingBuffer::new(0);
        assert_eq!(ring.capacity(), 1);
        ring.push("x");
        ring.push("y");
        assert_eq!(ring.to_vec(), vec!["y"]);
    }

    #[test]
    fn empty_ring() {
        let ring: RingBuffer<u8> = RingBuffer::new(2);
        assert!(ring.is_empty());
        assert!(ring.latest().is_none());
        assert_eq!(ring.iter().count(), 0);
    }
}
