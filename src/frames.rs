use std::collections::VecDeque;

use crate::error::SpecError;

/// One frequency-analysis snapshot: byte intensities, one per bin, painted
/// as a single pixel column.
pub type FrequencyFrame = Vec<u8>;

/// Append-only rolling buffer of frequency frames, indexed by arrival order.
///
/// Index order is temporal order is left-to-right pixel order. When a
/// capacity bound is set the oldest frames are evicted first and indices are
/// positional: after eviction, index 0 is the oldest retained frame.
pub struct FrameStore {
    frames: VecDeque<FrequencyFrame>,
    capacity: Option<usize>,
}

impl FrameStore {
    pub fn new() -> Self {
        Self {
            frames: VecDeque::new(),
            capacity: None,
        }
    }

    pub fn with_capacity_bound(capacity: usize) -> Self {
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity: Some(capacity),
        }
    }

    /// Append one frame, evicting the oldest when the capacity bound is hit.
    /// The only mutator; called once per producer tick.
    pub fn append(&mut self, frame: FrequencyFrame) {
        if let Some(cap) = self.capacity {
            while self.frames.len() >= cap {
                self.frames.pop_front();
            }
        }
        self.frames.push_back(frame);
    }

    pub fn get(&self, index: usize) -> Result<&FrequencyFrame, SpecError> {
        self.frames.get(index).ok_or(SpecError::OutOfRange {
            index,
            len: self.frames.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

impl Default for FrameStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_then_get_last_returns_the_frame() {
        let mut store = FrameStore::new();
        store.append(vec![1, 2, 3]);
        store.append(vec![4, 5, 6]);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(store.len() - 1).unwrap(), &vec![4, 5, 6]);
    }

    #[test]
    fn get_past_the_end_is_out_of_range() {
        let mut store = FrameStore::new();
        store.append(vec![0]);
        assert!(matches!(
            store.get(1),
            Err(SpecError::OutOfRange { index: 1, len: 1 })
        ));
        assert!(matches!(store.get(100), Err(SpecError::OutOfRange { .. })));
    }

    #[test]
    fn capacity_bound_evicts_oldest_first() {
        let mut store = FrameStore::with_capacity_bound(5);
        for i in 0..7u8 {
            store.append(vec![i]);
        }
        assert_eq!(store.len(), 5);
        // the first two appends were evicted, so index 0 is the 3rd frame
        assert_eq!(store.get(0).unwrap(), &vec![2]);
        assert_eq!(store.get(4).unwrap(), &vec![6]);
    }

    #[test]
    fn unbounded_store_keeps_everything() {
        let mut store = FrameStore::new();
        for i in 0..1_000usize {
            store.append(vec![(i % 256) as u8]);
        }
        assert_eq!(store.len(), 1_000);
        assert_eq!(store.get(0).unwrap(), &vec![0]);
    }

    #[test]
    fn clear_empties_the_store() {
        let mut store = FrameStore::with_capacity_bound(3);
        store.append(vec![1]);
        store.clear();
        assert!(store.is_empty());
        assert!(matches!(store.get(0), Err(SpecError::OutOfRange { .. })));
    }
}
