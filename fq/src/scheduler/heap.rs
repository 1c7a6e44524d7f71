//! Min-heap of active classes keyed by virtual finish time

use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A class handle in the heap
#[derive(Debug, Clone)]
pub(crate) struct HeapEntry {
    pub class_id: String,
    pub virtual_finish: f64,
    pub order: u64,
}

impl Eq for HeapEntry {}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: smallest finish time first, then earliest registration
        other
            .virtual_finish
            .total_cmp(&self.virtual_finish)
            .then_with(|| other.order.cmp(&self.order))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Priority structure over active classes
#[derive(Debug, Default)]
pub(crate) struct ClassHeap {
    entries: BinaryHeap<HeapEntry>,
}

impl ClassHeap {
    #[cfg(test)]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, class_id: &str, virtual_finish: f64, order: u64) {
        self.entries.push(HeapEntry {
            class_id: class_id.to_string(),
            virtual_finish,
            order,
        });
    }

    pub(crate) fn pop(&mut self) -> Option<HeapEntry> {
        self.entries.pop()
    }

    #[cfg(test)]
    pub(crate) fn peek(&self) -> Option<&HeapEntry> {
        self.entries.peek()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn contains(&self, class_id: &str) -> bool {
        self.entries.iter().any(|e| e.class_id == class_id)
    }

    /// Remove a class's entry, returning whether it was present
    pub(crate) fn remove(&mut self, class_id: &str) -> bool {
        let original_len = self.entries.len();
        let kept: Vec<_> = self.entries.drain().filter(|e| e.class_id != class_id).collect();
        self.entries = kept.into_iter().collect();
        original_len != self.entries.len()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}
