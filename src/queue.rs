//! FIFO work queue that accepts each key at most once.

use ahash::AHashSet;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::hash::Hash;

struct Inner<T> {
    seen: AHashSet<T>,
    items: VecDeque<T>,
}

/// The seen-set and the FIFO live under one lock, so the membership check and the
/// enqueue happen together. A key popped earlier is still refused.
pub struct DedupQueue<T> {
    inner: Mutex<Inner<T>>,
}

impl<T: Eq + Hash + Clone> Default for DedupQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Eq + Hash + Clone> DedupQueue<T> {
    pub fn new() -> Self {
        Self { inner: Mutex::new(Inner { seen: AHashSet::new(), items: VecDeque::new() }) }
    }

    /// Enqueue `item` unless it was ever enqueued before. Returns whether it was added.
    pub fn push(&self, item: T) -> bool {
        let mut inner = self.inner.lock();
        if !inner.seen.insert(item.clone()) {
            return false;
        }
        inner.items.push_back(item);
        true
    }

    pub fn pop(&self) -> Option<T> {
        self.inner.lock().items.pop_front()
    }

    /// Items waiting.
    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().items.is_empty()
    }

    /// Distinct items ever accepted.
    pub fn seen(&self) -> usize {
        self.inner.lock().seen.len()
    }
}
