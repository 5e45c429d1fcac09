use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::Notify;

/// Ordered, time-indexed buffer shared between a producer loop and its consumers.
///
/// Every operation takes the inner lock once, so `drain_all` and `rewrite` are
/// atomic with respect to concurrent `push`/`pop` calls. Indexed lookups are O(1).
#[derive(Debug)]
pub struct StreamQueue<T> {
    items: Mutex<VecDeque<T>>,
    notify: Notify,
}

impl<T> StreamQueue<T> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        // A panic while holding the lock cannot leave the deque half-updated,
        // so a poisoned lock is still safe to use.
        self.items.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn push(&self, item: T) {
        self.lock().push_back(item);
        self.notify.notify_waiters();
    }

    pub fn extend(&self, items: impl IntoIterator<Item = T>) {
        self.lock().extend(items);
        self.notify.notify_waiters();
    }

    /// Remove the oldest item without waiting.
    pub fn try_pop(&self) -> Option<T> {
        self.lock().pop_front()
    }

    /// Remove the oldest item, waiting until one is available.
    pub async fn pop(&self) -> T {
        loop {
            let notified = self.notify.notified();
            if let Some(item) = self.try_pop() {
                return item;
            }
            notified.await;
        }
    }

    /// Inspect the oldest item without removing it.
    pub fn peek_with<R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.lock().front().map(f)
    }

    /// Inspect the item at `index` (0 = oldest) without removing it.
    pub fn get_with<R>(&self, index: usize, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.lock().get(index).map(f)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Discard every queued item, returning how many were dropped.
    pub fn clear(&self) -> usize {
        let mut items = self.lock();
        let dropped = items.len();
        items.clear();
        dropped
    }

    /// Remove and return every queued item, oldest first.
    pub fn drain_all(&self) -> Vec<T> {
        self.lock().drain(..).collect()
    }

    /// Atomically drain the queue, transform the drained items, and requeue the result.
    ///
    /// Returns the number of items requeued.
    pub fn rewrite(&self, f: impl FnOnce(Vec<T>) -> Vec<T>) -> usize {
        let requeued = {
            let mut items = self.lock();
            let drained: Vec<T> = items.drain(..).collect();
            items.extend(f(drained));
            items.len()
        };
        self.notify.notify_waiters();
        requeued
    }
}

impl<T> Default for StreamQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
