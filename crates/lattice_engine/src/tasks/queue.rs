//! Thread-safe FIFO queue

use crossbeam::channel::{unbounded, Receiver, Sender};
use std::time::Duration;

/// Unbounded multi-producer multi-consumer FIFO.
///
/// Elements come out in strict push order. `push` wakes exactly one
/// blocked popper. [`len`](Self::len) and
/// [`is_empty`](Self::is_empty) are O(1) snapshots that may be stale by
/// the time the caller acts on them; that is deliberate, hot polling
/// paths must not contend on a lock just to peek.
///
/// Clones share the same underlying queue.
#[derive(Debug)]
pub struct MtQueue<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
}

impl<T> MtQueue<T> {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    /// Append an element and wake one waiter.
    pub fn push(&self, value: T) {
        // Cannot fail: this handle owns a receiver, so the channel is
        // never disconnected while `self` is alive.
        self.tx.send(value).unwrap();
    }

    /// Block until an element is available and return the oldest one.
    pub fn pop(&self) -> T {
        self.rx.recv().unwrap()
    }

    /// Return the oldest element if one is immediately available.
    pub fn try_pop(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Wait up to `timeout` for an element.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Racy snapshot of the current queue length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Racy snapshot of whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl<T> Clone for MtQueue<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            rx: self.rx.clone(),
        }
    }
}

impl<T> Default for MtQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
