//! Deduplicating FIFO of plugin ids awaiting dispatch.
//!
//! Channel callbacks push ids here so the dispatch loop learns which
//! plugins have fresh output without rescanning all of them. Each plugin
//! can have at most one queued entry at a time: a second push before the
//! dispatcher has cleared the first is coalesced away, which is safe
//! because the channel slot already holds the newest value.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};

struct Inner {
    buf: VecDeque<usize>,
    queued: Vec<bool>,
}

/// Bounded FIFO of plugin ids with per-id coalescing.
///
/// Capacity equals the plugin count; with the dedup flags the buffer can
/// never overflow, so `put` from inside a channel callback stays
/// allocation-free and bounded.
pub struct UpdateQueue {
    inner: Mutex<Inner>,
    ready: Condvar,
    count: AtomicUsize,
}

impl UpdateQueue {
    /// Create a queue for ids `0..capacity`.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                buf: VecDeque::with_capacity(capacity),
                queued: vec![false; capacity],
            }),
            ready: Condvar::new(),
            count: AtomicUsize::new(0),
        }
    }

    /// Append `id` unless it is already queued.
    ///
    /// Returns `true` if a new entry was enqueued, `false` if it was
    /// coalesced into an existing one (or `id` is out of range, which is
    /// a caller bug and only logged). Wakes one waiter on success.
    pub fn put(&self, id: usize) -> bool {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if id >= inner.queued.len() {
            tracing::error!(id, capacity = inner.queued.len(), "update for unknown plugin id");
            return false;
        }
        if inner.queued[id] {
            return false;
        }
        if inner.buf.len() == inner.queued.len() {
            // Unreachable while the dedup invariant holds.
            tracing::error!(id, "update queue overflow, dropping notification");
            return false;
        }
        inner.buf.push_back(id);
        inner.queued[id] = true;
        self.count.fetch_add(1, Ordering::SeqCst);
        self.ready.notify_one();
        true
    }

    /// Pop the oldest queued id, blocking while the queue is empty.
    ///
    /// The popped id's dedup flag stays set; the dispatcher clears it
    /// with [`clear_queued`](Self::clear_queued) before reading the
    /// plugin's channel, so a fresh update arriving mid-processing can
    /// queue a new notification.
    pub fn pop(&self) -> usize {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            if let Some(id) = inner.buf.pop_front() {
                self.count.fetch_sub(1, Ordering::SeqCst);
                return id;
            }
            inner = self
                .ready
                .wait(inner)
                .unwrap_or_else(|e| e.into_inner());
        }
    }

    /// Allow `id` to be queued again.
    pub fn clear_queued(&self, id: usize) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(flag) = inner.queued.get_mut(id) {
            *flag = false;
        }
    }

    /// Block until at least one id is queued.
    pub fn wait_ready(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        while inner.buf.is_empty() {
            inner = self
                .ready
                .wait(inner)
                .unwrap_or_else(|e| e.into_inner());
        }
    }

    /// Snapshot of the number of queued ids.
    pub fn len(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
