//! Single-slot rendezvous channel between one producer and one consumer.
//!
//! The slot holds the producer's latest unconsumed value, or a latched
//! error that permanently ends the channel's productive life. Unlike an
//! mpsc queue there is no backlog: a value overwritten before the
//! consumer reads it is gone (last-write-wins), which is exactly the
//! semantics a status bar wants - only the newest state of a plugin ever
//! matters.
//!
//! The consumer may subscribe a state-change callback that fires
//! synchronously on the thread performing the transition, while the slot
//! lock is held. Callbacks therefore must be fast and must never block on
//! anything that could in turn wait on this channel.

use std::sync::{Arc, Condvar, Mutex};

/// Subscription bits for [`Consumer::set_callback`].
pub mod state_mask {
    /// Fire when the slot goes from empty to holding a value.
    pub const VALUE: u8 = 1 << 0;
    /// Fire when the slot goes from empty to the latched error state.
    pub const ERROR: u8 = 1 << 1;
    /// Fire when a `get` drains the slot back to empty.
    pub const EMPTY: u8 = 1 << 2;
}

/// Observable state of the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Empty,
    Value,
    Error,
}

enum Slot<T, E> {
    Empty,
    Value(T),
    Error(E),
}

impl<T, E> Slot<T, E> {
    fn state(&self) -> ChannelState {
        match self {
            Slot::Empty => ChannelState::Empty,
            Slot::Value(_) => ChannelState::Value,
            Slot::Error(_) => ChannelState::Error,
        }
    }
}

type Callback = Box<dyn Fn(ChannelState) + Send + Sync>;

struct Inner<T, E> {
    slot: Slot<T, E>,
    callback: Option<(u8, Callback)>,
}

impl<T, E> Inner<T, E> {
    /// Fire the subscribed callback for a transition into `state`.
    /// Runs with the slot lock held.
    fn notify_state(&self, state: ChannelState, bit: u8) {
        if let Some((mask, cb)) = &self.callback
            && mask & bit != 0
        {
            cb(state);
        }
    }
}

struct Shared<T, E> {
    inner: Mutex<Inner<T, E>>,
    cond: Condvar,
}

/// Create a connected producer/consumer pair over a fresh slot.
///
/// The halves share the backing slot via `Arc` and may be dropped in any
/// order; the slot lives until the last handle goes.
pub fn channel<T, E: Clone>() -> (Producer<T, E>, Consumer<T, E>) {
    let shared = Arc::new(Shared {
        inner: Mutex::new(Inner {
            slot: Slot::Empty,
            callback: None,
        }),
        cond: Condvar::new(),
    });
    (
        Producer {
            shared: shared.clone(),
        },
        Consumer { shared },
    )
}

/// Writing half of a rendezvous channel.
///
/// Clonable so the plugin handle can keep one for synthetic error
/// injection while the plugin holds another; the two still form a single
/// logical producer stream (the handle only writes when the plugin has
/// failed).
pub struct Producer<T, E> {
    shared: Arc<Shared<T, E>>,
}

impl<T, E> Clone for Producer<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T, E: Clone> Producer<T, E> {
    /// Store a value, overwriting any unconsumed previous one.
    ///
    /// Returns `false` without storing if the channel is already latched
    /// to an error. Wakes one waiting consumer. The overwritten-value
    /// case is deliberate last-write-wins; callers that need every update
    /// delivered want a queue, not this slot.
    pub fn put_value(&self, value: T) -> bool {
        let mut inner = self.shared.inner.lock().unwrap_or_else(|e| e.into_inner());
        match inner.slot {
            Slot::Error(_) => false,
            Slot::Empty => {
                inner.slot = Slot::Value(value);
                self.shared.cond.notify_one();
                inner.notify_state(ChannelState::Value, state_mask::VALUE);
                true
            }
            Slot::Value(_) => {
                // Overwrite: still non-empty, so no transition to report.
                inner.slot = Slot::Value(value);
                self.shared.cond.notify_one();
                true
            }
        }
    }

    /// Latch the channel to an error state.
    ///
    /// Returns `false` if an error is already latched. Wakes all waiters,
    /// since the error is terminal for every observer. A pending unread
    /// value is discarded in favor of the error.
    pub fn put_error(&self, error: E) -> bool {
        let mut inner = self.shared.inner.lock().unwrap_or_else(|e| e.into_inner());
        match inner.slot {
            Slot::Error(_) => false,
            _ => {
                let was_empty = matches!(inner.slot, Slot::Empty);
                inner.slot = Slot::Error(error);
                self.shared.cond.notify_all();
                // A pending value already has a notification in flight, so
                // only the empty->error transition needs to be reported.
                if was_empty {
                    inner.notify_state(ChannelState::Error, state_mask::ERROR);
                }
                true
            }
        }
    }
}

/// Reading half of a rendezvous channel.
pub struct Consumer<T, E> {
    shared: Arc<Shared<T, E>>,
}

impl<T, E: Clone> Consumer<T, E> {
    /// Block until the slot is non-empty, then extract.
    ///
    /// A value resets the slot to empty; a latched error is returned by
    /// clone and stays latched forever.
    pub fn get(&self) -> Result<T, E> {
        let mut inner = self.shared.inner.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            match &inner.slot {
                Slot::Empty => {
                    inner = self
                        .shared
                        .cond
                        .wait(inner)
                        .unwrap_or_else(|e| e.into_inner());
                }
                Slot::Error(e) => return Err(e.clone()),
                Slot::Value(_) => {
                    let Slot::Value(value) = std::mem::replace(&mut inner.slot, Slot::Empty) else {
                        unreachable!("slot state checked above");
                    };
                    inner.notify_state(ChannelState::Empty, state_mask::EMPTY);
                    return Ok(value);
                }
            }
        }
    }

    /// Block until the slot is non-empty, without consuming.
    pub fn wait(&self) {
        let mut inner = self.shared.inner.lock().unwrap_or_else(|e| e.into_inner());
        while matches!(inner.slot, Slot::Empty) {
            inner = self
                .shared
                .cond
                .wait(inner)
                .unwrap_or_else(|e| e.into_inner());
        }
    }

    /// Snapshot the current slot state.
    pub fn state(&self) -> ChannelState {
        self.shared
            .inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .slot
            .state()
    }

    /// Subscribe a state-change callback.
    ///
    /// `mask` selects which transitions fire it (see [`state_mask`]). The
    /// callback runs on the thread performing the transition, with the
    /// slot lock held: keep it short and non-blocking.
    pub fn set_callback<F>(&self, mask: u8, callback: F)
    where
        F: Fn(ChannelState) + Send + Sync + 'static,
    {
        let mut inner = self.shared.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.callback = Some((mask, Box::new(callback)));
    }
}
