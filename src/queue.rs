//! `ReceiveQueue`: the bounded FIFO a [`Channel`](crate::channel::Channel)
//! drains from its reader thread and callers drain from `read`.
//!
//! Overflow policy is drop-newest: once the queue is full, a frame arriving
//! from the bus is discarded rather than evicting something the caller has
//! not seen yet, and the drop latches the channel's `queue_overrun` status
//! bit until explicitly cleared.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::slot::Timeout;

struct State<T> {
    items: VecDeque<T>,
    overrun: bool,
    destroyed: bool,
    signalled: bool,
}

/// A bounded, blocking, drop-newest-on-overflow FIFO.
pub struct ReceiveQueue<T> {
    state: Mutex<State<T>>,
    cond: Condvar,
    capacity: usize,
}

impl<T> ReceiveQueue<T> {
    pub fn new(capacity: usize) -> Self {
        ReceiveQueue {
            state: Mutex::new(State {
                items: VecDeque::with_capacity(capacity),
                overrun: false,
                destroyed: false,
                signalled: false,
            }),
            cond: Condvar::new(),
            capacity,
        }
    }

    /// Pushes an item, dropping it silently and latching `queue_overrun` if
    /// the queue is already at capacity.
    pub fn push(&self, item: T) {
        let mut state = self.state.lock().unwrap();
        if state.items.len() >= self.capacity {
            state.overrun = true;
            return;
        }
        state.items.push_back(item);
        self.cond.notify_one();
    }

    /// Pops the oldest item, waiting up to `timeout` for one to arrive.
    pub fn pop(&self, timeout: Timeout) -> Option<T> {
        let mut state = self.state.lock().unwrap();
        if let Timeout::Poll = timeout {
            return state.items.pop_front();
        }
        let deadline = match timeout {
            Timeout::Millis(ms) => Some(Instant::now() + Duration::from_millis(ms as u64)),
            _ => None,
        };
        loop {
            if let Some(item) = state.items.pop_front() {
                return Some(item);
            }
            if state.destroyed {
                return None;
            }
            if state.signalled {
                state.signalled = false;
                return None;
            }
            state = match deadline {
                None => self.cond.wait(state).unwrap(),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return None;
                    }
                    self.cond.wait_timeout(state, deadline - now).unwrap().0
                }
            };
        }
    }

    /// Returns and clears the latched overrun bit.
    pub fn take_overrun(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        std::mem::take(&mut state.overrun)
    }

    /// Drops every queued item without affecting the overrun latch.
    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap();
        state.items.clear();
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Unblocks any thread waiting in `pop`, which then observes `None`.
    pub fn destroy(&self) {
        let mut state = self.state.lock().unwrap();
        state.destroyed = true;
        self.cond.notify_all();
    }

    /// Wakes every thread blocked in `pop` once, without permanently
    /// destroying the queue; each sees `None` unless an item is already
    /// waiting.
    pub fn signal(&self) {
        let mut state = self.state.lock().unwrap();
        state.signalled = true;
        self.cond.notify_all();
    }
}

impl<T> Drop for ReceiveQueue<T> {
    fn drop(&mut self) {
        self.destroy();
    }
}
