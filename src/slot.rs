//! `WaitableSlot`: a single-slot rendezvous used to hand a command's reply
//! from the reader thread back to the caller blocked in [`Channel`](crate::channel::Channel).
//!
//! One instance of `WaitableSlot` backs at most one outstanding command at a
//! time; the channel's command lock guarantees there is never contention on
//! `put`. The type still treats put-while-full as an error rather than an
//! assert, the same way the original monitor did, since a misbehaving device
//! replying twice to one command must not corrupt or block the channel.

use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Sentinel passed to [`WaitableSlot::get`] meaning "don't block".
pub const TIMEOUT_POLL: u16 = 0;
/// Sentinel passed to [`WaitableSlot::get`] meaning "block forever".
pub const TIMEOUT_INFINITE: u16 = 65535;

/// How long [`WaitableSlot::get`] should wait for a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    /// Return immediately if the slot is empty.
    Poll,
    /// Wait up to the given number of milliseconds.
    Millis(u32),
    /// Wait until a value arrives or the slot is destroyed.
    Infinite,
}

impl From<u16> for Timeout {
    fn from(raw: u16) -> Self {
        match raw {
            TIMEOUT_POLL => Timeout::Poll,
            TIMEOUT_INFINITE => Timeout::Infinite,
            ms => Timeout::Millis(ms as u32),
        }
    }
}

/// Errors raised by [`WaitableSlot`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SlotError {
    /// `put` found a value already waiting to be collected.
    #[error("slot is already occupied")]
    Busy,
    /// `get` polled an empty slot.
    #[error("slot is empty")]
    Empty,
    /// `get` waited the full timeout with nothing arriving.
    #[error("timed out waiting for a value")]
    TimedOut,
    /// The slot was destroyed, or [`WaitableSlot::signal`] was called, while
    /// a `get` was blocked on it.
    #[error("wait was cancelled")]
    Cancelled,
}

struct State<T> {
    value: Option<T>,
    destroyed: bool,
    signalled: bool,
}

/// A single-slot mailbox with blocking semantics, built on a
/// [`Mutex`]/[`Condvar`] pair exactly like the monitor it replaces.
pub struct WaitableSlot<T> {
    state: Mutex<State<T>>,
    cond: Condvar,
}

impl<T> WaitableSlot<T> {
    pub fn new() -> Self {
        WaitableSlot {
            state: Mutex::new(State {
                value: None,
                destroyed: false,
                signalled: false,
            }),
            cond: Condvar::new(),
        }
    }

    /// Deposits `value` into the slot. Fails with [`SlotError::Busy`] if a
    /// previous value has not yet been collected by `get`.
    pub fn put(&self, value: T) -> Result<(), SlotError> {
        let mut state = self.state.lock().unwrap();
        if state.value.is_some() {
            return Err(SlotError::Busy);
        }
        state.value = Some(value);
        self.cond.notify_all();
        Ok(())
    }

    /// Deposits `value` into the slot, overwriting any value not yet
    /// collected by `get`. Returns `true` if an existing value was
    /// overwritten, i.e. the device replied before the previous reply was
    /// read off the slot — the "reply-slot collision" case callers are
    /// expected to count rather than treat as fatal.
    pub fn force_put(&self, value: T) -> bool {
        let mut state = self.state.lock().unwrap();
        let collided = state.value.replace(value).is_some();
        self.cond.notify_all();
        collided
    }

    /// Waits for and removes the slot's value.
    ///
    /// [`Timeout::Poll`] never blocks: an empty slot yields
    /// [`SlotError::Empty`] immediately. [`Timeout::Infinite`] blocks until a
    /// value is put, the slot is destroyed, or [`WaitableSlot::signal`] is
    /// called. [`Timeout::Millis`] blocks for at most that long before
    /// yielding [`SlotError::TimedOut`].
    pub fn get(&self, timeout: Timeout) -> Result<T, SlotError> {
        let mut state = self.state.lock().unwrap();
        if let Timeout::Poll = timeout {
            return Self::take(&mut state);
        }
        let deadline = match timeout {
            Timeout::Millis(ms) => Some(Instant::now() + Duration::from_millis(ms as u64)),
            _ => None,
        };
        loop {
            if state.value.is_some() || state.destroyed || state.signalled {
                return Self::take(&mut state);
            }
            state = match deadline {
                None => self.cond.wait(state).unwrap(),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(SlotError::TimedOut);
                    }
                    let (guard, result) =
                        self.cond.wait_timeout(state, deadline - now).unwrap();
                    if result.timed_out()
                        && guard.value.is_none()
                        && !guard.destroyed
                        && !guard.signalled
                    {
                        return Err(SlotError::TimedOut);
                    }
                    guard
                }
            };
        }
    }

    fn take(state: &mut State<T>) -> Result<T, SlotError> {
        if let Some(value) = state.value.take() {
            return Ok(value);
        }
        if state.destroyed || state.signalled {
            state.signalled = false;
            return Err(SlotError::Cancelled);
        }
        Err(SlotError::Empty)
    }

    /// Wakes every thread blocked in `get` without depositing a value; each
    /// sees [`SlotError::Cancelled`] unless a real value is already waiting.
    pub fn signal(&self) {
        let mut state = self.state.lock().unwrap();
        state.signalled = true;
        self.cond.notify_all();
    }

    /// Discards any pending value and clears a latched signal, without
    /// waking blocked waiters.
    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap();
        state.value = None;
        state.signalled = false;
    }

    /// Permanently unblocks every waiter with [`SlotError::Cancelled`]. Called
    /// automatically on drop; exposed so a channel can tear down its reader
    /// before the slot itself is dropped.
    pub fn destroy(&self) {
        let mut state = self.state.lock().unwrap();
        state.destroyed = true;
        self.cond.notify_all();
    }
}

impl<T> Default for WaitableSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for WaitableSlot<T> {
    fn drop(&mut self) {
        self.destroy();
    }
}
