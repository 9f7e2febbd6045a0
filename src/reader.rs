//! The background thread that owns the serial transport's read half: pulls
//! bytes off the wire, assembles them into SLCAN lines with [`codec`], and
//! routes each decoded line to either the pending command's reply slot or
//! the channel's receive queue.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, trace, warn};

use crate::codec::{self, CodecError, LineMessage};
use crate::frame::{CanFrame, CanTimestamp};
use crate::queue::ReceiveQueue;
use crate::serial::SerialTransport;
use crate::slot::WaitableSlot;

/// A device reply to a command other than a data/remote frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandReply {
    Ack,
    Nak,
    Text(String),
    Status(u8),
}

/// Folds the SLCAN 16-bit millisecond time-stamp into a monotonic
/// [`CanTimestamp`], assuming exactly one 60000 ms wraparound whenever a new
/// reading is smaller than the last one seen.
///
/// Two or more wraps between consecutive frames (i.e. a gap longer than
/// 60 s between received frames) are not distinguishable from a single
/// wrap and are folded as if only one occurred.
#[derive(Debug, Default)]
struct TimestampFolder {
    last_raw: Option<u16>,
    epoch_ms: u64,
}

const SLCAN_TIMESTAMP_PERIOD_MS: u64 = 60_000;

impl TimestampFolder {
    fn fold(&mut self, raw: u16) -> CanTimestamp {
        if let Some(last) = self.last_raw {
            if raw < last {
                self.epoch_ms += SLCAN_TIMESTAMP_PERIOD_MS;
            }
        }
        self.last_raw = Some(raw);
        let total_ms = self.epoch_ms + raw as u64;
        CanTimestamp::new(total_ms / 1000, ((total_ms % 1000) * 1_000_000) as u32)
    }
}

/// Handle to the running reader thread. Dropping it does not stop the
/// thread; call [`ReaderTask::stop`] (or let the channel do so on teardown).
pub struct ReaderTask {
    stop_flag: Arc<AtomicBool>,
    protocol_errors: Arc<AtomicU64>,
    reply_collisions: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

impl ReaderTask {
    /// Spawns the reader thread. `transport` is shared with the channel so
    /// it can interleave command writes between reads; the reader only ever
    /// holds the lock for the duration of one `read` call. `replies`
    /// receives every non-frame reply; `frames` receives every successfully
    /// decoded data/remote frame.
    pub fn spawn(
        transport: Arc<Mutex<Box<dyn SerialTransport>>>,
        replies: Arc<WaitableSlot<CommandReply>>,
        frames: Arc<ReceiveQueue<CanFrame>>,
        timestamping_enabled: bool,
    ) -> ReaderTask {
        let stop_flag = Arc::new(AtomicBool::new(false));
        let protocol_errors = Arc::new(AtomicU64::new(0));
        let reply_collisions = Arc::new(AtomicU64::new(0));

        let thread_stop = Arc::clone(&stop_flag);
        let thread_errors = Arc::clone(&protocol_errors);
        let thread_collisions = Arc::clone(&reply_collisions);

        let handle = thread::Builder::new()
            .name("slcan-reader".into())
            .spawn(move || {
                {
                    let mut guard = transport.lock().unwrap();
                    let _ = guard.set_timeout(Duration::from_millis(50));
                }
                let mut buf: Vec<u8> = Vec::with_capacity(256);
                let mut scratch = [0u8; 128];
                let mut folder = TimestampFolder::default();

                while !thread_stop.load(Ordering::Relaxed) {
                    let read_result = {
                        let mut guard = transport.lock().unwrap();
                        guard.read(&mut scratch)
                    };
                    match read_result {
                        Ok(0) => {}
                        Ok(n) => buf.extend_from_slice(&scratch[..n]),
                        Err(e)
                            if matches!(
                                e.kind(),
                                std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
                            ) => {}
                        Err(e) => {
                            warn!("slcan reader: serial port error, stopping: {e}");
                            break;
                        }
                    }

                    loop {
                        match codec::decode_next(&buf) {
                            Ok((message, consumed)) => {
                                buf.drain(..consumed);
                                dispatch(
                                    message,
                                    &replies,
                                    &frames,
                                    &mut folder,
                                    timestamping_enabled,
                                    &thread_collisions,
                                );
                            }
                            Err(CodecError::NeedMoreBytes) => break,
                            Err(err) => {
                                debug!("slcan reader: discarding malformed line: {err}");
                                thread_errors.fetch_add(1, Ordering::Relaxed);
                                if let Some(pos) = buf.iter().position(|&b| b == b'\r' || b == 0x07)
                                {
                                    buf.drain(..=pos);
                                } else {
                                    buf.clear();
                                    break;
                                }
                            }
                        }
                    }
                }
                trace!("slcan reader: thread exiting");
            })
            .expect("failed to spawn slcan reader thread");

        ReaderTask {
            stop_flag,
            protocol_errors,
            reply_collisions,
            handle: Some(handle),
        }
    }

    /// Signals the reader thread to stop and waits for it to exit.
    pub fn stop(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    /// Number of lines discarded for failing to parse as SLCAN since the
    /// reader started.
    pub fn protocol_error_count(&self) -> u64 {
        self.protocol_errors.load(Ordering::Relaxed)
    }

    /// Number of times a device reply arrived while the previous reply was
    /// still sitting uncollected in the reply slot. The new reply wins and
    /// overwrites the old one; this counts how often that happened.
    pub fn reply_collision_count(&self) -> u64 {
        self.reply_collisions.load(Ordering::Relaxed)
    }
}

impl Drop for ReaderTask {
    fn drop(&mut self) {
        self.stop();
    }
}

fn dispatch(
    message: LineMessage,
    replies: &WaitableSlot<CommandReply>,
    frames: &ReceiveQueue<CanFrame>,
    folder: &mut TimestampFolder,
    timestamping_enabled: bool,
    reply_collisions: &AtomicU64,
) {
    let reply = match message {
        LineMessage::Frame {
            mut frame,
            timestamp_ms,
        } => {
            if timestamping_enabled {
                if let Some(raw) = timestamp_ms {
                    frame.set_timestamp(folder.fold(raw));
                }
            }
            frames.push(frame);
            return;
        }
        LineMessage::Ack => CommandReply::Ack,
        LineMessage::Nak => CommandReply::Nak,
        LineMessage::Text(text) => CommandReply::Text(text),
        LineMessage::StatusFlags(flags) => CommandReply::Status(flags),
    };
    // A device replying before the previous reply was collected is a
    // protocol violation, but tolerated: the newest reply wins.
    if replies.force_put(reply) {
        reply_collisions.fetch_add(1, Ordering::Relaxed);
    }
}
