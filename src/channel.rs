//! [`Channel`]: the public state machine tying the codec, reader thread,
//! receive queue and command rendezvous together into the CAN channel
//! contract (`Closed` → `Initialized` → `Running` → `Initialized` →
//! `Closed`).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use log::{info, warn};

use crate::codec::{self, CodecError};
use crate::error::{Error, Result};
use crate::frame::CanFrame;
use crate::numerics::{AcceptanceFilter, BitrateIndex};
use crate::queue::ReceiveQueue;
use crate::reader::{CommandReply, ReaderTask};
use crate::serial::SerialTransport;
use crate::slot::{SlotError, Timeout, WaitableSlot};

/// Default time a command is given to be acknowledged before the channel
/// reports [`Error::Timeout`].
const DEFAULT_COMMAND_TIMEOUT_MS: u32 = 1000;
/// Default receive queue depth.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Operating-mode flags passed to [`Channel::initialize`], mirroring the
/// CAN API V3 channel-open flags. Every flag defaults to off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpMode {
    /// Listen-only: the device never acknowledges or transmits frames, and
    /// [`Channel::write`] is rejected with [`Error::WrongState`].
    pub monitor: bool,
    /// Let bus/protocol error conditions be surfaced as error frames
    /// instead of only the `status()` bits. Accepted and recorded, but
    /// SLCAN's wire grammar has no encoding for error-frame delivery, so
    /// this flag currently has no observable effect.
    pub err_frames: bool,
    /// Reject outgoing frames carrying an extended (29-bit) identifier.
    pub no_xtd: bool,
    /// Reject outgoing remote-transmission-request frames.
    pub no_rtr: bool,
    /// Allow more than one channel handle to share the same serial port.
    /// Accepted and recorded for parity with the CAN API V3 flag set; this
    /// driver does not itself arbitrate between handles sharing a port.
    pub shared: bool,
    /// CAN FD framing. Always rejected: SLCAN carries Classical CAN only.
    pub fd: bool,
}

/// Whether the channel transmits as well as receives, or only listens.
/// Derived from [`OpMode::monitor`] and stored once the channel is
/// initialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Normal,
    ListenOnly,
}

/// The three legal channel states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Closed,
    Initialized,
    Running,
}

/// Individual bits of the SLCAN `F` status-flags byte this driver decodes
/// `status()`'s raw reply into. The wire grammar (`spec.md` §4.B) only
/// documents `F` as an opaque byte; this is this driver's own assignment
/// of bit positions, following the common Lawicel CANUSB convention.
mod status_bits {
    pub const QUEUE_OVERRUN: u8 = 1 << 0;
    pub const MESSAGE_LOST: u8 = 1 << 1;
    pub const WARNING_LEVEL: u8 = 1 << 2;
    pub const BUS_ERROR: u8 = 1 << 3;
    pub const TRANSMITTER_BUSY: u8 = 1 << 4;
    pub const BUS_OFF: u8 = 1 << 5;
}

/// Status flags observable at any time via [`Channel::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelStatus {
    /// At least one received frame was dropped because the receive queue
    /// was full; cleared by this call.
    pub queue_overrun: bool,
    /// The controller has gone bus-off.
    pub bus_off: bool,
    /// The controller has crossed the error-warning threshold.
    pub warning_level: bool,
    /// The controller is in an active bus-error condition.
    pub bus_error: bool,
    /// The device's transmit buffer was reported full on the last status
    /// query.
    pub transmitter_busy: bool,
    /// The device reported a lost (not just queued-and-dropped) message,
    /// e.g. its own internal receive FIFO overflowed.
    pub message_lost: bool,
    /// Synthesized from the channel state machine: true whenever the
    /// channel is not `Running` (mirrors a fresh-open/reset device).
    pub reset: bool,
    /// The serial port has failed and every operation now fails fast.
    pub port_error: bool,
    /// Raw status byte last reported by the device's `F` command, if the
    /// channel is running.
    pub device_flags: Option<u8>,
    /// Lines the reader thread could not parse as SLCAN since the channel
    /// was initialized.
    pub protocol_error_count: u64,
    /// Times a device reply overwrote a previous, uncollected reply in the
    /// command slot since the channel was initialized.
    pub reply_collision_count: u64,
}

struct Inner {
    state: State,
    mode: Mode,
    opmode: OpMode,
    reader: Option<ReaderTask>,
    port_error: Option<String>,
}

/// A single SLCAN channel over one serial port.
///
/// All operations besides construction and [`Channel::signal`] take an
/// internal command lock, so at most one command/reply exchange is ever in
/// flight; the reader thread keeps draining frames into the receive queue
/// independently of that lock.
pub struct Channel {
    transport: Arc<Mutex<Box<dyn SerialTransport>>>,
    command_lock: Mutex<()>,
    replies: Arc<WaitableSlot<CommandReply>>,
    frames: Arc<ReceiveQueue<CanFrame>>,
    inner: Mutex<Inner>,
    timestamping_enabled: AtomicBool,
    filter_std: Mutex<AcceptanceFilter>,
    filter_xtd: Mutex<AcceptanceFilter>,
}

impl Channel {
    /// Wraps an already-open serial port. The channel starts `Closed`; call
    /// [`Channel::initialize`] to proceed.
    pub fn new(transport: Box<dyn SerialTransport>) -> Channel {
        Channel {
            transport: Arc::new(Mutex::new(transport)),
            command_lock: Mutex::new(()),
            replies: Arc::new(WaitableSlot::new()),
            frames: Arc::new(ReceiveQueue::new(DEFAULT_QUEUE_CAPACITY)),
            inner: Mutex::new(Inner {
                state: State::Closed,
                mode: Mode::Normal,
                opmode: OpMode::default(),
                reader: None,
                port_error: None,
            }),
            timestamping_enabled: AtomicBool::new(false),
            filter_std: Mutex::new(AcceptanceFilter::default()),
            filter_xtd: Mutex::new(AcceptanceFilter::default()),
        }
    }

    /// Moves the channel from `Closed` to `Initialized`: starts the reader
    /// thread and records the requested operating-mode flags. The device is
    /// left closed (not transmitting or receiving) until [`Channel::start`]
    /// negotiates a bit rate.
    pub fn initialize(&self, opmode: OpMode) -> Result<()> {
        if opmode.fd {
            return Err(Error::IllegalArgument);
        }
        let mut inner = self.inner.lock().unwrap();
        if inner.state != State::Closed {
            return Err(Error::WrongState);
        }
        self.check_port_error(&inner)?;

        let reader = ReaderTask::spawn(
            Arc::clone(&self.transport),
            Arc::clone(&self.replies),
            Arc::clone(&self.frames),
            self.timestamping_enabled.load(Ordering::Relaxed),
        );
        inner.reader = Some(reader);
        inner.opmode = opmode;
        inner.mode = if opmode.monitor {
            Mode::ListenOnly
        } else {
            Mode::Normal
        };
        inner.state = State::Initialized;
        info!("slcan channel initialized, monitor={}", opmode.monitor);
        Ok(())
    }

    /// Moves the channel from `Initialized` to `Running`: negotiates the
    /// nominal bit rate and opens the device in the mode recorded by
    /// [`Channel::initialize`]. Both commands are sent and acknowledged
    /// before the channel is considered `Running`; a NAK to either leaves
    /// the channel in `Initialized`.
    pub fn start(&self, bitrate: BitrateIndex) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.state != State::Initialized {
            return Err(Error::WrongState);
        }
        self.check_port_error(&inner)?;

        self.exchange(codec::encode_set_bitrate(bitrate))?;
        let command = match inner.mode {
            Mode::Normal => codec::encode_open(),
            Mode::ListenOnly => codec::encode_open_listen_only(),
        };
        self.exchange(command)?;
        inner.state = State::Running;
        info!(
            "slcan channel running at {} bit/s",
            bitrate.bits_per_second()
        );
        Ok(())
    }

    /// Moves the channel from `Running` back to `Initialized`, closing the
    /// device and discarding any frames left in the receive queue.
    pub fn reset(&self) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.state != State::Running {
            return Err(Error::WrongState);
        }
        self.check_port_error(&inner)?;

        self.exchange(codec::encode_close())?;
        inner.state = State::Initialized;
        self.frames.clear();
        Ok(())
    }

    /// Transmits a frame. Only legal while `Running` and not in
    /// [`OpMode::monitor`] mode. Rejected with [`Error::IllegalArgument`] if
    /// the frame's kind was excluded by [`OpMode::no_xtd`]/[`OpMode::no_rtr`]
    /// at [`Channel::initialize`] time.
    pub fn write(&self, frame: &CanFrame) -> Result<()> {
        let inner = self.inner.lock().unwrap();
        if inner.state != State::Running {
            return Err(Error::WrongState);
        }
        if inner.mode == Mode::ListenOnly {
            return Err(Error::WrongState);
        }
        if inner.opmode.no_xtd && frame.is_extended() {
            return Err(Error::IllegalArgument);
        }
        if inner.opmode.no_rtr && frame.is_remote() {
            return Err(Error::IllegalArgument);
        }
        self.check_port_error(&inner)?;
        drop(inner);

        let bytes = codec::encode_frame(frame).map_err(|err| match err {
            CodecError::InvalidFrame(_)
            | CodecError::DlcOutOfRange(_)
            | CodecError::StandardIdOutOfRange(_)
            | CodecError::ExtendedIdOutOfRange(_) => Error::IllegalFrame,
            _ => Error::IllegalFrame,
        })?;
        match self.exchange(bytes) {
            Ok(()) => Ok(()),
            Err(Error::ProtocolError) => Err(Error::TransmitterBusy),
            Err(other) => Err(other),
        }
    }

    /// Receives the oldest queued frame, waiting up to `timeout`.
    pub fn read(&self, timeout: Timeout) -> Result<CanFrame> {
        {
            let inner = self.inner.lock().unwrap();
            if inner.state != State::Running {
                return Err(Error::WrongState);
            }
            self.check_port_error(&inner)?;
        }
        match self.frames.pop(timeout) {
            Some(frame) => Ok(frame),
            None if timeout == Timeout::Poll => Err(Error::ReceiverEmpty),
            // `ReceiveQueue::pop` does not distinguish a timeout from an
            // explicit `signal()`; both read as "nothing arrived in time".
            None => Err(Error::Timeout),
        }
    }

    /// Reports latched/queried status. Queries the device's `F` register
    /// only while `Running`; reports queue/port status regardless of state.
    pub fn status(&self) -> Result<ChannelStatus> {
        let inner = self.inner.lock().unwrap();
        let port_error = inner.port_error.is_some();
        let protocol_error_count = inner
            .reader
            .as_ref()
            .map(ReaderTask::protocol_error_count)
            .unwrap_or(0);
        let reply_collision_count = inner
            .reader
            .as_ref()
            .map(ReaderTask::reply_collision_count)
            .unwrap_or(0);
        let queue_overrun = self.frames.take_overrun();
        let reset = inner.state != State::Running;

        let device_flags = if inner.state == State::Running && !port_error {
            drop(inner);
            match self.exchange_status() {
                Ok(flags) => Some(flags),
                Err(_) => None,
            }
        } else {
            None
        };

        let bits = device_flags.unwrap_or(0);
        Ok(ChannelStatus {
            queue_overrun: queue_overrun || bits & status_bits::QUEUE_OVERRUN != 0,
            bus_off: bits & status_bits::BUS_OFF != 0,
            warning_level: bits & status_bits::WARNING_LEVEL != 0,
            bus_error: bits & status_bits::BUS_ERROR != 0,
            transmitter_busy: bits & status_bits::TRANSMITTER_BUSY != 0,
            message_lost: bits & status_bits::MESSAGE_LOST != 0,
            reset,
            port_error,
            device_flags,
            protocol_error_count,
            reply_collision_count,
        })
    }

    /// Queries the device's hardware/firmware version string (`V`).
    /// Legal once the port is open, i.e. `Initialized` or `Running`.
    pub fn query_version(&self) -> Result<String> {
        self.query_text(codec::encode_query_version())
    }

    /// Queries the device's serial number string (`N`).
    /// Legal once the port is open, i.e. `Initialized` or `Running`.
    pub fn query_serial(&self) -> Result<String> {
        self.query_text(codec::encode_query_serial())
    }

    fn query_text(&self, command: Vec<u8>) -> Result<String> {
        {
            let inner = self.inner.lock().unwrap();
            if inner.state == State::Closed {
                return Err(Error::WrongState);
            }
            self.check_port_error(&inner)?;
        }
        let _guard = self.command_lock.lock().unwrap();
        self.replies.clear();
        self.write_bytes(&command)?;
        match self.replies.get(Timeout::Millis(DEFAULT_COMMAND_TIMEOUT_MS)) {
            Ok(CommandReply::Text(text)) => Ok(text),
            Ok(_) => Err(Error::ProtocolError),
            Err(SlotError::TimedOut) => Err(Error::Timeout),
            Err(SlotError::Cancelled) => Err(Error::Cancelled),
            Err(_) => Err(Error::ProtocolError),
        }
    }

    /// Programs the 11-bit acceptance filter. Only legal while `Initialized`,
    /// matching devices that require filters to be set before `O`/`L`.
    pub fn set_filter_std(&self, code: u16, mask: u16) -> Result<()> {
        let inner = self.inner.lock().unwrap();
        if inner.state != State::Initialized {
            return Err(Error::WrongState);
        }
        self.check_port_error(&inner)?;
        drop(inner);
        self.exchange(codec::encode_set_filter_std(code, mask))?;
        *self.filter_std.lock().unwrap() = AcceptanceFilter::new(code as u32, mask as u32);
        Ok(())
    }

    /// Programs the 29-bit acceptance filter. Only legal while `Initialized`.
    pub fn set_filter_xtd(&self, code: u32, mask: u32) -> Result<()> {
        let inner = self.inner.lock().unwrap();
        if inner.state != State::Initialized {
            return Err(Error::WrongState);
        }
        self.check_port_error(&inner)?;
        drop(inner);
        self.exchange(codec::encode_set_filter_xtd(code, mask))?;
        *self.filter_xtd.lock().unwrap() = AcceptanceFilter::new(code, mask);
        Ok(())
    }

    /// The acceptance filter currently programmed for standard identifiers.
    pub fn filter_std(&self) -> AcceptanceFilter {
        *self.filter_std.lock().unwrap()
    }

    /// The acceptance filter currently programmed for extended identifiers.
    pub fn filter_xtd(&self) -> AcceptanceFilter {
        *self.filter_xtd.lock().unwrap()
    }

    /// Enables or disables the millisecond time-stamp suffix the reader
    /// folds into each frame's time-stamp. Only legal while `Initialized`.
    pub fn set_timestamping(&self, enable: bool) -> Result<()> {
        let inner = self.inner.lock().unwrap();
        if inner.state != State::Initialized {
            return Err(Error::WrongState);
        }
        self.check_port_error(&inner)?;
        drop(inner);
        self.exchange(codec::encode_set_timestamping(enable))?;
        self.timestamping_enabled.store(enable, Ordering::Relaxed);
        Ok(())
    }

    /// Unblocks any thread currently inside [`Channel::read`] or a command
    /// exchange, which then observes [`Error::Cancelled`].
    pub fn signal(&self) {
        self.replies.signal();
        self.frames.signal();
    }

    /// Tears the channel down unconditionally: stops the reader thread and
    /// returns to `Closed`. Idempotent; called automatically on drop.
    pub fn teardown(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.reader = None;
        inner.state = State::Closed;
        self.replies.destroy();
    }

    fn check_port_error(&self, inner: &Inner) -> Result<()> {
        match &inner.port_error {
            Some(_) => Err(Error::PortError(std::io::Error::new(
                std::io::ErrorKind::Other,
                "serial port previously failed",
            ))),
            None => Ok(()),
        }
    }

    /// Writes one command line and waits for its ack/nak, serialized by the
    /// command lock so the reply slot is never contended.
    fn exchange(&self, bytes: Vec<u8>) -> Result<()> {
        let _guard = self.command_lock.lock().unwrap();
        self.replies.clear();
        self.write_bytes(&bytes)?;
        match self.replies.get(Timeout::Millis(DEFAULT_COMMAND_TIMEOUT_MS)) {
            Ok(CommandReply::Ack) => Ok(()),
            Ok(CommandReply::Nak) => Err(Error::ProtocolError),
            Ok(_) => Err(Error::ProtocolError),
            Err(SlotError::TimedOut) => Err(Error::Timeout),
            Err(SlotError::Cancelled) => Err(Error::Cancelled),
            Err(SlotError::Busy) | Err(SlotError::Empty) => Err(Error::ProtocolError),
        }
    }

    fn exchange_status(&self) -> Result<u8> {
        let _guard = self.command_lock.lock().unwrap();
        self.replies.clear();
        self.write_bytes(&codec::encode_query_status())?;
        match self.replies.get(Timeout::Millis(DEFAULT_COMMAND_TIMEOUT_MS)) {
            Ok(CommandReply::Status(flags)) => Ok(flags),
            Ok(_) => Err(Error::ProtocolError),
            Err(SlotError::TimedOut) => Err(Error::Timeout),
            Err(SlotError::Cancelled) => Err(Error::Cancelled),
            Err(_) => Err(Error::ProtocolError),
        }
    }

    fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        let mut transport = self.transport.lock().unwrap();
        if let Err(err) = transport.write_all(bytes) {
            drop(transport);
            let mut inner = self.inner.lock().unwrap();
            inner.port_error = Some(err.to_string());
            if inner.state == State::Running {
                inner.state = State::Initialized;
            }
            warn!("slcan channel: serial write failed: {err}");
            return Err(Error::PortError(err));
        }
        Ok(())
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numerics::BitrateIndex;
    use crate::serial::mock::{MockTransport, SharedMock};
    use embedded_can::StandardId;
    use std::thread;
    use std::time::Duration as StdDuration;

    fn channel_with_queued_replies(replies: &[u8]) -> Channel {
        let mut transport = MockTransport::new();
        transport.queue_inbound(replies);
        Channel::new(Box::new(transport))
    }

    fn listen_only() -> OpMode {
        OpMode {
            monitor: true,
            ..OpMode::default()
        }
    }

    #[test]
    fn initialize_then_start_reaches_running() {
        let channel = channel_with_queued_replies(b"\r\r");
        channel.initialize(OpMode::default()).unwrap();
        channel.start(BitrateIndex::Index500Kbps).unwrap();
    }

    #[test]
    fn write_before_running_is_wrong_state() {
        let channel = channel_with_queued_replies(b"");
        let frame = CanFrame::new_data(StandardId::new(0x100).unwrap(), &[1, 2]).unwrap();
        assert!(matches!(channel.write(&frame), Err(Error::WrongState)));
    }

    #[test]
    fn write_in_listen_only_mode_is_wrong_state() {
        let channel = channel_with_queued_replies(b"\r\r");
        channel.initialize(listen_only()).unwrap();
        channel.start(BitrateIndex::Index500Kbps).unwrap();
        let frame = CanFrame::new_data(StandardId::new(0x100).unwrap(), &[1, 2]).unwrap();
        assert!(matches!(channel.write(&frame), Err(Error::WrongState)));
    }

    #[test]
    fn fd_opmode_is_rejected() {
        let channel = channel_with_queued_replies(b"");
        let opmode = OpMode {
            fd: true,
            ..OpMode::default()
        };
        assert!(matches!(
            channel.initialize(opmode),
            Err(Error::IllegalArgument)
        ));
    }

    #[test]
    fn no_xtd_rejects_extended_frames_at_write_time() {
        let channel = channel_with_queued_replies(b"\r\r");
        let opmode = OpMode {
            no_xtd: true,
            ..OpMode::default()
        };
        channel.initialize(opmode).unwrap();
        channel.start(BitrateIndex::Index500Kbps).unwrap();
        let frame = CanFrame::new_data(
            embedded_can::ExtendedId::new(0x1_0000).unwrap(),
            &[1, 2],
        )
        .unwrap();
        assert!(matches!(
            channel.write(&frame),
            Err(Error::IllegalArgument)
        ));
    }

    #[test]
    fn query_version_returns_the_device_text_reply() {
        let channel = channel_with_queued_replies(b"V1234\r");
        channel.initialize(OpMode::default()).unwrap();
        let version = channel.query_version().unwrap();
        assert_eq!(version, "1234");
    }

    #[test]
    fn write_acked_by_device_succeeds() {
        let channel = channel_with_queued_replies(b"\r\rz\r");
        channel.initialize(OpMode::default()).unwrap();
        channel.start(BitrateIndex::Index500Kbps).unwrap();
        let frame = CanFrame::new_data(StandardId::new(0x100).unwrap(), &[1, 2]).unwrap();
        channel.write(&frame).unwrap();
    }

    #[test]
    fn write_of_extended_frame_is_acked_with_capital_z() {
        let channel = channel_with_queued_replies(b"\r\rZ\r");
        channel.initialize(OpMode::default()).unwrap();
        channel.start(BitrateIndex::Index500Kbps).unwrap();
        let frame = CanFrame::new_data(
            embedded_can::ExtendedId::new(0x1_0000).unwrap(),
            &[1, 2],
        )
        .unwrap();
        channel.write(&frame).unwrap();
    }

    #[test]
    fn nak_on_write_reports_transmitter_busy() {
        let channel = channel_with_queued_replies(b"\r\r\x07");
        channel.initialize(OpMode::default()).unwrap();
        channel.start(BitrateIndex::Index500Kbps).unwrap();
        let frame = CanFrame::new_data(StandardId::new(0x100).unwrap(), &[1, 2]).unwrap();
        assert!(matches!(channel.write(&frame), Err(Error::TransmitterBusy)));
    }

    #[test]
    fn read_returns_frames_the_reader_decoded() {
        let channel = channel_with_queued_replies(b"\r\rt1002AABB\r");
        channel.initialize(OpMode::default()).unwrap();
        channel.start(BitrateIndex::Index500Kbps).unwrap();
        let frame = channel.read(Timeout::Millis(500)).unwrap();
        assert_eq!(frame.raw_id(), 0x100);
    }

    #[test]
    fn signal_cancels_a_pending_command() {
        let channel = Arc::new(channel_with_queued_replies(b""));
        channel.initialize(OpMode::default()).unwrap();
        let waiter = {
            let channel = Arc::clone(&channel);
            thread::spawn(move || channel.start(BitrateIndex::Index10Kbps))
        };
        thread::sleep(StdDuration::from_millis(50));
        channel.signal();
        let result = waiter.join().unwrap();
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[test]
    fn reset_clears_the_receive_queue() {
        let channel = channel_with_queued_replies(b"\r\rt1002AABB\r\r");
        channel.initialize(OpMode::default()).unwrap();
        channel.start(BitrateIndex::Index500Kbps).unwrap();
        thread::sleep(StdDuration::from_millis(100));
        channel.reset().unwrap();
        assert!(matches!(channel.read(Timeout::Poll), Err(Error::WrongState)));
    }

    #[test]
    fn port_error_on_write_transitions_back_to_initialized() {
        let mock = SharedMock::new();
        mock.queue_inbound(b"\r\r");
        let channel = Channel::new(Box::new(mock.clone()));
        channel.initialize(OpMode::default()).unwrap();
        channel.start(BitrateIndex::Index500Kbps).unwrap();

        mock.set_fail_writes(true);
        let frame = CanFrame::new_data(StandardId::new(0x100).unwrap(), &[1, 2]).unwrap();
        assert!(matches!(channel.write(&frame), Err(Error::PortError(_))));

        // The channel fell back to `Initialized`, so `read` now reports
        // `WrongState` instead of retrying against the dead port.
        assert!(matches!(channel.read(Timeout::Poll), Err(Error::WrongState)));
    }

    /// Reproduces the bitrate-select/open handshake as a single combined
    /// exchange: the driver writes `S5\rL\r` in one `start()` call and the
    /// device acks both commands before the channel reaches `Running`.
    #[test]
    fn start_sends_bitrate_and_open_together() {
        let mock = SharedMock::new();
        mock.queue_inbound(b"\r\r");
        let channel = Channel::new(Box::new(mock.clone()));

        channel.initialize(listen_only()).unwrap();
        channel.start(BitrateIndex::Index250Kbps).unwrap();

        assert_eq!(mock.outbound(), b"S5\rL\r");
    }
}
