//! The caller-visible error kinds enumerated in the channel contract.
//!
//! `QueueOverrun` is deliberately absent here: it is a latching status bit
//! observed through [`Channel::status`](crate::channel::Channel::status),
//! not a value any operation returns.

use std::io;

/// Errors returned by [`Channel`](crate::channel::Channel) operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed input: an identifier out of range, an option value outside
    /// its enumerated domain, and the like.
    #[error("illegal argument")]
    IllegalArgument,

    /// The operation is not legal in the channel's current state.
    #[error("operation not allowed in the current channel state")]
    WrongState,

    /// The encoder rejected the frame (DLC > 8, or an identifier that does
    /// not fit its standard/extended width).
    #[error("frame cannot be legally encoded as SLCAN")]
    IllegalFrame,

    /// The underlying serial I/O failed. Fatal for the channel: it drops
    /// back to `Initialized` with a sticky error bit.
    #[error("serial port error: {0}")]
    PortError(#[source] io::Error),

    /// The device replied with an unexpected NAK, or sent bytes that do not
    /// match the SLCAN grammar at a point where a reply was expected.
    #[error("protocol error: unexpected device reply")]
    ProtocolError,

    /// The device reported its transmit buffer full; the caller may retry.
    #[error("transmitter busy")]
    TransmitterBusy,

    /// The deadline elapsed waiting for a command reply or a received frame.
    #[error("operation timed out")]
    Timeout,

    /// A non-blocking `read` found no frame waiting in the receive queue.
    #[error("receive queue is empty")]
    ReceiverEmpty,

    /// The operation was unblocked by [`Channel::signal`](crate::channel::Channel::signal)
    /// rather than completing normally.
    #[error("operation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;
