//! A Lawicel/SLCAN-compatible CAN-over-serial-line driver for Rust.
//!
//! This crate speaks the ASCII SLCAN line protocol used by CANable-class USB
//! adapters over a plain serial port, and exposes it as a small synchronous
//! channel state machine: `Closed` → `Initialized` → `Running`, with a
//! background thread draining received frames into a bounded queue so
//! [`Channel::read`] never has to interleave with the wire itself.
//!
//! Only Classical CAN is supported; see [`Channel`] for the full operation
//! set.
//!
//! ## Usage
//!
//! ```no_run
//! use embedded_can::StandardId;
//! use serialport::TTYPort;
//! use slcan::{Channel, CanFrame, BitrateIndex, OpMode};
//! use slcan::slot::Timeout;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let port = TTYPort::open(&serialport::new("/dev/ttyUSB0", 115_200))?;
//! let channel = Channel::new(Box::new(port));
//!
//! channel.initialize(OpMode::default())?;
//! channel.start(BitrateIndex::Index500Kbps)?;
//!
//! let frame = CanFrame::new_data(StandardId::new(0x100).unwrap(), &[1, 2, 3])?;
//! channel.write(&frame)?;
//!
//! match channel.read(Timeout::Millis(1000)) {
//!     Ok(frame) => println!("{:?}", frame),
//!     Err(e) => eprintln!("{:?}", e),
//! }
//! # Ok(())
//! # }
//! ```

pub use embedded_can::{ExtendedId, Id, StandardId};

pub mod channel;
pub mod codec;
pub mod error;
pub mod formatter;
pub mod frame;
pub mod numerics;
pub mod queue;
pub mod reader;
pub mod serial;
pub mod slot;

pub use channel::{Channel, ChannelStatus, OpMode};
pub use error::{Error, Result};
pub use formatter::{
    DlcBrackets, Formatter, FormatterConfig, NumberBase, Separator, TimeLayout, TimestampMode,
};
pub use frame::{CanFrame, CanTimestamp, FrameError};
pub use numerics::{AcceptanceFilter, BitrateIndex};
