use embedded_can::Id;

/// Maximum number of data bytes carried by a Classical CAN frame.
pub const MAX_DATA_LENGTH: usize = 8;

/// A monotonic time-stamp with nanosecond resolution, expressed as a
/// `(seconds, nanoseconds)` pair relative to an unspecified epoch.
///
/// The epoch only needs to be consistent across frames delivered on the
/// same [`Channel`](crate::channel::Channel); callers should not assume it
/// lines up with wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct CanTimestamp {
    pub secs: u64,
    pub nanos: u32,
}

impl CanTimestamp {
    pub const ZERO: CanTimestamp = CanTimestamp { secs: 0, nanos: 0 };

    pub fn new(secs: u64, nanos: u32) -> Self {
        CanTimestamp { secs, nanos }
    }

    /// Returns `self - other`, saturating at zero rather than going negative.
    pub fn saturating_sub(&self, other: CanTimestamp) -> CanTimestamp {
        if *self < other {
            return CanTimestamp::ZERO;
        }
        let mut secs = self.secs - other.secs;
        let nanos = if self.nanos < other.nanos {
            secs -= 1;
            self.nanos + 1_000_000_000 - other.nanos
        } else {
            self.nanos - other.nanos
        };
        CanTimestamp { secs, nanos }
    }
}

/// Errors returned while constructing or validating a [`CanFrame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// `dlc` was greater than 8, the highest Classical CAN data length code.
    #[error("DLC {0} exceeds the Classical CAN maximum of 8")]
    DlcOutOfRange(u8),
    /// A remote-transmission-request frame was constructed with payload bytes.
    #[error("RTR frames cannot carry data")]
    RemoteFrameWithData,
}

/// A single CAN Classic message together with the meta-data the SLCAN
/// protocol can express for it.
///
/// Identifiers are modeled with [`embedded_can::Id`], which already enforces
/// the 11-bit/29-bit range split between [`StandardId`] and [`ExtendedId`];
/// `ext` is therefore derived from the identifier rather than stored
/// separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanFrame {
    id: Id,
    rtr: bool,
    err: bool,
    dlc: u8,
    data: [u8; MAX_DATA_LENGTH],
    timestamp: CanTimestamp,
}

impl CanFrame {
    /// Creates a new data frame. `data.len()` must be `0..=8`.
    pub fn new_data(id: impl Into<Id>, data: &[u8]) -> Result<Self, FrameError> {
        if data.len() > MAX_DATA_LENGTH {
            return Err(FrameError::DlcOutOfRange(data.len() as u8));
        }
        let mut copy = [0u8; MAX_DATA_LENGTH];
        copy[..data.len()].copy_from_slice(data);
        Ok(CanFrame {
            id: id.into(),
            rtr: false,
            err: false,
            dlc: data.len() as u8,
            data: copy,
            timestamp: CanTimestamp::ZERO,
        })
    }

    /// Creates a new remote-transmission-request frame. `dlc` must be `0..=8`.
    pub fn new_remote(id: impl Into<Id>, dlc: u8) -> Result<Self, FrameError> {
        if dlc > MAX_DATA_LENGTH as u8 {
            return Err(FrameError::DlcOutOfRange(dlc));
        }
        Ok(CanFrame {
            id: id.into(),
            rtr: true,
            err: false,
            dlc,
            data: [0u8; MAX_DATA_LENGTH],
            timestamp: CanTimestamp::ZERO,
        })
    }

    /// Constructs an error frame: surfaces a bus/protocol condition rather
    /// than a message a node put on the bus. Carries no payload.
    pub fn new_error(id: impl Into<Id>) -> Self {
        CanFrame {
            id: id.into(),
            rtr: false,
            err: true,
            dlc: 0,
            data: [0u8; MAX_DATA_LENGTH],
            timestamp: CanTimestamp::ZERO,
        }
    }

    pub fn with_timestamp(mut self, timestamp: CanTimestamp) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn is_extended(&self) -> bool {
        matches!(self.id, Id::Extended(_))
    }

    pub fn is_remote(&self) -> bool {
        self.rtr
    }

    pub fn is_error_frame(&self) -> bool {
        self.err
    }

    /// Raw data-length code, `0..=8` for Classical CAN.
    pub fn dlc(&self) -> u8 {
        self.dlc
    }

    /// Payload bytes. Empty for RTR and error frames.
    pub fn data(&self) -> &[u8] {
        if self.rtr {
            &[]
        } else {
            &self.data[..self.dlc as usize]
        }
    }

    pub fn timestamp(&self) -> CanTimestamp {
        self.timestamp
    }

    pub fn set_timestamp(&mut self, timestamp: CanTimestamp) {
        self.timestamp = timestamp;
    }

    /// Raw 32-bit identifier value, irrespective of standard/extended framing.
    pub fn raw_id(&self) -> u32 {
        match self.id {
            Id::Standard(id) => id.as_raw() as u32,
            Id::Extended(id) => id.as_raw(),
        }
    }
}

/// Highest 11-bit (standard) CAN identifier.
pub const CAN_MAX_STD_ID: u32 = 0x7FF;
/// Highest 29-bit (extended) CAN identifier.
pub const CAN_MAX_XTD_ID: u32 = 0x1FFF_FFFF;
