//! Lookup tables and small pure conversions shared by the codec, the
//! channel state machine and the formatter: DLC↔length, bit-rate index to
//! SLCAN selector, and acceptance-filter matching.

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// One of the nine predefined CiA/CANopen nominal bit rates, mapped to the
/// SLCAN `S0`..`S8` selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum BitrateIndex {
    Index10Kbps = 0,
    Index20Kbps = 1,
    Index50Kbps = 2,
    Index100Kbps = 3,
    Index125Kbps = 4,
    Index250Kbps = 5,
    Index500Kbps = 6,
    Index800Kbps = 7,
    Index1000Kbps = 8,
}

impl BitrateIndex {
    /// The ASCII digit SLCAN expects after the `S` command byte.
    pub fn slcan_digit(&self) -> u8 {
        b'0' + u8::from(*self)
    }

    /// Nominal bit rate in bits per second, for documentation/diagnostics.
    pub fn bits_per_second(&self) -> u32 {
        match self {
            BitrateIndex::Index10Kbps => 10_000,
            BitrateIndex::Index20Kbps => 20_000,
            BitrateIndex::Index50Kbps => 50_000,
            BitrateIndex::Index100Kbps => 100_000,
            BitrateIndex::Index125Kbps => 125_000,
            BitrateIndex::Index250Kbps => 250_000,
            BitrateIndex::Index500Kbps => 500_000,
            BitrateIndex::Index800Kbps => 800_000,
            BitrateIndex::Index1000Kbps => 1_000_000,
        }
    }
}

/// Maps a Classical CAN DLC (`0..=8`) to a payload length in bytes. For
/// Classical CAN this is the identity, but the table mirrors the original
/// driver's `DLC2LEN` so a CAN FD variant could extend it later.
pub fn dlc_to_len(dlc: u8) -> usize {
    (dlc.min(8)) as usize
}

/// Maps a payload length (`0..=8`) back to a DLC. Lengths above 8 saturate.
pub fn len_to_dlc(len: usize) -> u8 {
    len.min(8) as u8
}

/// `(code, mask)` acceptance filter for one identifier width.
///
/// A frame identifier `id` passes the filter when
/// `(id ^ code) & mask == 0`. The default `mask == 0` accepts everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcceptanceFilter {
    code: u32,
    mask: u32,
}

impl AcceptanceFilter {
    /// A filter that accepts every identifier.
    pub const fn accept_all() -> Self {
        AcceptanceFilter { code: 0, mask: 0 }
    }

    pub fn new(code: u32, mask: u32) -> Self {
        AcceptanceFilter { code, mask }
    }

    pub fn code(&self) -> u32 {
        self.code
    }

    pub fn mask(&self) -> u32 {
        self.mask
    }

    pub fn matches(&self, id: u32) -> bool {
        (id ^ self.code) & self.mask == 0
    }
}

impl Default for AcceptanceFilter {
    fn default() -> Self {
        Self::accept_all()
    }
}
