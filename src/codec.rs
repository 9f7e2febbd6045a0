//! SLCAN (Lawicel) ASCII line codec.
//!
//! Purely functional translation between SLCAN wire bytes and in-memory
//! [`CanFrame`]s / device replies. No I/O, no hidden state beyond what is
//! passed in: a truncated line simply yields [`CodecError::NeedMoreBytes`]
//! and the caller is expected to feed more bytes and try again, which makes
//! the codec safe to call repeatedly against a growing read buffer (see
//! [`crate::reader::ReaderTask`]).

use embedded_can::{ExtendedId, Id, StandardId};

use crate::frame::{CanFrame, FrameError, CAN_MAX_STD_ID, CAN_MAX_XTD_ID};
use crate::numerics::BitrateIndex;

/// Errors produced while decoding or encoding a single SLCAN line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// No line terminator (`\r` or `\a`) found yet; feed more bytes.
    #[error("line not yet terminated")]
    NeedMoreBytes,
    /// The first byte of the line did not match any known command/frame kind.
    #[error("unrecognized message kind {0:#04x}")]
    UnrecognizedMessage(u8),
    /// The line was shorter than its kind requires.
    #[error("message too short")]
    TooShort,
    /// A byte expected to be a hex digit was not one.
    #[error("illegal hex digit {0:#04x}")]
    IllegalHexDigit(u8),
    /// A byte expected to be a decimal digit was not one.
    #[error("illegal decimal digit {0:#04x}")]
    IllegalDecimalDigit(u8),
    /// DLC exceeded the Classical CAN maximum of 8.
    #[error("DLC {0} exceeds the Classical CAN maximum of 8")]
    DlcOutOfRange(u8),
    /// Standard identifier decoded outside `0..=0x7FF`.
    #[error("standard id {0:#05x} out of range")]
    StandardIdOutOfRange(u32),
    /// Extended identifier decoded outside `0..=0x1FFFFFFF`.
    #[error("extended id {0:#010x} out of range")]
    ExtendedIdOutOfRange(u32),
    /// Bytes remained after the frame's data and optional timestamp field.
    #[error("{0} unexpected trailing byte(s)")]
    TrailingBytes(usize),
    /// The frame cannot be represented as a valid SLCAN line.
    #[error("frame cannot be legally encoded: {0}")]
    InvalidFrame(#[from] FrameError),
}

/// One decoded SLCAN line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineMessage {
    /// A `t`/`T`/`r`/`R` data or remote frame, with its optional raw
    /// millisecond time-stamp suffix (`Z1` devices only).
    Frame {
        frame: CanFrame,
        timestamp_ms: Option<u16>,
    },
    /// A bare `\r`, or a `z`/`Z` reply: the device acknowledged the last
    /// command (`z`/`Z` specifically acknowledge a standard/extended
    /// `write`).
    Ack,
    /// A bare `\a` (BEL): the device rejected the last command.
    Nak,
    /// A `V`/`v`/`N` text reply.
    Text(String),
    /// An `F<hex>` status flags reply.
    StatusFlags(u8),
}

/// Scans `buf` for one complete SLCAN line and decodes it.
///
/// Returns `(message, consumed)` where `consumed` is the number of bytes
/// making up the line, including its terminator; the caller drains that
/// many bytes before calling again. On [`CodecError::NeedMoreBytes`] no
/// bytes should be consumed: the same buffer, with more data appended,
/// should be retried.
pub fn decode_next(buf: &[u8]) -> Result<(LineMessage, usize), CodecError> {
    let terminator_pos = buf.iter().position(|&b| b == b'\r' || b == 0x07);
    let Some(pos) = terminator_pos else {
        return Err(CodecError::NeedMoreBytes);
    };
    let consumed = pos + 1;
    if buf[pos] == 0x07 {
        return Ok((LineMessage::Nak, consumed));
    }
    let content = &buf[..pos];
    if content.is_empty() {
        return Ok((LineMessage::Ack, consumed));
    }
    let message = decode_content(content)?;
    Ok((message, consumed))
}

fn decode_content(content: &[u8]) -> Result<LineMessage, CodecError> {
    match content[0] {
        b't' => decode_frame(&content[1..], false, false).map(wrap_frame),
        b'T' => decode_frame(&content[1..], true, false).map(wrap_frame),
        b'r' => decode_frame(&content[1..], false, true).map(wrap_frame),
        b'R' => decode_frame(&content[1..], true, true).map(wrap_frame),
        b'F' => decode_status(&content[1..]),
        b'V' | b'v' | b'N' => Ok(LineMessage::Text(
            String::from_utf8_lossy(&content[1..]).into_owned(),
        )),
        b'z' | b'Z' if content.len() == 1 => Ok(LineMessage::Ack),
        other => Err(CodecError::UnrecognizedMessage(other)),
    }
}

fn wrap_frame((frame, timestamp_ms): (CanFrame, Option<u16>)) -> LineMessage {
    LineMessage::Frame {
        frame,
        timestamp_ms,
    }
}

fn decode_frame(
    fields: &[u8],
    extended: bool,
    remote: bool,
) -> Result<(CanFrame, Option<u16>), CodecError> {
    let id_width = if extended { 8 } else { 3 };
    if fields.len() < id_width + 1 {
        return Err(CodecError::TooShort);
    }
    let raw_id = hex_value(&fields[..id_width])?;
    let id = if extended {
        if raw_id > CAN_MAX_XTD_ID {
            return Err(CodecError::ExtendedIdOutOfRange(raw_id));
        }
        Id::Extended(ExtendedId::new(raw_id).ok_or(CodecError::ExtendedIdOutOfRange(raw_id))?)
    } else {
        if raw_id > CAN_MAX_STD_ID {
            return Err(CodecError::StandardIdOutOfRange(raw_id));
        }
        Id::Standard(
            StandardId::new(raw_id as u16).ok_or(CodecError::StandardIdOutOfRange(raw_id))?,
        )
    };
    let dlc = dec_digit(fields[id_width])?;
    if dlc > 8 {
        return Err(CodecError::DlcOutOfRange(dlc));
    }
    let rest = &fields[id_width + 1..];

    let (frame, timestamp_field) = if remote {
        (CanFrame::new_remote(id, dlc)?, rest)
    } else {
        let data_len = dlc as usize * 2;
        if rest.len() < data_len {
            return Err(CodecError::TooShort);
        }
        let data = hex_bytes(&rest[..data_len])?;
        (CanFrame::new_data(id, &data)?, &rest[data_len..])
    };

    let timestamp_ms = match timestamp_field.len() {
        0 => None,
        4 => Some(hex_value(timestamp_field)? as u16),
        n => return Err(CodecError::TrailingBytes(n)),
    };
    Ok((frame, timestamp_ms))
}

fn decode_status(fields: &[u8]) -> Result<LineMessage, CodecError> {
    if fields.len() != 2 {
        return Err(CodecError::TooShort);
    }
    Ok(LineMessage::StatusFlags(hex_value(fields)? as u8))
}

fn hex_digit(byte: u8) -> Result<u32, CodecError> {
    match byte {
        b'0'..=b'9' => Ok((byte - b'0') as u32),
        b'a'..=b'f' => Ok((byte - b'a' + 10) as u32),
        b'A'..=b'F' => Ok((byte - b'A' + 10) as u32),
        _ => Err(CodecError::IllegalHexDigit(byte)),
    }
}

fn dec_digit(byte: u8) -> Result<u8, CodecError> {
    match byte {
        b'0'..=b'9' => Ok(byte - b'0'),
        _ => Err(CodecError::IllegalDecimalDigit(byte)),
    }
}

fn hex_value(nibbles: &[u8]) -> Result<u32, CodecError> {
    let mut value = 0u32;
    for &nibble in nibbles {
        value = (value << 4) | hex_digit(nibble)?;
    }
    Ok(value)
}

fn hex_bytes(nibbles: &[u8]) -> Result<[u8; 8], CodecError> {
    let mut out = [0u8; 8];
    for (i, chunk) in nibbles.chunks(2).enumerate() {
        out[i] = ((hex_digit(chunk[0])? << 4) | hex_digit(chunk[1])?) as u8;
    }
    Ok(out)
}

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

fn push_hex_nibble(out: &mut Vec<u8>, value: u32) {
    out.push(HEX_DIGITS[(value & 0xF) as usize]);
}

fn push_hex_id(out: &mut Vec<u8>, id: Id) {
    match id {
        Id::Standard(id) => {
            let raw = id.as_raw() as u32;
            push_hex_nibble(out, raw >> 8);
            push_hex_nibble(out, raw >> 4);
            push_hex_nibble(out, raw);
        }
        Id::Extended(id) => {
            let raw = id.as_raw();
            for shift in [28, 24, 20, 16, 12, 8, 4, 0] {
                push_hex_nibble(out, raw >> shift);
            }
        }
    }
}

/// Encodes a CAN frame as the shortest legal SLCAN line, including the
/// trailing `\r`. RTR frames carry no data bytes; extended frames use the
/// capital-letter command variants.
pub fn encode_frame(frame: &CanFrame) -> Result<Vec<u8>, CodecError> {
    if frame.dlc() > 8 {
        return Err(CodecError::DlcOutOfRange(frame.dlc()));
    }
    let raw_id = frame.raw_id();
    match frame.id() {
        Id::Standard(_) if raw_id > CAN_MAX_STD_ID => {
            return Err(CodecError::StandardIdOutOfRange(raw_id))
        }
        Id::Extended(_) if raw_id > CAN_MAX_XTD_ID => {
            return Err(CodecError::ExtendedIdOutOfRange(raw_id))
        }
        _ => {}
    }
    let mut out = Vec::with_capacity(2 + 8 + 1 + 16 + 1);
    let extended = frame.is_extended();
    out.push(match (extended, frame.is_remote()) {
        (false, false) => b't',
        (true, false) => b'T',
        (false, true) => b'r',
        (true, true) => b'R',
    });
    push_hex_id(&mut out, frame.id());
    out.push(b'0' + frame.dlc());
    for &byte in frame.data() {
        push_hex_nibble(&mut out, (byte >> 4) as u32);
        push_hex_nibble(&mut out, byte as u32);
    }
    out.push(b'\r');
    Ok(out)
}

/// `S<n>\r` — select one of the nine predefined nominal bit rates.
pub fn encode_set_bitrate(index: BitrateIndex) -> Vec<u8> {
    vec![b'S', index.slcan_digit(), b'\r']
}

/// `s<BTR0><BTR1>\r` — set the raw SJA1000 bit-timing register pair
/// directly, bypassing the predefined [`BitrateIndex`] table.
pub fn encode_set_btr(btr0: u8, btr1: u8) -> Vec<u8> {
    let mut out = Vec::with_capacity(6);
    out.push(b's');
    push_hex_nibble(&mut out, (btr0 >> 4) as u32);
    push_hex_nibble(&mut out, btr0 as u32);
    push_hex_nibble(&mut out, (btr1 >> 4) as u32);
    push_hex_nibble(&mut out, btr1 as u32);
    out.push(b'\r');
    out
}

/// `O\r` — open the channel in normal (send & receive) mode.
pub fn encode_open() -> Vec<u8> {
    vec![b'O', b'\r']
}

/// `L\r` — open the channel in listen-only (monitor) mode.
pub fn encode_open_listen_only() -> Vec<u8> {
    vec![b'L', b'\r']
}

/// `C\r` — close the channel.
pub fn encode_close() -> Vec<u8> {
    vec![b'C', b'\r']
}

/// `Z0\r` / `Z1\r` — disable/enable the millisecond time-stamp suffix.
pub fn encode_set_timestamping(enable: bool) -> Vec<u8> {
    vec![b'Z', if enable { b'1' } else { b'0' }, b'\r']
}

/// `F\r` — query the status flags register.
pub fn encode_query_status() -> Vec<u8> {
    vec![b'F', b'\r']
}

/// `V\r` — query the hardware/firmware version.
pub fn encode_query_version() -> Vec<u8> {
    vec![b'V', b'\r']
}

/// `N\r` — query the device serial number.
pub fn encode_query_serial() -> Vec<u8> {
    vec![b'N', b'\r']
}

/// `M<8 hex>\r` — program the 11-bit acceptance code/mask pair.
pub fn encode_set_filter_std(code: u16, mask: u16) -> Vec<u8> {
    let mut out = Vec::with_capacity(10);
    out.push(b'M');
    for shift in [12, 8, 4, 0] {
        push_hex_nibble(&mut out, (code as u32) >> shift);
    }
    for shift in [12, 8, 4, 0] {
        push_hex_nibble(&mut out, (mask as u32) >> shift);
    }
    out.push(b'\r');
    out
}

/// `m<16 hex>\r` — program the 29-bit acceptance code/mask pair.
pub fn encode_set_filter_xtd(code: u32, mask: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(18);
    out.push(b'm');
    for shift in [28, 24, 20, 16, 12, 8, 4, 0] {
        push_hex_nibble(&mut out, code >> shift);
    }
    for shift in [28, 24, 20, 16, 12, 8, 4, 0] {
        push_hex_nibble(&mut out, mask >> shift);
    }
    out.push(b'\r');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_standard_data_frame() {
        let (msg, consumed) = decode_next(b"t1238DEADBEEF01020304\r").unwrap();
        assert_eq!(consumed, 22);
        match msg {
            LineMessage::Frame {
                frame,
                timestamp_ms,
            } => {
                assert_eq!(frame.raw_id(), 0x123);
                assert!(!frame.is_extended());
                assert!(!frame.is_remote());
                assert_eq!(frame.dlc(), 8);
                assert_eq!(
                    frame.data(),
                    &[0xDE, 0xAD, 0xBE, 0xEF, 0x01, 0x02, 0x03, 0x04]
                );
                assert_eq!(timestamp_ms, None);
            }
            _ => panic!("expected a frame"),
        }
    }

    #[test]
    fn decode_extended_rtr_frame() {
        let (msg, _) = decode_next(b"R1FFFFFFF0\r").unwrap();
        match msg {
            LineMessage::Frame {
                frame,
                timestamp_ms,
            } => {
                assert_eq!(frame.raw_id(), 0x1FFF_FFFF);
                assert!(frame.is_extended());
                assert!(frame.is_remote());
                assert_eq!(frame.dlc(), 0);
                assert!(frame.data().is_empty());
                assert_eq!(timestamp_ms, None);
            }
            _ => panic!("expected a frame"),
        }
    }

    #[test]
    fn decode_frame_with_timestamp_suffix() {
        let (msg, consumed) = decode_next(b"t0000ABCD\r").unwrap();
        assert_eq!(consumed, 10);
        match msg {
            LineMessage::Frame {
                frame,
                timestamp_ms,
            } => {
                assert_eq!(frame.dlc(), 0);
                assert_eq!(timestamp_ms, Some(0xABCD));
            }
            _ => panic!("expected a frame"),
        }
    }

    #[test]
    fn decode_bare_ack_and_nak() {
        assert_eq!(decode_next(b"\r").unwrap(), (LineMessage::Ack, 1));
        assert_eq!(decode_next(b"\x07").unwrap(), (LineMessage::Nak, 1));
    }

    #[test]
    fn decode_write_ack_for_standard_and_extended_frames() {
        assert_eq!(decode_next(b"z\r").unwrap(), (LineMessage::Ack, 2));
        assert_eq!(decode_next(b"Z\r").unwrap(), (LineMessage::Ack, 2));
    }

    #[test]
    fn encode_btr_command() {
        assert_eq!(encode_set_btr(0x03, 0x1C), b"s031C\r");
    }

    #[test]
    fn decode_status_flags() {
        let (msg, _) = decode_next(b"F0C\r").unwrap();
        assert_eq!(msg, LineMessage::StatusFlags(0x0C));
    }

    #[test]
    fn decode_needs_more_bytes_on_truncated_line() {
        assert_eq!(decode_next(b"t123"), Err(CodecError::NeedMoreBytes));
    }

    #[test]
    fn encode_standard_data_frame() {
        let frame = CanFrame::new_data(StandardId::new(0x7FF).unwrap(), &[0xAB, 0xCD]).unwrap();
        assert_eq!(encode_frame(&frame).unwrap(), b"t7FF2ABCD\r");
    }

    #[test]
    fn encode_rejects_dlc_above_eight() {
        // dlc cannot exceed 8 by construction, but decode_frame must reject
        // a device that claims dlc=9 for a classical frame.
        assert_eq!(
            decode_frame(b"1239DEADBEEF010203040A", false, false),
            Err(CodecError::DlcOutOfRange(9))
        );
    }

    #[test]
    fn round_trip_preserves_identity_fields() {
        let frame = CanFrame::new_data(StandardId::new(0x42).unwrap(), &[1, 2, 3]).unwrap();
        let bytes = encode_frame(&frame).unwrap();
        let (msg, _) = decode_next(&bytes).unwrap();
        match msg {
            LineMessage::Frame { frame: decoded, .. } => {
                assert_eq!(decoded.raw_id(), frame.raw_id());
                assert_eq!(decoded.is_extended(), frame.is_extended());
                assert_eq!(decoded.is_remote(), frame.is_remote());
                assert_eq!(decoded.dlc(), frame.dlc());
                assert_eq!(decoded.data(), frame.data());
            }
            _ => panic!("expected a frame"),
        }
    }
}
