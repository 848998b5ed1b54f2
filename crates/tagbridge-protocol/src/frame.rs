//! Byte-level wire format for reader frames.
//!
//! A frame is the length-delimited unit the reader sends and accepts:
//!
//! ```text
//! [LEN_HI][LEN_LO][LCS][FAM0][FAM1][CODE][PAYLOAD ...][CRC_HI][CRC_LO]
//! ```
//!
//! `LEN` is the big-endian total frame length including the header and the
//! CRC, `LCS = (LEN_HI + LEN_LO) & 0xFF` guards the length bytes, and the
//! CRC-16/CCITT-FALSE trailer covers everything before itself. The minimum
//! frame is 8 bytes (empty payload).
//!
//! # Usage
//!
//! ```
//! use tagbridge_protocol::{DeviceMessage, Frame};
//! use tagbridge_core::constants::{FAMILY_BASIC_NFC, CODE_STREAM_TAGS};
//!
//! let msg = DeviceMessage::new(FAMILY_BASIC_NFC, CODE_STREAM_TAGS, vec![0x00, 0x00]);
//! let frame = Frame::encode(&msg);
//!
//! let decoded = DeviceMessage::try_from(&frame).unwrap();
//! assert_eq!(decoded, msg);
//! ```

use crate::message::DeviceMessage;
use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;
use tagbridge_core::{Error, Result, constants::*};

/// A complete wire-format frame.
///
/// Holds the raw bytes of one frame, header and CRC included. Encoding from
/// a [`DeviceMessage`] always yields a valid frame; decoding validates the
/// header checksum, declared length and CRC before yielding a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    data: Bytes,
}

impl Frame {
    /// Encode a message into its wire format. Pure and deterministic.
    #[must_use]
    pub fn encode(message: &DeviceMessage) -> Self {
        let total = FRAME_OVERHEAD + message.payload().len();
        let len = total as u16;
        let [len_hi, len_lo] = len.to_be_bytes();

        let mut buf = BytesMut::with_capacity(total);
        buf.put_u8(len_hi);
        buf.put_u8(len_lo);
        buf.put_u8(len_hi.wrapping_add(len_lo));
        buf.put_slice(&message.family());
        buf.put_u8(message.code());
        buf.put_slice(message.payload());

        let crc = crc16_ccitt(&buf);
        buf.put_u16(crc);

        Frame { data: buf.freeze() }
    }

    /// Wrap raw bytes claimed to be one complete frame.
    ///
    /// No validation happens here; conversion to [`DeviceMessage`] validates.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Frame {
            data: Bytes::copy_from_slice(bytes),
        }
    }

    /// The raw frame bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Frame size in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Decode and validate a frame into a message.
impl TryFrom<&Frame> for DeviceMessage {
    type Error = Error;

    fn try_from(frame: &Frame) -> Result<Self> {
        let data = frame.as_bytes();

        if data.len() < FRAME_OVERHEAD {
            return Err(Error::MalformedFrame(format!(
                "frame of {} bytes is below the {} byte minimum",
                data.len(),
                FRAME_OVERHEAD
            )));
        }
        if data.len() > MAX_FRAME_SIZE {
            return Err(Error::FrameTooLarge {
                size: data.len(),
                max_size: MAX_FRAME_SIZE,
            });
        }

        let declared = u16::from_be_bytes([data[0], data[1]]) as usize;
        if declared != data.len() {
            return Err(Error::MalformedFrame(format!(
                "declared length {} does not match frame size {}",
                declared,
                data.len()
            )));
        }

        let lcs = data[0].wrapping_add(data[1]);
        if data[2] != lcs {
            return Err(Error::MalformedFrame(format!(
                "length checksum mismatch: expected {:02X}, got {:02X}",
                lcs, data[2]
            )));
        }

        let crc_offset = data.len() - FRAME_CRC_SIZE;
        let expected = crc16_ccitt(&data[..crc_offset]);
        let actual = u16::from_be_bytes([data[crc_offset], data[crc_offset + 1]]);
        if expected != actual {
            return Err(Error::MalformedFrame(format!(
                "CRC mismatch: expected {:04X}, got {:04X}",
                expected, actual
            )));
        }

        let family = [data[3], data[4]];
        let code = data[5];
        let payload = Bytes::copy_from_slice(&data[FRAME_HEADER_SIZE + COMMAND_FAMILY_SIZE + 1..crc_offset]);

        Ok(DeviceMessage::new(family, code, payload))
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex: String = self
            .data
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(" ");
        write!(f, "Frame[size={}, bytes={}]", self.size(), hex)
    }
}

/// CRC-16/CCITT-FALSE: polynomial 0x1021, initial value 0xFFFF.
#[must_use]
pub fn crc16_ccitt(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &byte in data {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ 0x1021;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag_report(payload: &[u8]) -> DeviceMessage {
        DeviceMessage::new(FAMILY_BASIC_NFC, CODE_TAG_FOUND, payload.to_vec())
    }

    #[test]
    fn test_crc16_known_value() {
        // CRC-16/CCITT-FALSE check value for "123456789"
        assert_eq!(crc16_ccitt(b"123456789"), 0x29B1);
    }

    #[test]
    fn test_crc16_empty_is_init() {
        assert_eq!(crc16_ccitt(&[]), 0xFFFF);
    }

    #[test]
    fn test_encode_layout() {
        let frame = Frame::encode(&tag_report(&[0x00, 0xDE, 0xAD]));
        let bytes = frame.as_bytes();

        // 8 overhead bytes + 3 payload bytes
        assert_eq!(bytes.len(), 11);
        assert_eq!(&bytes[..2], &11u16.to_be_bytes());
        assert_eq!(bytes[2], bytes[0].wrapping_add(bytes[1]));
        assert_eq!(&bytes[3..5], &FAMILY_BASIC_NFC);
        assert_eq!(bytes[5], CODE_TAG_FOUND);
        assert_eq!(&bytes[6..9], &[0x00, 0xDE, 0xAD]);
    }

    #[test]
    fn test_encode_empty_payload_is_minimum_frame() {
        let msg = DeviceMessage::new(FAMILY_SYSTEM, 0x02, Vec::new());
        let frame = Frame::encode(&msg);

        assert_eq!(frame.size(), FRAME_OVERHEAD);
    }

    #[test]
    fn test_round_trip() {
        let msg = tag_report(&[0x00, 0x04, 0xAB, 0xCD, 0xEF]);
        let frame = Frame::encode(&msg);
        let decoded = DeviceMessage::try_from(&frame).unwrap();

        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_decode_rejects_truncated_frame() {
        let frame = Frame::encode(&tag_report(&[0x00, 0x01]));
        let truncated = Frame::from_bytes(&frame.as_bytes()[..frame.size() - 1]);

        assert!(DeviceMessage::try_from(&truncated).is_err());
    }

    #[test]
    fn test_decode_rejects_bad_lcs() {
        let frame = Frame::encode(&tag_report(&[0x00, 0x01]));
        let mut bytes = frame.as_bytes().to_vec();
        bytes[2] ^= 0xFF;

        let result = DeviceMessage::try_from(&Frame::from_bytes(&bytes));
        assert!(matches!(result, Err(Error::MalformedFrame(_))));
    }

    #[test]
    fn test_decode_rejects_corrupt_payload() {
        let frame = Frame::encode(&tag_report(&[0x00, 0x01, 0x02]));
        let mut bytes = frame.as_bytes().to_vec();
        bytes[7] ^= 0x55; // flip a payload bit, CRC no longer matches

        let result = DeviceMessage::try_from(&Frame::from_bytes(&bytes));
        assert!(matches!(result, Err(Error::MalformedFrame(_))));
    }

    #[test]
    fn test_decode_rejects_undersized() {
        let result = DeviceMessage::try_from(&Frame::from_bytes(&[0x00, 0x08, 0x08]));
        assert!(result.is_err());
    }

    #[test]
    fn test_frame_display_hex() {
        let msg = DeviceMessage::new(FAMILY_SYSTEM, 0x01, Vec::new());
        let display = format!("{}", Frame::encode(&msg));

        assert!(display.contains("size=8"));
        assert!(display.contains("00 08"));
    }
}
