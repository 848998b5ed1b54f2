//! Protocol and runtime constants for the Tappy reader bridge.
//!
//! The TappyUSB speaks a length-prefixed binary protocol (TCMP) over a
//! serial link. Each frame carries a 2-byte command family, a 1-byte
//! command code and a variable payload:
//!
//! ```text
//! [LEN_HI][LEN_LO][LCS][FAM0][FAM1][CODE][PAYLOAD ...][CRC_HI][CRC_LO]
//! ```
//!
//! - `LEN` — big-endian total frame length, header and CRC included
//! - `LCS` — length checksum: `(LEN_HI + LEN_LO) & 0xFF`
//! - `CRC` — CRC-16/CCITT-FALSE over every byte before the CRC itself
//!
//! Constants here are shared by the codec, the discovery heuristics and the
//! lifecycle supervisor. Changing the framing values breaks compatibility
//! with the reader firmware.

use std::time::Duration;

// ============================================================================
// Frame layout
// ============================================================================

/// Bytes before the command family: LEN_HI, LEN_LO, LCS.
pub const FRAME_HEADER_SIZE: usize = 3;

/// Size of the CRC trailer in bytes.
pub const FRAME_CRC_SIZE: usize = 2;

/// Frame bytes that are not payload: header + family + code + CRC.
pub const FRAME_OVERHEAD: usize = FRAME_HEADER_SIZE + COMMAND_FAMILY_SIZE + 1 + FRAME_CRC_SIZE;

/// Command family width in bytes.
pub const COMMAND_FAMILY_SIZE: usize = 2;

/// Upper bound for a single frame. Anything larger is treated as stream
/// corruption and resynchronized away.
pub const MAX_FRAME_SIZE: usize = 1024;

// ============================================================================
// Command families and codes
// ============================================================================

/// System command family (device-level status and faults).
pub const FAMILY_SYSTEM: [u8; 2] = [0x00, 0x00];

/// Basic NFC command family (tag polling and reporting).
pub const FAMILY_BASIC_NFC: [u8; 2] = [0x00, 0x01];

/// Basic NFC: start streaming tag detections.
pub const CODE_STREAM_TAGS: u8 = 0x01;

/// Basic NFC response: a tag entered the field. Payload byte 0 is a tag
/// type marker, the remaining bytes are the UID.
pub const CODE_TAG_FOUND: u8 = 0x01;

/// Error response code, shared by both families.
pub const CODE_ERROR: u8 = 0x7F;

// ============================================================================
// Device discovery
// ============================================================================

/// Manufacturer substrings identifying the reader (matched
/// case-insensitively). The Tappy enumerates through an FTDI bridge chip.
pub const VENDOR_TOKENS: [&str; 2] = ["ftdi", "taptrack"];

/// Port path fragments typical for USB serial adapters, used when the
/// platform reports no manufacturer string.
pub const USB_PATH_PATTERNS: [&str; 2] = ["usbserial", "USB"];

// ============================================================================
// Link parameters
// ============================================================================

/// Protocol-mandated baud rate for the reader's serial link.
pub const BAUD_RATE: u32 = 115_200;

/// Blocking read timeout on the serial port. Bounds how long the reader
/// thread can be stuck in a read after a close request.
pub const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Delay between opening the port and sending the start-stream command,
/// giving the reader firmware time to settle.
pub const SETTLE_DELAY: Duration = Duration::from_secs(1);

/// First reconnect delay after a drop while streaming.
pub const RECONNECT_INITIAL_DELAY: Duration = Duration::from_millis(250);

/// Ceiling for the exponential reconnect backoff.
pub const RECONNECT_MAX_DELAY: Duration = Duration::from_secs(5);

/// Reconnect attempts before the bridge gives up and settles Disconnected.
pub const RECONNECT_MAX_ATTEMPTS: u32 = 10;

/// Queue depth of each subscriber's event channel. A subscriber that falls
/// this far behind starts losing events rather than stalling the bridge.
pub const SUBSCRIBER_QUEUE_DEPTH: usize = 64;
