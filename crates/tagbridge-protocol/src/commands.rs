//! Outbound command constructors.
//!
//! Commands are ordinary [`DeviceMessage`]s serialized through
//! [`Frame::encode`](crate::Frame::encode) — the same typed structure the
//! decode path produces, so there is exactly one schema on the wire.

use crate::message::DeviceMessage;
use tagbridge_core::constants::{CODE_STREAM_TAGS, FAMILY_BASIC_NFC};

/// Command putting the reader into continuous tag streaming mode.
///
/// Payload byte 0 is the poll timeout (0x00 = indefinite), byte 1 the poll
/// mode flags. The exact handshake has not been confirmed against the
/// vendor protocol document; adjust here if the firmware expects a
/// different poll mode.
#[must_use]
pub fn start_stream() -> DeviceMessage {
    DeviceMessage::new(FAMILY_BASIC_NFC, CODE_STREAM_TAGS, vec![0x00, 0x00])
}
