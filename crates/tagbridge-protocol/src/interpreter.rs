//! Dispatch from decoded device messages to subscriber-facing events.
//!
//! The bridge only cares about two things the reader says: "a tag entered
//! the field" and "something went wrong". Everything else the firmware
//! chatters (ACKs, status polls, LCD echoes) is ignored. Dispatch is keyed
//! on the (command family, command code) pair.

use crate::message::DeviceMessage;
use tagbridge_core::{ScanEvent, TagUid, constants::*};

/// Maps decoded device messages to semantic scan events.
///
/// A pure function of its input and the dispatch table below; holds no
/// state and is trivially shareable.
///
/// | family      | code | meaning     | event          |
/// |-------------|------|-------------|----------------|
/// | Basic NFC   | 0x01 | tag found   | `Scan { uid }` |
/// | Basic NFC   | 0x7F | NFC error   | `Error`        |
/// | System      | 0x7F | device fault| `Error`        |
/// | anything else      |             | none           |
#[derive(Debug, Default, Clone, Copy)]
pub struct MessageInterpreter;

impl MessageInterpreter {
    pub fn new() -> Self {
        Self
    }

    /// Interpret one message, yielding at most one event.
    ///
    /// Tag reports drop payload byte 0 (a tag-type marker) and render the
    /// remaining bytes as the uppercase-hex UID. A tag report whose payload
    /// carries no identifier bytes yields nothing.
    #[must_use]
    pub fn interpret(&self, message: &DeviceMessage) -> Option<ScanEvent> {
        match (message.family(), message.code()) {
            (FAMILY_BASIC_NFC, CODE_TAG_FOUND) => {
                let uid = TagUid::from_bytes(message.payload().get(1..)?).ok()?;
                Some(ScanEvent::scan(uid))
            }
            (FAMILY_BASIC_NFC, CODE_ERROR) => Some(ScanEvent::error(format!(
                "Scanner error: {}",
                describe_nfc_error(message.payload().first().copied())
            ))),
            (FAMILY_SYSTEM, CODE_ERROR) => Some(ScanEvent::error(format!(
                "Reader fault: {}",
                describe_system_error(message.payload().first().copied())
            ))),
            _ => None,
        }
    }
}

/// Human-readable description of a Basic NFC error payload code.
fn describe_nfc_error(code: Option<u8>) -> String {
    match code {
        Some(0x01) => "invalid parameter".to_string(),
        Some(0x02) => "polling error".to_string(),
        Some(0x03) => "too few parameters".to_string(),
        Some(0x04) => "too many parameters".to_string(),
        Some(other) => format!("unknown error (0x{:02X})", other),
        None => "no error detail".to_string(),
    }
}

/// Human-readable description of a System-family fault payload code.
fn describe_system_error(code: Option<u8>) -> String {
    match code {
        Some(0x01) => "frame checksum mismatch".to_string(),
        Some(0x02) => "unrecognized command family".to_string(),
        Some(0x03) => "length mismatch".to_string(),
        Some(other) => format!("unknown fault (0x{:02X})", other),
        None => "no fault detail".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interpret(family: [u8; 2], code: u8, payload: &[u8]) -> Option<ScanEvent> {
        MessageInterpreter::new().interpret(&DeviceMessage::new(family, code, payload.to_vec()))
    }

    #[test]
    fn test_tag_report_yields_scan_event() {
        let event = interpret(FAMILY_BASIC_NFC, CODE_TAG_FOUND, &[0x00, 0xDE, 0xAD, 0xBE, 0xEF])
            .expect("tag report must produce an event");

        assert_eq!(event.uid(), Some("DEADBEEF"));
    }

    #[test]
    fn test_tag_report_marker_byte_dropped() {
        // Byte 0 is the tag-type marker; it must not leak into the UID.
        let event = interpret(FAMILY_BASIC_NFC, CODE_TAG_FOUND, &[0x07, 0x04, 0xAB]).unwrap();
        assert_eq!(event.uid(), Some("04AB"));
    }

    #[test]
    fn test_tag_report_without_identifier_ignored() {
        assert!(interpret(FAMILY_BASIC_NFC, CODE_TAG_FOUND, &[0x00]).is_none());
        assert!(interpret(FAMILY_BASIC_NFC, CODE_TAG_FOUND, &[]).is_none());
    }

    #[test]
    fn test_nfc_error_yields_error_event() {
        let event = interpret(FAMILY_BASIC_NFC, CODE_ERROR, &[0x02]).unwrap();

        assert!(event.is_error());
        assert_eq!(event.message(), Some("Scanner error: polling error"));
    }

    #[test]
    fn test_system_fault_yields_error_event() {
        let event = interpret(FAMILY_SYSTEM, CODE_ERROR, &[0x02]).unwrap();

        assert!(event.is_error());
        assert_eq!(event.message(), Some("Reader fault: unrecognized command family"));
    }

    #[test]
    fn test_unknown_error_codes_still_described() {
        let event = interpret(FAMILY_BASIC_NFC, CODE_ERROR, &[0x99]).unwrap();
        assert_eq!(event.message(), Some("Scanner error: unknown error (0x99)"));

        let event = interpret(FAMILY_BASIC_NFC, CODE_ERROR, &[]).unwrap();
        assert_eq!(event.message(), Some("Scanner error: no error detail"));
    }

    #[test]
    fn test_unrelated_messages_ignored() {
        // Unknown code within a known family
        assert!(interpret(FAMILY_BASIC_NFC, 0x05, &[0x01]).is_none());
        // Non-error system message
        assert!(interpret(FAMILY_SYSTEM, 0x02, &[]).is_none());
        // Unknown family entirely
        assert!(interpret([0x00, 0x06], 0x01, &[0x00, 0xAA]).is_none());
    }
}
