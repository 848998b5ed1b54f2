use bytes::Bytes;
use std::fmt;
use tagbridge_core::constants::{FAMILY_BASIC_NFC, FAMILY_SYSTEM};

/// A decoded device message: command family, command code and payload.
///
/// Messages are immutable once built. Inbound messages are produced only by
/// the [`StreamParser`](crate::StreamParser) from validated frames; outbound
/// messages are built by the constructors in [`commands`](crate::commands)
/// and serialized through [`Frame::encode`](crate::Frame::encode).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceMessage {
    family: [u8; 2],
    code: u8,
    payload: Bytes,
}

impl DeviceMessage {
    /// Create a new message.
    pub fn new(family: [u8; 2], code: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            family,
            code,
            payload: payload.into(),
        }
    }

    /// The 2-byte command family identifier.
    #[must_use]
    pub fn family(&self) -> [u8; 2] {
        self.family
    }

    /// The 1-byte command code.
    #[must_use]
    pub fn code(&self) -> u8 {
        self.code
    }

    /// The message payload.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Returns `true` if this message belongs to the Basic NFC family.
    #[must_use]
    pub fn is_basic_nfc(&self) -> bool {
        self.family == FAMILY_BASIC_NFC
    }

    /// Returns `true` if this message belongs to the System family.
    #[must_use]
    pub fn is_system(&self) -> bool {
        self.family == FAMILY_SYSTEM
    }
}

impl fmt::Display for DeviceMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DeviceMessage[family={:02X}{:02X}, code={:02X}, payload={} bytes]",
            self.family[0],
            self.family[1],
            self.code,
            self.payload.len()
        )
    }
}
