use crate::{Result, error::Error};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag unique identifier, rendered as uppercase hexadecimal with no
/// separators (the form subscribers receive).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TagUid(String);

impl TagUid {
    /// Build a UID from the raw identifier bytes reported by the reader.
    ///
    /// # Errors
    /// Returns `Error::MalformedFrame` if the identifier is empty.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::MalformedFrame(
                "tag report carried an empty identifier".to_string(),
            ));
        }
        let hex: String = bytes.iter().map(|b| format!("{:02X}", b)).collect();
        Ok(TagUid(hex))
    }

    /// Get the UID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TagUid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Event published to subscribers.
///
/// Serializes to the wire shape consumed by the browser widget:
///
/// ```json
/// {"type":"scan","uid":"04ABCDEF","timestamp":"2025-01-15T12:30:00Z"}
/// {"type":"status","message":"Scanner ready","timestamp":"..."}
/// {"type":"error","message":"No reader found","timestamp":"..."}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ScanEvent {
    /// A tag was detected; `uid` is uppercase hex.
    Scan {
        uid: String,
        timestamp: DateTime<Utc>,
    },

    /// Human-readable connection status change.
    Status {
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// A discovery, transport or device fault, described for humans.
    Error {
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl ScanEvent {
    /// Create a scan event stamped with the current time.
    #[must_use]
    pub fn scan(uid: TagUid) -> Self {
        ScanEvent::Scan {
            uid: uid.0,
            timestamp: Utc::now(),
        }
    }

    /// Create a status event stamped with the current time.
    #[must_use]
    pub fn status(message: impl Into<String>) -> Self {
        ScanEvent::Status {
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create an error event stamped with the current time.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        ScanEvent::Error {
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    /// The UID if this is a scan event.
    #[must_use]
    pub fn uid(&self) -> Option<&str> {
        match self {
            ScanEvent::Scan { uid, .. } => Some(uid),
            _ => None,
        }
    }

    /// The message if this is a status or error event.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            ScanEvent::Status { message, .. } | ScanEvent::Error { message, .. } => Some(message),
            ScanEvent::Scan { .. } => None,
        }
    }

    /// Returns `true` for error events.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, ScanEvent::Error { .. })
    }
}

/// Connection lifecycle state.
///
/// Exactly one instance exists, owned by the lifecycle supervisor; every
/// other component observes it only through the Status events the
/// supervisor emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    /// No link. Initial state, and the terminal state after shutdown,
    /// discovery failure or exhausted reconnects.
    Disconnected,

    /// Enumerating serial ports and selecting the reader.
    Resolving,

    /// Opening the selected port.
    Connecting,

    /// Streaming; frames flow from the reader to subscribers.
    Ready,

    /// The link dropped while streaming; about to re-resolve.
    Reconnecting,
}

impl LinkState {
    /// Check whether moving to `target` is a legal transition.
    ///
    /// Shutdown may force any state to `Disconnected`, so that edge is
    /// always allowed.
    #[must_use]
    pub fn can_transition_to(&self, target: &LinkState) -> bool {
        if *target == LinkState::Disconnected {
            return true;
        }
        matches!(
            (self, target),
            (LinkState::Disconnected, LinkState::Resolving)
                | (LinkState::Resolving, LinkState::Connecting)
                | (LinkState::Connecting, LinkState::Ready)
                | (LinkState::Ready, LinkState::Reconnecting)
                | (LinkState::Reconnecting, LinkState::Resolving)
        )
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LinkState::Disconnected => "Disconnected",
            LinkState::Resolving => "Resolving",
            LinkState::Connecting => "Connecting",
            LinkState::Ready => "Ready",
            LinkState::Reconnecting => "Reconnecting",
        };
        write!(f, "{}", s)
    }
}
