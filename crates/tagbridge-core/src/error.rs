use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Discovery errors
    #[error("No matching reader found: {0}")]
    DeviceNotFound(String),

    // Transport errors
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Transport not open")]
    NotConnected,

    #[error("Write failed: {0}")]
    WriteFailed(String),

    // Protocol errors (recovered locally by the stream parser; surfaced
    // only when a caller decodes a single frame directly)
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    #[error("Frame too large: {size} bytes exceeds limit of {max_size}")]
    FrameTooLarge { size: usize, max_size: usize },

    // Lifecycle errors
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
