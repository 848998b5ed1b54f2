pub mod commands;
pub mod frame;
pub mod interpreter;
pub mod message;
pub mod stream_parser;

pub use frame::{Frame, crc16_ccitt};
pub use interpreter::MessageInterpreter;
pub use message::DeviceMessage;
pub use stream_parser::{DrainMessages, StreamParser};
