//! Serial layer for the reader bridge.
//!
//! Three pieces live here:
//!
//! - [`resolver`] — port discovery: enumerate host serial ports and pick
//!   the reader by vendor string, USB path pattern, or first-port
//!   fallback.
//! - [`transport`] — the [`SerialTransport`] trait plus
//!   [`UsbSerialTransport`], the `serialport`-backed implementation with a
//!   dedicated blocking reader thread.
//! - [`mock`] — [`MockTransport`]/[`MockTransportHandle`] pair for tests
//!   and hardware-free development.
//!
//! The transport's byte stream makes no framing promises; see
//! `tagbridge-protocol` for the stream parser that restores frame
//! boundaries.

pub mod mock;
pub mod resolver;
pub mod transport;

pub use mock::{MockTransport, MockTransportHandle};
pub use resolver::{PortCandidate, select_port};
pub use transport::{
    FixedPortResolver, PortResolver, SerialTransport, UsbPortResolver, UsbSerialTransport,
};
