//! Serial transport abstraction.
//!
//! The transport owns exactly one underlying serial handle and exposes a
//! byte-stream interface: `open` yields a channel of inbound chunks,
//! `write` sends raw frame bytes, `close` is idempotent. Chunks arrive in
//! the order the driver delivered them with NO frame alignment guarantee —
//! a chunk may hold part of a frame, several frames, or noise. The stream
//! parser downstream absorbs that.
//!
//! All traits use native `async fn` methods (Rust 1.90 + Edition 2024
//! RPITIT), so no `async_trait` macro is needed.

#![allow(async_fn_in_trait)]

use bytes::Bytes;
use serialport::SerialPort;
use std::io::{Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use tagbridge_core::{
    Error, Result,
    constants::{BAUD_RATE, READ_TIMEOUT},
};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

/// Capacity of the inbound chunk channel. The supervisor drains this
/// continuously; the depth only matters across scheduling hiccups.
const CHUNK_CHANNEL_DEPTH: usize = 32;

/// Reader thread scratch buffer size.
const READ_CHUNK_SIZE: usize = 256;

/// Resolves which serial port the reader is attached to.
///
/// The production implementation enumerates host ports and applies the
/// vendor heuristics; tests substitute fixed or failing resolvers.
pub trait PortResolver: Send {
    /// Select a port, or fail with `DeviceNotFound` when nothing matches.
    fn resolve(&self) -> Result<String>;
}

/// Resolver backed by host port enumeration (see [`crate::resolver`]).
#[derive(Debug, Default, Clone, Copy)]
pub struct UsbPortResolver;

impl PortResolver for UsbPortResolver {
    fn resolve(&self) -> Result<String> {
        crate::resolver::resolve()
    }
}

/// Resolver pinned to an explicit port path (CLI `--port` override).
#[derive(Debug, Clone)]
pub struct FixedPortResolver(pub String);

impl PortResolver for FixedPortResolver {
    fn resolve(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// One serial connection to the reader.
///
/// Implementations hold at most one underlying handle: `open` while
/// already open closes the previous handle first, and `close` on a closed
/// transport succeeds without effect.
pub trait SerialTransport: Send {
    /// Open the given port at the protocol baud rate.
    ///
    /// Returns the receiving end of the inbound byte stream. The channel
    /// closing (`recv()` returning `None`) signals that the link dropped —
    /// device unplugged, driver fault, or an explicit `close`.
    ///
    /// # Errors
    /// Returns `Error::ConnectionFailed` on driver or hardware rejection.
    async fn open(&mut self, port: &str) -> Result<mpsc::Receiver<Bytes>>;

    /// Write raw bytes to the device.
    ///
    /// # Errors
    /// Returns `Error::NotConnected` when no port is open, or
    /// `Error::WriteFailed` on a driver error.
    async fn write(&mut self, bytes: &[u8]) -> Result<()>;

    /// Close the connection. Idempotent.
    async fn close(&mut self) -> Result<()>;

    /// Whether a port is currently open.
    fn is_open(&self) -> bool;
}

/// Transport backed by the `serialport` crate.
///
/// Reads happen on a dedicated blocking thread (the driver API is
/// synchronous) which forwards chunks into a tokio channel. The thread
/// polls a cancel flag on every read timeout, so `close` unblocks it
/// within one `READ_TIMEOUT` tick.
pub struct UsbSerialTransport {
    link: Option<OpenLink>,
}

struct OpenLink {
    port_name: String,
    writer: Box<dyn SerialPort>,
    cancel: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
}

impl UsbSerialTransport {
    pub fn new() -> Self {
        Self { link: None }
    }
}

impl Default for UsbSerialTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl SerialTransport for UsbSerialTransport {
    async fn open(&mut self, port: &str) -> Result<mpsc::Receiver<Bytes>> {
        // Never hold two handles: drop the previous link first.
        if self.link.is_some() {
            self.close().await?;
        }

        let writer = serialport::new(port, BAUD_RATE)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|e| Error::ConnectionFailed(format!("open {port}: {e}")))?;

        let reader_port = writer
            .try_clone()
            .map_err(|e| Error::ConnectionFailed(format!("clone handle for {port}: {e}")))?;

        let (tx, rx) = mpsc::channel(CHUNK_CHANNEL_DEPTH);
        let cancel = Arc::new(AtomicBool::new(false));
        let reader = std::thread::spawn({
            let cancel = Arc::clone(&cancel);
            let port = port.to_string();
            move || read_loop(reader_port, tx, cancel, &port)
        });

        debug!(port = %port, baud = BAUD_RATE, "serial port opened");

        self.link = Some(OpenLink {
            port_name: port.to_string(),
            writer,
            cancel,
            reader: Some(reader),
        });

        Ok(rx)
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let link = self.link.as_mut().ok_or(Error::NotConnected)?;
        link.writer
            .write_all(bytes)
            .map_err(|e| Error::WriteFailed(format!("{}: {e}", link.port_name)))?;
        trace!(port = %link.port_name, len = bytes.len(), "wrote frame bytes");
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        let Some(mut link) = self.link.take() else {
            return Ok(());
        };

        link.cancel.store(true, Ordering::Relaxed);
        if let Some(handle) = link.reader.take() {
            // The reader exits within one READ_TIMEOUT tick; park the join
            // on the blocking pool to keep the runtime unblocked.
            let _ = tokio::task::spawn_blocking(move || handle.join()).await;
        }
        debug!(port = %link.port_name, "serial port closed");
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.link.is_some()
    }
}

/// Blocking read loop run on the dedicated reader thread.
///
/// Exits when the cancel flag is set, the channel's receiving side is
/// gone, or the driver reports a hard error (device unplug). Dropping the
/// sender is what tells the supervisor the link died.
fn read_loop(
    mut port: Box<dyn SerialPort>,
    tx: mpsc::Sender<Bytes>,
    cancel: Arc<AtomicBool>,
    name: &str,
) {
    let mut buf = [0u8; READ_CHUNK_SIZE];
    loop {
        if cancel.load(Ordering::Relaxed) {
            trace!(port = %name, "reader thread cancelled");
            return;
        }

        match port.read(&mut buf) {
            Ok(0) => continue,
            Ok(n) => {
                if tx.blocking_send(Bytes::copy_from_slice(&buf[..n])).is_err() {
                    // Receiver gone; nobody is listening anymore.
                    return;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!(port = %name, error = %e, "serial read failed, dropping link");
                return;
            }
        }
    }
}
