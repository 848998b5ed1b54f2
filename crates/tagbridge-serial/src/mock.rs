//! Mock serial transport for testing and development.
//!
//! Simulates the reader's serial link without hardware: the handle side
//! injects inbound bytes, severs the link, or makes upcoming opens fail,
//! while the transport side behaves exactly like the USB implementation
//! (single handle, idempotent close, channel-drop on link loss).

use crate::transport::SerialTransport;
use bytes::Bytes;
use std::sync::{Arc, Mutex};
use tagbridge_core::{Error, Result};
use tokio::sync::mpsc;

/// Capacity of the simulated inbound channel.
const CHANNEL_DEPTH: usize = 32;

#[derive(Debug, Default)]
struct MockState {
    open_port: Option<String>,
    byte_tx: Option<mpsc::Sender<Bytes>>,
    written: Vec<Bytes>,
    fail_opens_remaining: u32,
    open_count: u32,
    close_count: u32,
}

/// Mock transport; pair it with its [`MockTransportHandle`].
///
/// # Examples
///
/// ```
/// use tagbridge_serial::mock::MockTransport;
/// use tagbridge_serial::transport::SerialTransport;
///
/// #[tokio::main]
/// async fn main() -> tagbridge_core::Result<()> {
///     let (mut transport, handle) = MockTransport::new();
///
///     let mut rx = transport.open("/dev/mock0").await?;
///     handle.push_bytes(&[0x01, 0x02]).await?;
///
///     let chunk = rx.recv().await.unwrap();
///     assert_eq!(&chunk[..], &[0x01, 0x02]);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Create a transport/handle pair.
    pub fn new() -> (Self, MockTransportHandle) {
        let state = Arc::new(Mutex::new(MockState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            MockTransportHandle { state },
        )
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SerialTransport for MockTransport {
    async fn open(&mut self, port: &str) -> Result<mpsc::Receiver<Bytes>> {
        let mut state = self.lock();

        // Matches the hardware contract: re-open closes the old handle.
        if state.open_port.take().is_some() {
            state.byte_tx = None;
            state.close_count += 1;
        }

        if state.fail_opens_remaining > 0 {
            state.fail_opens_remaining -= 1;
            return Err(Error::ConnectionFailed(format!(
                "simulated open failure on {port}"
            )));
        }

        let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
        state.open_port = Some(port.to_string());
        state.byte_tx = Some(tx);
        state.open_count += 1;
        Ok(rx)
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let mut state = self.lock();
        if state.open_port.is_none() {
            return Err(Error::NotConnected);
        }
        state.written.push(Bytes::copy_from_slice(bytes));
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        let mut state = self.lock();
        if state.open_port.take().is_some() {
            state.byte_tx = None; // dropping the sender closes the stream
            state.close_count += 1;
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.lock().open_port.is_some()
    }
}

/// Controller for a [`MockTransport`], used by tests to play the device.
#[derive(Debug, Clone)]
pub struct MockTransportHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockTransportHandle {
    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Inject bytes as if the device sent them.
    ///
    /// # Errors
    /// Returns `Error::NotConnected` if the transport is not open.
    pub async fn push_bytes(&self, bytes: &[u8]) -> Result<()> {
        let tx = self.lock().byte_tx.clone().ok_or(Error::NotConnected)?;
        tx.send(Bytes::copy_from_slice(bytes))
            .await
            .map_err(|_| Error::NotConnected)
    }

    /// Drop the link as if the device was unplugged. The transport still
    /// considers its handle open (the USB stack behaves the same way: the
    /// read side dies first, close happens later).
    pub fn sever_link(&self) {
        self.lock().byte_tx = None;
    }

    /// Make the next `n` open attempts fail with a connection error.
    pub fn fail_next_opens(&self, n: u32) {
        self.lock().fail_opens_remaining = n;
    }

    /// Everything written to the device so far.
    pub fn written(&self) -> Vec<Bytes> {
        self.lock().written.clone()
    }

    /// The currently open port path, if any.
    pub fn open_port(&self) -> Option<String> {
        self.lock().open_port.clone()
    }

    /// Number of successful opens.
    pub fn open_count(&self) -> u32 {
        self.lock().open_count
    }

    /// Number of closes that actually closed an open handle.
    pub fn close_count(&self) -> u32 {
        self.lock().close_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_push_and_receive() {
        let (mut transport, handle) = MockTransport::new();

        let mut rx = transport.open("/dev/mock0").await.unwrap();
        assert!(transport.is_open());
        assert_eq!(handle.open_port(), Some("/dev/mock0".to_string()));

        handle.push_bytes(&[0xDE, 0xAD]).await.unwrap();
        assert_eq!(&rx.recv().await.unwrap()[..], &[0xDE, 0xAD]);
    }

    #[tokio::test]
    async fn test_write_requires_open() {
        let (mut transport, handle) = MockTransport::new();

        assert!(matches!(
            transport.write(&[0x01]).await,
            Err(Error::NotConnected)
        ));

        transport.open("/dev/mock0").await.unwrap();
        transport.write(&[0x01, 0x02]).await.unwrap();
        assert_eq!(handle.written().len(), 1);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (mut transport, handle) = MockTransport::new();
        transport.open("/dev/mock0").await.unwrap();

        transport.close().await.unwrap();
        transport.close().await.unwrap();
        transport.close().await.unwrap();

        assert!(!transport.is_open());
        assert_eq!(handle.close_count(), 1);
    }

    #[tokio::test]
    async fn test_close_ends_byte_stream() {
        let (mut transport, _handle) = MockTransport::new();
        let mut rx = transport.open("/dev/mock0").await.unwrap();

        transport.close().await.unwrap();
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_reopen_closes_previous_handle() {
        let (mut transport, handle) = MockTransport::new();

        let mut first_rx = transport.open("/dev/mock0").await.unwrap();
        let _second_rx = transport.open("/dev/mock1").await.unwrap();

        // Only one handle may exist; the first stream must be dead.
        assert!(first_rx.recv().await.is_none());
        assert_eq!(handle.open_port(), Some("/dev/mock1".to_string()));
        assert_eq!(handle.open_count(), 2);
        assert_eq!(handle.close_count(), 1);
    }

    #[tokio::test]
    async fn test_sever_link_closes_stream_but_not_handle() {
        let (mut transport, handle) = MockTransport::new();
        let mut rx = transport.open("/dev/mock0").await.unwrap();

        handle.sever_link();

        assert!(rx.recv().await.is_none());
        assert!(transport.is_open());
    }

    #[tokio::test]
    async fn test_fail_next_opens() {
        let (mut transport, handle) = MockTransport::new();
        handle.fail_next_opens(2);

        assert!(transport.open("/dev/mock0").await.is_err());
        assert!(transport.open("/dev/mock0").await.is_err());
        assert!(transport.open("/dev/mock0").await.is_ok());
    }

    #[tokio::test]
    async fn test_push_bytes_without_open_fails() {
        let (_transport, handle) = MockTransport::new();
        assert!(handle.push_bytes(&[0x00]).await.is_err());
    }
}
