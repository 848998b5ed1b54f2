//! WebSocket push endpoint for subscribers.
//!
//! Subscribers attach by opening a long-lived WebSocket connection and
//! detach by closing it; the channel is strictly server-to-subscriber
//! push. Each event is delivered as one JSON text frame:
//!
//! ```json
//! {"type":"scan","uid":"04ABCDEF","timestamp":"2025-01-15T12:30:00Z"}
//! {"type":"status","message":"Scanner ready - waiting for NFC tags","timestamp":"..."}
//! {"type":"error","message":"No matching reader found: ...","timestamp":"..."}
//! ```
//!
//! # Architecture
//!
//! ```text
//! ReaderBridge ──> EventHub ──> per-connection task ──> WebSocket client
//!                     │
//!                     └───────> per-connection task ──> WebSocket client
//! ```
//!
//! The accept loop spawns one task per connection; each task owns its hub
//! subscription and forwards events until the client goes away. Anything a
//! client sends other than close/ping is ignored — there is no
//! request/response surface to attack or to keep compatible.

use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tagbridge_link::EventHub;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, info, warn};

/// Configuration for the subscriber endpoint.
///
/// # Example
///
/// ```
/// use tagbridge_server::ws::WsServerConfig;
///
/// let config = WsServerConfig {
///     bind_addr: "0.0.0.0:3001".parse().unwrap(),
/// };
/// ```
#[derive(Debug, Clone)]
pub struct WsServerConfig {
    /// Address to bind the WebSocket listener to.
    pub bind_addr: SocketAddr,
}

impl Default for WsServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3001".parse().expect("static address parses"),
        }
    }
}

/// Errors from the subscriber endpoint.
#[derive(Debug, Error)]
pub enum WsServerError {
    /// Failed to bind the listener.
    #[error("Failed to bind to {0}")]
    BindFailed(SocketAddr),

    /// WebSocket handshake with a client failed.
    #[error("WebSocket handshake failed: {0}")]
    Handshake(String),

    /// An event failed to serialize (indicates a bug, not a client issue).
    #[error("Event serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Low-level I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// WebSocket server fanning bridge events out to subscribers.
///
/// # Example
///
/// ```no_run
/// use tagbridge_link::EventHub;
/// use tagbridge_server::ws::{WsServer, WsServerConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hub = EventHub::new();
/// let server = WsServer::bind(WsServerConfig::default(), hub.clone()).await?;
/// println!("listening on {}", server.local_addr()?);
/// server.run().await?;
/// # Ok(())
/// # }
/// ```
pub struct WsServer {
    listener: TcpListener,
    hub: EventHub,
}

impl WsServer {
    /// Bind the listener.
    ///
    /// # Errors
    ///
    /// Returns `WsServerError::BindFailed` if the address is in use or
    /// not bindable.
    pub async fn bind(config: WsServerConfig, hub: EventHub) -> Result<Self, WsServerError> {
        let listener = TcpListener::bind(config.bind_addr)
            .await
            .map_err(|_| WsServerError::BindFailed(config.bind_addr))?;

        info!("subscriber endpoint listening on {}", config.bind_addr);

        Ok(Self { listener, hub })
    }

    /// The bound local address. Useful with port 0 in tests.
    pub fn local_addr(&self) -> Result<SocketAddr, WsServerError> {
        self.listener.local_addr().map_err(Into::into)
    }

    /// Accept subscribers until the listener fails.
    ///
    /// Each connection runs in its own task; a failed handshake or a
    /// misbehaving client only affects that connection.
    pub async fn run(self) -> Result<(), WsServerError> {
        loop {
            let (stream, addr) = self.listener.accept().await?;
            debug!(addr = %addr, "incoming subscriber connection");

            let hub = self.hub.clone();
            tokio::spawn(async move {
                if let Err(e) = serve_subscriber(stream, addr, hub).await {
                    debug!(addr = %addr, error = %e, "subscriber connection ended with error");
                }
            });
        }
    }
}

/// Drive one subscriber connection until it closes.
async fn serve_subscriber(
    stream: TcpStream,
    addr: SocketAddr,
    hub: EventHub,
) -> Result<(), WsServerError> {
    let mut ws = accept_async(stream)
        .await
        .map_err(|e| WsServerError::Handshake(e.to_string()))?;

    let mut subscription = hub.subscribe();
    info!(addr = %addr, subscriber = subscription.id, "subscriber attached");

    loop {
        tokio::select! {
            event = subscription.recv() => {
                match event {
                    Some(event) => {
                        let json = serde_json::to_string(&event)?;
                        if ws.send(Message::text(json)).await.is_err() {
                            // Send failure is an implicit detach, not an error.
                            break;
                        }
                    }
                    // Hub dropped; the process is going down.
                    None => break,
                }
            }
            incoming = ws.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    // Push-only channel: ignore client chatter. Ping/pong
                    // is handled inside tungstenite.
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(addr = %addr, error = %e, "subscriber socket error");
                        break;
                    }
                }
            }
        }
    }

    hub.unsubscribe(subscription.id);
    info!(addr = %addr, subscriber = subscription.id, "subscriber detached");
    Ok(())
}
