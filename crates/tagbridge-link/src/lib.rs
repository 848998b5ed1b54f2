//! Connection lifecycle and event fan-out for the reader bridge.
//!
//! Two components live here:
//!
//! - [`EventHub`] — the publish/subscribe hub delivering every bridge
//!   event to every attached subscriber, with a bounded-effort delivery
//!   policy (lagging subscribers lose events, closed ones are pruned).
//! - [`ReaderBridge`] — the lifecycle supervisor driving resolve → open →
//!   handshake → streaming → reconnect as a single task over a
//!   [`SerialTransport`](tagbridge_serial::SerialTransport).
//!
//! # Example
//!
//! ```no_run
//! use tagbridge_link::{EventHub, ReaderBridge};
//! use tagbridge_serial::UsbSerialTransport;
//! use tokio::sync::watch;
//!
//! # async fn example() -> tagbridge_core::Result<()> {
//! let hub = EventHub::new();
//! let bridge = ReaderBridge::new(UsbSerialTransport::new(), hub.clone());
//!
//! let (shutdown_tx, shutdown_rx) = watch::channel(false);
//! tokio::spawn(bridge.run(shutdown_rx));
//!
//! let mut subscription = hub.subscribe();
//! while let Some(event) = subscription.recv().await {
//!     println!("{:?}", event);
//! }
//! # drop(shutdown_tx);
//! # Ok(())
//! # }
//! ```

pub mod broadcaster;
pub mod lifecycle;

pub use broadcaster::{EventHub, SubscriberId, Subscription};
pub use lifecycle::{BridgeConfig, ReaderBridge};
