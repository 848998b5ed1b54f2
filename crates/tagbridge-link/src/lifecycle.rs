//! Connection lifecycle supervisor.
//!
//! [`ReaderBridge`] drives the whole path from port discovery to event
//! fan-out:
//!
//! ```text
//! Disconnected → Resolving → Connecting → Ready ⇄ Reconnecting
//! ```
//!
//! One task owns the state machine, the stream parser and the transport,
//! so transitions are single-writer by construction: a write failure and a
//! receive-side close can never double-trigger a reconnect. Byte chunks
//! arrive over the transport's channel, events leave through the
//! [`EventHub`]; there are no callbacks in between.
//!
//! # Failure policy
//!
//! - Startup failures (no port found, open rejected) publish one Error
//!   event and settle in `Disconnected`. There is no polling for device
//!   insertion; restarting the bridge is an external decision.
//! - A link drop while `Ready` publishes a Status event and reconnects
//!   with capped exponential backoff. Individual failed attempts are only
//!   logged; one final Error event is published if every attempt fails.
//! - Shutdown (watch signal) closes the transport, publishes nothing
//!   further, and settles in `Disconnected` from any state.

use crate::broadcaster::EventHub;
use std::time::Duration;
use tagbridge_core::{
    Error, LinkState, Result, ScanEvent,
    constants::{
        RECONNECT_INITIAL_DELAY, RECONNECT_MAX_ATTEMPTS, RECONNECT_MAX_DELAY, SETTLE_DELAY,
    },
};
use tagbridge_protocol::{Frame, MessageInterpreter, StreamParser, commands};
use tagbridge_serial::{PortResolver, SerialTransport, UsbPortResolver};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use bytes::Bytes;

/// Tuning knobs for the supervisor.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Wait between opening the port and sending the start-stream command.
    pub settle_delay: Duration,

    /// First reconnect backoff step.
    pub reconnect_initial_delay: Duration,

    /// Backoff ceiling.
    pub reconnect_max_delay: Duration,

    /// Reconnect attempts before giving up.
    pub reconnect_max_attempts: u32,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            settle_delay: SETTLE_DELAY,
            reconnect_initial_delay: RECONNECT_INITIAL_DELAY,
            reconnect_max_delay: RECONNECT_MAX_DELAY,
            reconnect_max_attempts: RECONNECT_MAX_ATTEMPTS,
        }
    }
}

/// Why the streaming loop returned.
enum StreamOutcome {
    /// Shutdown was requested.
    Shutdown,
    /// The byte stream ended or a write failed; the link is gone.
    LinkLost,
}

/// How a reconnect cycle ended.
enum ReconnectOutcome {
    Restored(mpsc::Receiver<Bytes>),
    GaveUp,
    Shutdown,
}

/// Lifecycle supervisor bridging one reader to the event hub.
pub struct ReaderBridge<T: SerialTransport, R: PortResolver = UsbPortResolver> {
    transport: T,
    resolver: R,
    hub: EventHub,
    config: BridgeConfig,
    state: LinkState,
    parser: StreamParser,
    interpreter: MessageInterpreter,
}

impl<T: SerialTransport> ReaderBridge<T> {
    /// Create a bridge using host port discovery and default tuning.
    pub fn new(transport: T, hub: EventHub) -> Self {
        Self::with_resolver(transport, UsbPortResolver, hub, BridgeConfig::default())
    }
}

impl<T: SerialTransport, R: PortResolver> ReaderBridge<T, R> {
    /// Create a bridge with an explicit resolver and tuning.
    pub fn with_resolver(transport: T, resolver: R, hub: EventHub, config: BridgeConfig) -> Self {
        Self {
            transport,
            resolver,
            hub,
            config,
            state: LinkState::Disconnected,
            parser: StreamParser::new(),
            interpreter: MessageInterpreter::new(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Run the bridge until shutdown or a terminal failure.
    ///
    /// Send `true` on the watch channel (or drop its sender) to request
    /// shutdown. Returns `Ok(())` both on shutdown and when the lifecycle
    /// settles in `Disconnected` after a non-recoverable failure — those
    /// are reported to subscribers as events, not as process errors.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let mut chunk_rx = match self.connect().await {
            Ok(rx) => rx,
            Err(e) => {
                error!(error = %e, "bridge startup failed");
                self.hub.publish(&ScanEvent::error(e.to_string()));
                self.enter_disconnected().await;
                return Ok(());
            }
        };

        loop {
            match self.stream(&mut chunk_rx, &mut shutdown).await {
                StreamOutcome::Shutdown => {
                    info!("shutdown requested, closing link");
                    self.enter_disconnected().await;
                    return Ok(());
                }
                StreamOutcome::LinkLost => {
                    warn!("link lost while streaming");
                    self.hub.publish(&ScanEvent::status("Scanner disconnected"));
                    self.transition(LinkState::Reconnecting)?;
                    self.parser.clear();

                    match self.reconnect(&mut shutdown).await? {
                        ReconnectOutcome::Restored(rx) => chunk_rx = rx,
                        ReconnectOutcome::GaveUp => {
                            self.hub.publish(&ScanEvent::error(format!(
                                "Reconnect failed after {} attempts",
                                self.config.reconnect_max_attempts
                            )));
                            self.enter_disconnected().await;
                            return Ok(());
                        }
                        ReconnectOutcome::Shutdown => {
                            info!("shutdown requested during reconnect");
                            self.enter_disconnected().await;
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    /// One full resolve → open pass, publishing the status trail.
    async fn connect(&mut self) -> Result<mpsc::Receiver<Bytes>> {
        self.transition(LinkState::Resolving)?;
        let port = self.resolver.resolve()?;
        info!(port = %port, "reader port selected");
        self.hub
            .publish(&ScanEvent::status(format!("Connecting to {port}...")));

        self.transition(LinkState::Connecting)?;
        let rx = self.transport.open(&port).await?;

        self.transition(LinkState::Ready)?;
        self.hub
            .publish(&ScanEvent::status("Scanner ready - waiting for NFC tags"));
        Ok(rx)
    }

    /// Steady-state streaming: pump bytes through parser and interpreter
    /// until the link drops or shutdown is requested. Sends the
    /// start-stream command once the settle delay elapses.
    async fn stream(
        &mut self,
        chunk_rx: &mut mpsc::Receiver<Bytes>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> StreamOutcome {
        let settle = tokio::time::sleep(self.config.settle_delay);
        tokio::pin!(settle);
        let mut stream_started = false;

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    // A dropped sender counts as a shutdown request too.
                    if changed.is_err() || *shutdown.borrow() {
                        return StreamOutcome::Shutdown;
                    }
                }
                _ = &mut settle, if !stream_started => {
                    stream_started = true;
                    let frame = Frame::encode(&commands::start_stream());
                    match self.transport.write(frame.as_bytes()).await {
                        Ok(()) => debug!("start-stream command sent"),
                        Err(e) => {
                            warn!(error = %e, "start-stream write failed");
                            return StreamOutcome::LinkLost;
                        }
                    }
                }
                chunk = chunk_rx.recv() => {
                    match chunk {
                        Some(bytes) => self.pump(&bytes),
                        None => return StreamOutcome::LinkLost,
                    }
                }
            }
        }
    }

    /// Feed one chunk through the parser and publish resulting events in
    /// frame-completion order.
    fn pump(&mut self, bytes: &[u8]) {
        self.parser.feed(bytes);
        let interpreter = self.interpreter;
        for message in self.parser.drain_messages() {
            if let Some(event) = interpreter.interpret(&message) {
                debug!(event = ?event.uid(), "publishing event");
                self.hub.publish(&event);
            }
        }
    }

    /// Capped exponential backoff reconnect cycle.
    ///
    /// Failed attempts are logged, not published — a single root-cause
    /// link loss must not flood subscribers with error events.
    async fn reconnect(
        &mut self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<ReconnectOutcome> {
        let mut delay = self.config.reconnect_initial_delay;

        for attempt in 1..=self.config.reconnect_max_attempts {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return Ok(ReconnectOutcome::Shutdown);
                    }
                }
                _ = tokio::time::sleep(delay) => {}
            }

            match self.connect().await {
                Ok(rx) => {
                    info!(attempt, "link restored");
                    return Ok(ReconnectOutcome::Restored(rx));
                }
                Err(e) => {
                    warn!(attempt, error = %e, "reconnect attempt failed");
                    // A failed attempt falls back to Disconnected; the next
                    // pass re-enters Resolving through the normal edge.
                    self.force_disconnected();
                    delay = (delay * 2).min(self.config.reconnect_max_delay);
                }
            }
        }

        Ok(ReconnectOutcome::GaveUp)
    }

    /// Close the transport and settle in `Disconnected`.
    async fn enter_disconnected(&mut self) {
        if let Err(e) = self.transport.close().await {
            warn!(error = %e, "transport close failed");
        }
        self.force_disconnected();
    }

    /// Validated state transition.
    fn transition(&mut self, next: LinkState) -> Result<()> {
        if !self.state.can_transition_to(&next) {
            return Err(Error::InvalidStateTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        debug!(from = %self.state, to = %next, "link state transition");
        self.state = next;
        Ok(())
    }

    /// `Disconnected` is reachable from anywhere (shutdown rule), so this
    /// cannot fail.
    fn force_disconnected(&mut self) {
        debug!(from = %self.state, "link state forced to Disconnected");
        self.state = LinkState::Disconnected;
    }
}
