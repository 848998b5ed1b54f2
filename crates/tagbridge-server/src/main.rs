//! `tagbridge` — bridge a TappyUSB NFC reader to WebSocket subscribers.

use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;
use tagbridge_link::{BridgeConfig, EventHub, ReaderBridge};
use tagbridge_serial::{FixedPortResolver, UsbPortResolver, UsbSerialTransport};
use tagbridge_server::{WsServer, WsServerConfig};
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "tagbridge",
    version,
    about = "Bridges a TappyUSB NFC reader on a serial port to WebSocket subscribers"
)]
struct Args {
    /// Address to serve WebSocket subscribers on
    #[arg(long, default_value = "0.0.0.0:3001")]
    bind: SocketAddr,

    /// Pin the serial port path instead of discovering the reader
    #[arg(long)]
    port: Option<String>,

    /// Delay before the start-stream handshake, in milliseconds
    #[arg(long, default_value_t = 1000)]
    settle_ms: u64,

    /// Reconnect attempts after a link drop before giving up
    #[arg(long, default_value_t = 10)]
    reconnect_attempts: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let hub = EventHub::new();
    let bridge_config = BridgeConfig {
        settle_delay: Duration::from_millis(args.settle_ms),
        reconnect_max_attempts: args.reconnect_attempts,
        ..BridgeConfig::default()
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let transport = UsbSerialTransport::new();
    let bridge_task = match args.port {
        Some(port) => {
            info!(port = %port, "serial port pinned by --port");
            tokio::spawn(
                ReaderBridge::with_resolver(
                    transport,
                    FixedPortResolver(port),
                    hub.clone(),
                    bridge_config,
                )
                .run(shutdown_rx),
            )
        }
        None => tokio::spawn(
            ReaderBridge::with_resolver(transport, UsbPortResolver, hub.clone(), bridge_config)
                .run(shutdown_rx),
        ),
    };

    let server = WsServer::bind(WsServerConfig { bind_addr: args.bind }, hub.clone())
        .await
        .context("binding subscriber endpoint")?;

    tokio::select! {
        result = server.run() => {
            result.context("subscriber endpoint failed")?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received, shutting down");
        }
    }

    let _ = shutdown_tx.send(true);
    let _ = bridge_task.await;

    Ok(())
}
