//! Bridge daemon: listens for UIMessage stream connections and bridges them
//! to a CAN bus while simulating a gateway device on the bus side.
//!
//! Run with `UIR_CAN_INTERFACE` set to the name of a real bus binding; this
//! build has no driver wired up, so the interface name is accepted but the
//! bridge runs against an in-process `LoopbackCanBus` either way. Leave
//! `UIR_CAN_INTERFACE` unset to run with `NullCanBus` instead.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use uir_gateway::bus::{LoopbackCanBus, NullCanBus};
use uir_gateway::{Bridge, BridgeConfig, GatewayResponder, GatewayState};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match BridgeConfig::from_env(false) {
        Ok(config) => config,
        Err(err) => {
            error!(%err, "failed to load configuration");
            std::process::exit(1);
        }
    };

    let gateway = GatewayResponder::new(
        config.model,
        GatewayState::new(
            config.node_id,
            config.group_id,
            config.can_bitrate,
            config.serial_number,
            config.manufacturer_id,
            config.vendor_id,
        ),
    );

    let shutdown = CancellationToken::new();
    let bridge = if let Some(interface) = &config.can_interface {
        info!(%interface, "CAN interface configured; no driver binding is wired up in this build, running against an in-process loopback bus");
        Arc::new(Bridge::new(config.tcp_addr, Arc::new(LoopbackCanBus::new()), gateway))
    } else {
        info!("no CAN interface configured, running with the stream side only");
        Arc::new(Bridge::new(config.tcp_addr, Arc::new(NullCanBus), gateway))
    };

    let shutdown_signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received shutdown signal");
            shutdown_signal.cancel();
        }
    });

    if let Err(err) = bridge.run(shutdown).await {
        error!(%err, "bridge terminated with an error");
        std::process::exit(1);
    }
}
