//! KeyBridge controller entry point.
//!
//! Connects to the target, installs the global keyboard hook, and then waits
//! until the connection is lost or Ctrl-C is pressed.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config()             -- controller.toml or defaults
//!  └─ TcpTransmitter::connect() -- one TCP connection, keep-alive on
//!  └─ ControlToggle::start()    -- hook installed in local mode
//!       └─ CaptureService       -- runs on the OS hook thread
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use keybridge_controller::application::capture_service::{CaptureService, EventTransmitter};
use keybridge_controller::application::control::ControlToggle;
use keybridge_controller::infrastructure::input_capture::platform_hook;
use keybridge_controller::infrastructure::network::TcpTransmitter;
use keybridge_controller::infrastructure::storage::config::{config_file_path, load_config};
use keybridge_core::KeyIdentifierTable;

/// How often the main task checks whether the connection is still alive.
const CONNECTION_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Forward this machine's keyboard to a KeyBridge target.
#[derive(Debug, Parser)]
#[command(name = "keybridge-controller", version, about)]
struct Cli {
    /// Host name or IP address of the target machine.
    host: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config().context("failed to load controller configuration")?;

    // Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.controller.log_level)),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "KeyBridge controller starting");
    if let Ok(path) = config_file_path() {
        info!("configuration: {}", path.display());
    }
    let hotkey = config.controller.hotkey.clone();
    if !KeyIdentifierTable::global().contains_name(&hotkey) {
        warn!("hotkey {hotkey:?} is not a known key name; it may never match");
    }

    let transmitter = Arc::new(
        TcpTransmitter::connect(&cli.host, config.network.port, config.network.keepalive)
            .await
            .with_context(|| format!("failed to connect to {}:{}", cli.host, config.network.port))?,
    );

    let hook = platform_hook().context("keyboard capture is unavailable")?;
    let toggle = Arc::new(ControlToggle::new(hook, config.controller.restart_pause()));
    let service = CaptureService::new(hotkey.clone(), Arc::clone(&toggle), transmitter.clone());
    toggle
        .start(service.handler())
        .context("failed to install the keyboard hook")?;

    info!("ready; press {hotkey} to toggle forwarding, Ctrl-C to exit");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("shutdown signal received"),
        _ = wait_for_disconnect(transmitter.as_ref()) => warn!("connection to target lost"),
    }

    toggle.shutdown();
    transmitter.close();
    info!("KeyBridge controller stopped");
    Ok(())
}

async fn wait_for_disconnect(transmitter: &dyn EventTransmitter) {
    while transmitter.is_connected() {
        tokio::time::sleep(CONNECTION_POLL_INTERVAL).await;
    }
}
