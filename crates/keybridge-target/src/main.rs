//! KeyBridge target entry point.
//!
//! Creates the virtual keyboard, waits for one controller connection and
//! replays its key events until the controller disconnects or Ctrl-C is
//! pressed.  Creating the uinput device normally requires root.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config()             -- target.toml or defaults
//!  └─ platform_keyboard()       -- uinput device, released on exit
//!  └─ bind()                    -- 0.0.0.0:65432
//!  └─ serve_single_session()    -- one controller, then exit
//! ```

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use keybridge_core::KeyIdentifierTable;
use keybridge_target::application::inject_keys::InjectKeysUseCase;
use keybridge_target::infrastructure::input_emulation::platform_keyboard;
use keybridge_target::infrastructure::network::{bind, serve_single_session, SessionEnd};
use keybridge_target::infrastructure::storage::config::{config_file_path, load_config};

/// Receive keyboard events from a KeyBridge controller and replay them.
#[derive(Debug, Parser)]
#[command(name = "keybridge-target", version, about)]
struct Cli {}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _cli = Cli::parse();
    let config = load_config().context("failed to load target configuration")?;

    // Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.target.log_level)),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "KeyBridge target starting");
    if let Ok(path) = config_file_path() {
        info!("configuration: {}", path.display());
    }
    let addr = config
        .network
        .listen_addr()
        .context("invalid [network] section")?;

    let table = KeyIdentifierTable::global();
    let device = platform_keyboard(&config.target.device_name, table)
        .context("failed to create the virtual keyboard (is the target running as root?)")?;
    let use_case = InjectKeysUseCase::new(table, device);

    let listener = bind(addr).await?;

    tokio::select! {
        result = serve_single_session(listener, use_case) => {
            let report = result?;
            match report.end {
                SessionEnd::PeerClosed => info!(session_id = %report.session_id, "session complete"),
                SessionEnd::ReadError(e) => warn!(session_id = %report.session_id, "session aborted: {e}"),
            }
        }
        _ = tokio::signal::ctrl_c() => info!("shutdown signal received"),
    }

    info!("KeyBridge target stopped");
    Ok(())
}
