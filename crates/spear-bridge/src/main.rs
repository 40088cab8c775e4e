//! S.P.E.A.R. bridge entry point.
//!
//! Forwards UDP datagrams over a Manchester-coded pulse link and forwards
//! frames decoded from the link back to the most recent UDP sender.
//!
//! # Usage
//!
//! ```text
//! spear-bridge [OPTIONS]
//!
//! Options:
//!   --config <PATH>          Config file [default: platform config dir]
//!   --bind <IP>              Network bind address [default: 0.0.0.0]
//!   --port <PORT>            Network UDP port [default: 24900]
//!   --max-payload <BYTES>    Largest accepted datagram [default: 1024]
//!   --transport <KIND>       loopback | udp [default: loopback]
//!   --link-local <ADDR>      Wire endpoint of this bridge (udp transport)
//!   --link-remote <ADDR>     Wire endpoint of the far bridge (udp transport)
//!   --loop-period-ms <MS>    Polling period [default: 5]
//!   --preview-bytes <N>      Hex preview length in logs, 0 disables [default: 8]
//!   --test-pattern <N>       Send N bytes of 0xAA at startup
//!   --write-config           Save the effective config and exit
//! ```
//!
//! # Precedence
//!
//! CLI flag > `SPEAR_*` environment variable > config file > built-in default.
//!
//! | Variable               | Flag               |
//! |------------------------|--------------------|
//! | `SPEAR_CONFIG`         | `--config`         |
//! | `SPEAR_BIND`           | `--bind`           |
//! | `SPEAR_PORT`           | `--port`           |
//! | `SPEAR_MAX_PAYLOAD`    | `--max-payload`    |
//! | `SPEAR_TRANSPORT`      | `--transport`      |
//! | `SPEAR_LINK_LOCAL`     | `--link-local`     |
//! | `SPEAR_LINK_REMOTE`    | `--link-remote`    |
//! | `SPEAR_LOOP_PERIOD_MS` | `--loop-period-ms` |
//! | `SPEAR_PREVIEW_BYTES`  | `--preview-bytes`  |
//! | `SPEAR_TEST_PATTERN`   | `--test-pattern`   |

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use spear_bridge::domain::{BridgeConfig, TransportKind};
use spear_bridge::infrastructure::{config_file_path, load_config_from, run_bridge, save_config_to};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// S.P.E.A.R. datagram-to-pulse bridge.
///
/// Every override is optional so that values from the config file survive
/// unless explicitly replaced.
#[derive(Debug, Parser)]
#[command(
    name = "spear-bridge",
    about = "Bridge UDP datagrams over a Manchester-coded optical link",
    version
)]
struct Cli {
    /// Path of the TOML config file.
    #[arg(long, env = "SPEAR_CONFIG")]
    config: Option<PathBuf>,

    /// IP address the network socket binds to.
    #[arg(long, env = "SPEAR_BIND")]
    bind: Option<String>,

    /// UDP port the network socket listens on.
    #[arg(long, env = "SPEAR_PORT")]
    port: Option<u16>,

    /// Largest accepted datagram payload in bytes.
    #[arg(long, env = "SPEAR_MAX_PAYLOAD")]
    max_payload: Option<usize>,

    /// Pulse transport: `loopback` or `udp`.
    #[arg(long, env = "SPEAR_TRANSPORT")]
    transport: Option<TransportKind>,

    /// Local wire endpoint (`udp` transport).
    #[arg(long, env = "SPEAR_LINK_LOCAL")]
    link_local: Option<String>,

    /// Remote wire endpoint (`udp` transport).
    #[arg(long, env = "SPEAR_LINK_REMOTE")]
    link_remote: Option<String>,

    /// Polling loop period in milliseconds.
    #[arg(long, env = "SPEAR_LOOP_PERIOD_MS")]
    loop_period_ms: Option<u64>,

    /// Number of payload bytes previewed as hex in logs.
    #[arg(long, env = "SPEAR_PREVIEW_BYTES")]
    preview_bytes: Option<usize>,

    /// Bytes of 0xAA to transmit once at startup (0 = none).
    #[arg(long, default_value_t = 0, env = "SPEAR_TEST_PATTERN")]
    test_pattern: usize,

    /// Write the effective configuration to the config path and exit.
    #[arg(long)]
    write_config: bool,
}

impl Cli {
    /// The config file to read, explicit or platform default.
    fn config_path(&self) -> anyhow::Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => config_file_path().context("no --config given"),
        }
    }

    /// Applies every flag that was given on top of `config`.
    fn apply_overrides(&self, config: &mut BridgeConfig) {
        if let Some(bind) = &self.bind {
            config.network.bind_address = bind.clone();
        }
        if let Some(port) = self.port {
            config.network.port = port;
        }
        if let Some(max_payload) = self.max_payload {
            config.network.max_payload = max_payload;
        }
        if let Some(transport) = self.transport {
            config.link.transport = transport;
        }
        if let Some(local) = &self.link_local {
            config.link.local_address = local.clone();
        }
        if let Some(remote) = &self.link_remote {
            config.link.remote_address = remote.clone();
        }
        if let Some(period) = self.loop_period_ms {
            config.loop_period_ms = period;
        }
        if let Some(preview) = self.preview_bytes {
            config.logging.preview_bytes = preview;
        }
    }

    /// Loads the config file, applies overrides, and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// merged configuration is invalid.
    fn into_bridge_config(&self) -> anyhow::Result<BridgeConfig> {
        let path = self.config_path()?;
        let mut config = load_config_from(&path)
            .with_context(|| format!("failed to load config from {}", path.display()))?;
        self.apply_overrides(&mut config);
        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.into_bridge_config()?;

    // ── Logging setup ─────────────────────────────────────────────────────────
    //
    // `RUST_LOG` wins; otherwise the configured level applies.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    if cli.write_config {
        let path = cli.config_path()?;
        save_config_to(&path, &config)
            .with_context(|| format!("failed to write config to {}", path.display()))?;
        info!("configuration written to {}", path.display());
        return Ok(());
    }

    info!(
        "S.P.E.A.R. bridge starting: network={}:{}, transport={}",
        config.network.bind_address, config.network.port, config.link.transport
    );

    // ── Graceful shutdown flag ─────────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, initiating graceful shutdown");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    run_bridge(config, running, cli.test_pattern).await?;

    info!("S.P.E.A.R. bridge stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
