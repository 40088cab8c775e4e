//! Domain layer for spear-bridge.
//!
//! Plain data: what the bridge is configured to do and what it reports after
//! forwarding traffic.  Nothing here opens a socket, reads a file or awaits.

pub mod config;
pub mod log_record;

pub use config::{
    BridgeConfig, ConfigError, LinkConfig, LoggingConfig, NetworkConfig, TransportKind,
};
pub use log_record::{hex_preview, pulse_preview, Direction, LinkLogRecord};
