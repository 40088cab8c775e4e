//! Bridge configuration types.
//!
//! [`BridgeConfig`] is the single source of truth for all runtime settings.
//! It is deserialized from the TOML config file (see
//! `infrastructure::storage`), then overridden field by field from CLI
//! arguments and `SPEAR_*` environment variables.
//!
//! Every field carries a `#[serde(default = "...")]` so that a partial config
//! file, or none at all, still yields a complete configuration.
//!
//! ```toml
//! loop_period_ms = 5
//!
//! [network]
//! bind_address = "0.0.0.0"
//! port = 24900
//! max_payload = 1024
//!
//! [link]
//! transport = "loopback"
//! tick_ns = 50
//! half_bit_ticks = 10
//! idle_threshold_ticks = 2000
//!
//! [link.timing]
//! short_min = 7
//! short_max = 13
//! long_min = 17
//! long_max = 23
//! ```

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use spear_core::{PulseClass, Ticks, TimingProfile};
use thiserror::Error;

/// A configuration value that parses but cannot drive a working link.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A socket address string failed to parse.
    #[error("invalid {field} address '{value}'")]
    Address { field: &'static str, value: String },

    /// Unknown transport name.
    #[error("unknown transport '{0}' (expected 'loopback' or 'udp')")]
    UnknownTransport(String),

    /// Any other out-of-range value.
    #[error("{0}")]
    Invalid(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BridgeConfig {
    /// Period of the cooperative polling loop in milliseconds.
    #[serde(default = "default_loop_period_ms")]
    pub loop_period_ms: u64,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub link: LinkConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Packet network side of the bridge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    /// IP address the UDP socket binds to.  `"0.0.0.0"` binds all interfaces.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// UDP port the bridge listens on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Largest accepted datagram payload in bytes.  Larger datagrams are
    /// rejected before encoding.
    #[serde(default = "default_max_payload")]
    pub max_payload: usize,
}

/// Which pulse transport carries the link.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Transmitted pulses are captured by the same bridge.
    #[default]
    Loopback,
    /// Pulse batches travel as UDP datagrams to a second bridge instance.
    Udp,
}

/// Pulse link side of the bridge.  All durations are in ticks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinkConfig {
    #[serde(default)]
    pub transport: TransportKind,
    /// Local address of the emulated wire (`udp` transport only).
    #[serde(default = "default_link_local")]
    pub local_address: String,
    /// Address of the remote bridge's wire endpoint (`udp` transport only).
    #[serde(default = "default_link_remote")]
    pub remote_address: String,
    /// Length of one tick in nanoseconds.
    #[serde(default = "default_tick_ns")]
    pub tick_ns: u32,
    /// Width of one transmitted half-bit.
    #[serde(default = "default_half_bit_ticks")]
    pub half_bit_ticks: Ticks,
    /// Continuous inactivity that ends a capture batch.
    #[serde(default = "default_idle_threshold_ticks")]
    pub idle_threshold_ticks: Ticks,
    /// Pulses shorter than this are discarded by the capture filter.
    #[serde(default = "default_filter_min_ticks")]
    pub filter_min_ticks: Ticks,
    /// Maximum number of captured events waiting to be decoded.
    #[serde(default = "default_capture_capacity")]
    pub capture_capacity: usize,
    /// Receive classification windows.
    #[serde(default)]
    pub timing: TimingProfile,
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Number of leading payload bytes shown as hex in forwarding logs.
    /// `0` disables the preview.
    #[serde(default = "default_preview_bytes")]
    pub preview_bytes: usize,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_loop_period_ms() -> u64 {
    5
}
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    24900
}
fn default_max_payload() -> usize {
    1024
}
fn default_link_local() -> String {
    "0.0.0.0:24910".to_string()
}
fn default_link_remote() -> String {
    "127.0.0.1:24911".to_string()
}
fn default_tick_ns() -> u32 {
    50
}
fn default_half_bit_ticks() -> Ticks {
    TimingProfile::REFERENCE_HALF_BIT
}
fn default_idle_threshold_ticks() -> Ticks {
    2000
}
fn default_filter_min_ticks() -> Ticks {
    2
}
fn default_capture_capacity() -> usize {
    16_384
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_preview_bytes() -> usize {
    8
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            loop_period_ms: default_loop_period_ms(),
            network: NetworkConfig::default(),
            link: LinkConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            max_payload: default_max_payload(),
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::default(),
            local_address: default_link_local(),
            remote_address: default_link_remote(),
            tick_ns: default_tick_ns(),
            half_bit_ticks: default_half_bit_ticks(),
            idle_threshold_ticks: default_idle_threshold_ticks(),
            filter_min_ticks: default_filter_min_ticks(),
            capture_capacity: default_capture_capacity(),
            timing: TimingProfile::reference(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            preview_bytes: default_preview_bytes(),
        }
    }
}

// ── Derived values and validation ─────────────────────────────────────────────

impl BridgeConfig {
    /// Polling loop period.
    pub fn loop_period(&self) -> Duration {
        Duration::from_millis(self.loop_period_ms)
    }

    /// Checks every cross-field constraint the link depends on.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.loop_period_ms == 0 {
            return Err(ConfigError::Invalid(
                "loop_period_ms must be at least 1".to_string(),
            ));
        }
        if self.network.max_payload == 0 {
            return Err(ConfigError::Invalid(
                "max_payload must be at least 1 byte".to_string(),
            ));
        }
        self.network.bind_addr()?;
        self.link.validate()
    }
}

impl NetworkConfig {
    /// The UDP listen address built from `bind_address` and `port`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Address`] if `bind_address` is not an IP literal.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let value = format!("{}:{}", self.bind_address, self.port);
        value.parse().map_err(|_| ConfigError::Address {
            field: "bind",
            value,
        })
    }
}

impl LinkConfig {
    /// Data rate implied by the tick length and half-bit width.
    ///
    /// 50 ns ticks with 10-tick half-bits give 1 µs per bit, i.e. 1 Mbps.
    pub fn bit_rate_bps(&self) -> u64 {
        let bit_ns = 2 * u64::from(self.half_bit_ticks) * u64::from(self.tick_ns);
        if bit_ns == 0 {
            return 0;
        }
        1_000_000_000 / bit_ns
    }

    /// Length of one idle gap in wall-clock time.
    pub fn idle_threshold(&self) -> Duration {
        Duration::from_nanos(u64::from(self.idle_threshold_ticks) * u64::from(self.tick_ns))
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ConfigError> {
        parse_addr("link local", &self.local_address)
    }

    pub fn remote_addr(&self) -> Result<SocketAddr, ConfigError> {
        parse_addr("link remote", &self.remote_address)
    }

    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Window ordering is already enforced by `TimingProfile` itself.
        let t = &self.timing;
        if self.tick_ns == 0 {
            return Err(ConfigError::Invalid("tick_ns must be at least 1".to_string()));
        }
        if t.classify(self.half_bit_ticks) != PulseClass::Short
            || t.classify(2 * self.half_bit_ticks) != PulseClass::Long
        {
            return Err(ConfigError::Invalid(format!(
                "half_bit_ticks {} does not fit the receive windows \
                 (short {}..={}, long {}..={})",
                self.half_bit_ticks,
                t.short_min(),
                t.short_max(),
                t.long_min(),
                t.long_max()
            )));
        }
        if self.filter_min_ticks >= t.short_min() {
            return Err(ConfigError::Invalid(format!(
                "filter_min_ticks {} would discard valid short pulses (short_min {})",
                self.filter_min_ticks,
                t.short_min()
            )));
        }
        if self.idle_threshold_ticks <= t.long_max() {
            return Err(ConfigError::Invalid(format!(
                "idle_threshold_ticks {} must exceed long_max {}",
                self.idle_threshold_ticks,
                t.long_max()
            )));
        }
        if self.capture_capacity == 0 {
            return Err(ConfigError::Invalid(
                "capture_capacity must be at least 1 event".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_addr(field: &'static str, value: &str) -> Result<SocketAddr, ConfigError> {
    value.parse().map_err(|_| ConfigError::Address {
        field,
        value: value.to_string(),
    })
}

impl FromStr for TransportKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "loopback" => Ok(Self::Loopback),
            "udp" => Ok(Self::Udp),
            _ => Err(ConfigError::UnknownTransport(s.to_string())),
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loopback => f.write_str("loopback"),
            Self::Udp => f.write_str("udp"),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_port_is_24900() {
        // Arrange / Act
        let cfg = BridgeConfig::default();
        // Assert
        assert_eq!(cfg.network.port, 24900);
        assert_eq!(cfg.network.bind_addr().unwrap().port(), 24900);
    }

    #[test]
    fn test_default_link_uses_reference_timing() {
        let cfg = LinkConfig::default();
        assert_eq!(cfg.tick_ns, 50);
        assert_eq!(cfg.half_bit_ticks, 10);
        assert_eq!(cfg.timing, TimingProfile::reference());
        assert_eq!(cfg.idle_threshold_ticks, 2000);
        assert_eq!(cfg.filter_min_ticks, 2);
    }

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(BridgeConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_reference_bit_rate_is_one_megabit() {
        assert_eq!(LinkConfig::default().bit_rate_bps(), 1_000_000);
    }

    #[test]
    fn test_reference_idle_threshold_is_100_microseconds() {
        assert_eq!(LinkConfig::default().idle_threshold(), Duration::from_micros(100));
    }

    #[test]
    fn test_empty_toml_yields_defaults() {
        // Arrange / Act
        let cfg: BridgeConfig = toml::from_str("").unwrap();
        // Assert
        assert_eq!(cfg, BridgeConfig::default());
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        // Arrange
        let text = r#"
            [network]
            port = 9000

            [link]
            transport = "udp"
        "#;

        // Act
        let cfg: BridgeConfig = toml::from_str(text).unwrap();

        // Assert
        assert_eq!(cfg.network.port, 9000);
        assert_eq!(cfg.network.max_payload, 1024);
        assert_eq!(cfg.link.transport, TransportKind::Udp);
        assert_eq!(cfg.link.half_bit_ticks, 10);
    }

    #[test]
    fn test_toml_with_overlapping_windows_is_rejected() {
        let text = r#"
            [link.timing]
            short_min = 7
            short_max = 18
            long_min = 17
            long_max = 23
        "#;
        assert!(toml::from_str::<BridgeConfig>(text).is_err());
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        // Arrange
        let mut cfg = BridgeConfig::default();
        cfg.link.timing = TimingProfile::from_nominal(25, 5).unwrap();
        cfg.link.half_bit_ticks = 25;
        cfg.logging.preview_bytes = 0;

        // Act
        let text = toml::to_string_pretty(&cfg).expect("serialize");
        let restored: BridgeConfig = toml::from_str(&text).expect("deserialize");

        // Assert
        assert_eq!(cfg, restored);
    }

    #[test]
    fn test_validate_rejects_zero_max_payload() {
        let mut cfg = BridgeConfig::default();
        cfg.network.max_payload = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let mut cfg = BridgeConfig::default();
        cfg.link.capture_capacity = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_filter_that_eats_short_pulses() {
        let mut cfg = BridgeConfig::default();
        cfg.link.filter_min_ticks = 7;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_idle_threshold_inside_long_window() {
        let mut cfg = BridgeConfig::default();
        cfg.link.idle_threshold_ticks = 23;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_half_bit_outside_short_window() {
        // 14 ticks is noise for the reference profile.
        let mut cfg = BridgeConfig::default();
        cfg.link.half_bit_ticks = 14;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_bind_address() {
        let mut cfg = BridgeConfig::default();
        cfg.network.bind_address = "not.an.ip".to_string();
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Address { field: "bind", .. })
        ));
    }

    #[test]
    fn test_transport_kind_parses_case_insensitively() {
        assert_eq!("UDP".parse::<TransportKind>().unwrap(), TransportKind::Udp);
        assert_eq!(
            "loopback".parse::<TransportKind>().unwrap(),
            TransportKind::Loopback
        );
        assert!("serial".parse::<TransportKind>().is_err());
    }

    #[test]
    fn test_link_addresses_parse() {
        let cfg = LinkConfig::default();
        assert_eq!(cfg.local_addr().unwrap().port(), 24910);
        assert_eq!(cfg.remote_addr().unwrap().port(), 24911);
    }
}
