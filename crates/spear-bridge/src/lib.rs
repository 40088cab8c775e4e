//! spear-bridge library crate.
//!
//! Moves datagrams between a packet network and a point-to-point pulse link
//! (free-space optical or wired), using the `spear-core` line code.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! UDP peer (datagrams)
//!         ↕
//! [spear-bridge]
//!   ├── domain/           Pure types: BridgeConfig, LinkLogRecord
//!   ├── application/      BridgeController: both traffic directions, one tick at a time
//!   └── infrastructure/
//!         ├── udp_port/   Non-blocking UDP datagram boundary
//!         ├── capture/    Glitch filter, level merge, idle split, bounded queue
//!         ├── loopback/   In-process pulse transport
//!         ├── wire_link/  Pulse batches over UDP (emulated wire)
//!         ├── storage/    TOML config file
//!         └── runner/     Cooperative polling loop
//!         ↕
//! Pulse link (timed level transitions)
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O and no async.
//! - `application` depends on `domain` and `spear-core` only; it talks to the
//!   outside world through the [`application::DatagramPort`] and
//!   [`application::PulseTransport`] traits.
//! - `infrastructure` implements those traits and owns every socket and timer.

/// Domain layer: configuration and log record types (no I/O).
pub mod domain;

/// Application layer: the bridge controller and its boundary traits.
pub mod application;

/// Infrastructure layer: sockets, pulse transports, config files, poll loop.
pub mod infrastructure;
