//! Application layer for spear-bridge.
//!
//! - **`bridge_service`** – [`BridgeController`]: on each scheduler tick it
//!   moves at most one datagram from the network onto the link and at most one
//!   captured pulse batch from the link back to the network.  The network and
//!   the link are reached only through the [`DatagramPort`] and
//!   [`PulseTransport`] traits, so the controller runs unchanged against real
//!   sockets, the in-process loopback, or test doubles.

pub mod bridge_service;

pub use bridge_service::{
    BridgeController, BridgeStats, CapturedBatch, DatagramPort, LinkToNet, NetToLink,
    PollOutcome, PortError, PulseTransport, TransportError,
};
