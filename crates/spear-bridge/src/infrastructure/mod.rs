//! Infrastructure layer for spear-bridge.
//!
//! # Modules
//!
//! - **`udp_port`** – [`UdpDatagramPort`], the network side: a non-blocking
//!   std `UdpSocket` implementing `DatagramPort`.
//! - **`capture`** – [`PulseCapture`], the receive model every pulse
//!   transport shares: glitch filter, level merge, idle split, bounded queue.
//! - **`loopback`** – [`LoopbackTransport`], transmit feeds its own capture.
//! - **`wire_link`** – [`UdpPulseTransport`], pulse batches as bincode
//!   datagrams between two bridge instances.
//! - **`storage`** – TOML config file load/save.
//! - **`runner`** – the tokio-paced polling loop and process wiring.

pub mod capture;
pub mod loopback;
pub mod runner;
pub mod storage;
pub mod udp_port;
pub mod wire_link;

pub use capture::PulseCapture;
pub use loopback::LoopbackTransport;
pub use runner::{run_bridge, run_loop};
pub use storage::{config_file_path, load_config_from, save_config_to, StorageError};
pub use udp_port::UdpDatagramPort;
pub use wire_link::UdpPulseTransport;
