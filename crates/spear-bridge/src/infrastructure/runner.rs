//! Cooperative polling loop.
//!
//! One tokio interval drives one [`BridgeController::poll_once`] per period.
//! The loop never spawns: both boundaries are non-blocking, so a tick is
//! bounded by the encode/decode cost of at most one payload each way.
//!
//! Shutdown is cooperative.  The caller owns an `AtomicBool` that a Ctrl+C
//! handler clears; the loop checks it once per tick and returns.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use tokio::time::MissedTickBehavior;
use tracing::{info, trace};

use crate::application::{BridgeController, BridgeStats, DatagramPort, PulseTransport};
use crate::domain::{BridgeConfig, TransportKind};
use crate::infrastructure::capture::PulseCapture;
use crate::infrastructure::loopback::LoopbackTransport;
use crate::infrastructure::udp_port::UdpDatagramPort;
use crate::infrastructure::wire_link::UdpPulseTransport;

/// Polls `controller` every `period` until `running` is cleared.
///
/// Returns the number of ticks executed.
pub async fn run_loop<N, T>(
    controller: &mut BridgeController<N, T>,
    period: Duration,
    running: Arc<AtomicBool>,
) -> u64
where
    N: DatagramPort,
    T: PulseTransport,
{
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut ticks = 0u64;
    while running.load(Ordering::Relaxed) {
        ticker.tick().await;
        let outcome = controller.poll_once();
        ticks += 1;
        if !outcome.is_idle() {
            trace!(?outcome, "tick");
        }
    }
    ticks
}

/// Builds the transport named in `config.link`.
///
/// # Errors
///
/// Returns an error if the wire addresses are invalid or cannot be bound.
fn build_transport(config: &BridgeConfig) -> anyhow::Result<Box<dyn PulseTransport>> {
    let link = &config.link;
    let transport: Box<dyn PulseTransport> = match link.transport {
        TransportKind::Loopback => Box::new(LoopbackTransport::from_config(link)),
        TransportKind::Udp => {
            let local = link.local_addr()?;
            let remote = link.remote_addr()?;
            let transport = UdpPulseTransport::bind(local, remote, PulseCapture::from_config(link))
                .with_context(|| format!("failed to bind pulse wire on {local}"))?;
            Box::new(transport)
        }
    };
    Ok(transport)
}

/// Binds both boundaries from `config`, optionally sends a test pattern, and
/// runs the polling loop until `running` is cleared.
///
/// Returns the final statistics.
///
/// # Errors
///
/// Returns an error if either boundary cannot be set up, or if the test
/// pattern cannot be transmitted.
pub async fn run_bridge(
    config: BridgeConfig,
    running: Arc<AtomicBool>,
    test_pattern: usize,
) -> anyhow::Result<BridgeStats> {
    let bind = config.network.bind_addr()?;
    let network = UdpDatagramPort::bind(bind)
        .with_context(|| format!("failed to bind network port on {bind}"))?;
    let transport = build_transport(&config)?;

    info!(
        transport = %config.link.transport,
        bit_rate_bps = config.link.bit_rate_bps(),
        tick_ns = config.link.tick_ns,
        half_bit_ticks = config.link.half_bit_ticks,
        max_payload = config.network.max_payload,
        loop_period_ms = config.loop_period_ms,
        "bridge running"
    );

    let mut controller = BridgeController::new(network, transport, &config);

    if test_pattern > 0 {
        controller
            .transmit_test_pattern(test_pattern)
            .context("failed to transmit test pattern")?;
    }

    let ticks = run_loop(&mut controller, config.loop_period(), running).await;
    info!(ticks, "polling loop stopped");
    controller.log_stats();
    Ok(controller.stats())
}
