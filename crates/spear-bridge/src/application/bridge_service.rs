//! BridgeController: moves payloads between the packet network and the pulse
//! link.
//!
//! # Traffic directions
//!
//! ```text
//! DatagramPort ──► NET_TO_LINK ──► PulseEncoder ──► PulseTransport::transmit
//!      ▲                                                     │ (link)
//!      └── LINK_TO_NET ◄── FrameAssembler ◄── PulseTransport::try_receive
//! ```
//!
//! # Scheduling model
//!
//! [`BridgeController::poll_once`] is one tick of a single-threaded,
//! cooperative loop.  It performs exactly one non-blocking check of each
//! boundary, network first, and returns a [`PollOutcome`] describing what
//! happened.  Nothing inside a tick blocks: both traits report "nothing ready"
//! as `Ok(None)`.
//!
//! # Peer address
//!
//! The network side has exactly one peer: the sender of the most recent
//! accepted datagram.  Decoded frames go to that address.  Until some datagram
//! has arrived there is no peer, and decoded frames are dropped with a warning.
//!
//! # Failure policy
//!
//! No failure is fatal.  Oversize datagrams, transmit errors, capture
//! overflows, empty frames and missing peers are each logged, counted in
//! [`BridgeStats`] and reported in the tick's outcome; the next tick proceeds
//! normally.  There is no retry.

use std::net::SocketAddr;

use spear_core::{FrameAssembler, PulseEncoder, PulseEvent};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::{pulse_preview, BridgeConfig, Direction, LinkLogRecord};

/// Number of pulses shown in the per-batch capture preview.
const CAPTURE_PREVIEW_PULSES: usize = 10;

// ── Errors ────────────────────────────────────────────────────────────────────

/// Error type for the network (datagram) boundary.
#[derive(Debug, Error)]
pub enum PortError {
    #[error("network I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The OS accepted fewer bytes than the datagram holds.
    #[error("datagram truncated: sent {sent} of {len} bytes")]
    Truncated { sent: usize, len: usize },
}

/// Error type for the pulse link boundary.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("link I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A pulse batch could not be serialized or deserialized.
    #[error("pulse batch codec error: {0}")]
    Codec(String),

    /// The batch does not fit in one transport unit.
    #[error("pulse batch of {pulses} events exceeds the transport limit")]
    BatchTooLarge { pulses: usize },
}

// ── Boundary traits ───────────────────────────────────────────────────────────

/// The packet network: connectionless, one datagram per payload.
pub trait DatagramPort: Send {
    /// Receives one datagram into `buf` if one is ready.
    ///
    /// Returns `Ok(None)` immediately when nothing is pending.  A datagram
    /// longer than `buf` is truncated to `buf.len()` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`PortError`] on socket failures other than "would block".
    fn try_recv_from(&mut self, buf: &mut [u8]) -> Result<Option<(usize, SocketAddr)>, PortError>;

    /// Sends `payload` as one datagram to `peer`.
    ///
    /// # Errors
    ///
    /// Returns [`PortError`] if the datagram could not be sent whole.
    fn send_to(&mut self, payload: &[u8], peer: SocketAddr) -> Result<(), PortError>;
}

/// The pulse link: timed level transitions out, captured batches in.
pub trait PulseTransport: Send {
    /// Queues `pulses` for transmission, followed by idle.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the batch could not be handed to the link.
    fn transmit(&mut self, pulses: &[PulseEvent]) -> Result<(), TransportError>;

    /// Takes the oldest idle-bounded capture batch, if any is complete.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the receive side failed.
    fn try_receive(&mut self) -> Result<Option<CapturedBatch>, TransportError>;
}

impl<T: DatagramPort + ?Sized> DatagramPort for Box<T> {
    fn try_recv_from(&mut self, buf: &mut [u8]) -> Result<Option<(usize, SocketAddr)>, PortError> {
        (**self).try_recv_from(buf)
    }

    fn send_to(&mut self, payload: &[u8], peer: SocketAddr) -> Result<(), PortError> {
        (**self).send_to(payload, peer)
    }
}

impl<T: PulseTransport + ?Sized> PulseTransport for Box<T> {
    fn transmit(&mut self, pulses: &[PulseEvent]) -> Result<(), TransportError> {
        (**self).transmit(pulses)
    }

    fn try_receive(&mut self) -> Result<Option<CapturedBatch>, TransportError> {
        (**self).try_receive()
    }
}

/// Everything captured between two idle gaps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedBatch {
    pub pulses: Vec<PulseEvent>,
    /// The capture queue filled while this batch was arriving.
    pub overflowed: bool,
    /// Events discarded because the queue was full.
    pub lost_events: usize,
}

impl CapturedBatch {
    /// A complete batch with no loss.
    pub fn complete(pulses: Vec<PulseEvent>) -> Self {
        Self {
            pulses,
            overflowed: false,
            lost_events: 0,
        }
    }
}

// ── Tick outcome ──────────────────────────────────────────────────────────────

/// What the network → link step did during one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetToLink {
    /// No datagram was pending.
    Idle,
    /// The payload was encoded and handed to the transport.
    Transmitted(LinkLogRecord),
    /// A zero-length datagram: the sender became the peer, nothing was sent.
    PeerRegistered(SocketAddr),
    /// The datagram exceeded `max_payload` and was not encoded.
    Rejected { len: usize, max: usize },
    /// The transport refused the encoded batch.
    TransmitFailed(LinkLogRecord),
    /// The network socket reported an error.
    ReceiveFailed(String),
}

/// What the link → network step did during one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkToNet {
    /// No capture batch was complete.
    Idle,
    /// A decoded frame was sent to the peer.
    Forwarded {
        record: LinkLogRecord,
        peer: SocketAddr,
    },
    /// The batch decoded to zero bytes; nothing was sent.
    EmptyFrame,
    /// A frame was decoded but no peer is known yet.
    DroppedNoPeer(LinkLogRecord),
    /// The capture queue overflowed; the whole batch was discarded.
    Overflowed { lost_events: usize },
    /// The network socket refused the frame.
    SendFailed(LinkLogRecord),
    /// The transport reported an error.
    ReceiveFailed(String),
}

/// Report of one [`BridgeController::poll_once`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome {
    pub net_to_link: NetToLink,
    pub link_to_net: LinkToNet,
}

impl PollOutcome {
    /// `true` when neither boundary had anything to do.
    pub fn is_idle(&self) -> bool {
        self.net_to_link == NetToLink::Idle && self.link_to_net == LinkToNet::Idle
    }
}

/// Running totals since the controller was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeStats {
    pub payloads_received: u64,
    pub payloads_transmitted: u64,
    pub peer_registrations: u64,
    pub oversize_rejected: u64,
    pub transmit_failures: u64,
    pub network_errors: u64,
    pub batches_captured: u64,
    pub frames_forwarded: u64,
    pub empty_frames: u64,
    pub no_peer_drops: u64,
    pub send_failures: u64,
    pub capture_overflows: u64,
    pub link_errors: u64,
    /// Pulses the decoder classified as noise.
    pub noise_dropped: u64,
    /// Trailing bits discarded at the end of decoded batches.
    pub residual_bits: u64,
}

// ── Controller ────────────────────────────────────────────────────────────────

/// Bridges one [`DatagramPort`] and one [`PulseTransport`].
pub struct BridgeController<N, T> {
    network: N,
    transport: T,
    encoder: PulseEncoder,
    assembler: FrameAssembler,
    peer: Option<SocketAddr>,
    max_payload: usize,
    preview_bytes: usize,
    /// One byte larger than `max_payload` so oversize datagrams are visible.
    recv_buf: Vec<u8>,
    stats: BridgeStats,
}

impl<N: DatagramPort, T: PulseTransport> BridgeController<N, T> {
    /// Creates a controller with no peer, using the link timing, payload limit
    /// and preview length from `config`.
    pub fn new(network: N, transport: T, config: &BridgeConfig) -> Self {
        let max_payload = config.network.max_payload;
        Self {
            network,
            transport,
            encoder: PulseEncoder::new(config.link.half_bit_ticks),
            assembler: FrameAssembler::new(config.link.timing),
            peer: None,
            max_payload,
            preview_bytes: config.logging.preview_bytes,
            recv_buf: vec![0; max_payload + 1],
            stats: BridgeStats::default(),
        }
    }

    /// Runs one scheduler tick: network → link, then link → network.
    pub fn poll_once(&mut self) -> PollOutcome {
        let net_to_link = self.pump_network();
        let link_to_net = self.pump_link();
        PollOutcome {
            net_to_link,
            link_to_net,
        }
    }

    /// Transmits `len` bytes of `0xAA`, a bit-rate square wave, onto the link.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the transport refuses the batch.
    pub fn transmit_test_pattern(&mut self, len: usize) -> Result<LinkLogRecord, TransportError> {
        let pattern = vec![0xAA; len];
        let pulses = self.encoder.encode(&pattern);
        self.transport.transmit(&pulses)?;
        let record = LinkLogRecord::new(Direction::NetToLink, &pattern, self.preview_bytes);
        info!(pulses = pulses.len(), "test pattern transmitted");
        record.emit();
        Ok(record)
    }

    /// The address decoded frames are currently sent to.
    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Snapshot of the running totals.
    pub fn stats(&self) -> BridgeStats {
        let assembler = self.assembler.stats();
        BridgeStats {
            empty_frames: assembler.empty_frames,
            noise_dropped: assembler.noise_dropped,
            residual_bits: assembler.discarded_bits,
            ..self.stats
        }
    }

    /// Logs the running totals at `info`.
    pub fn log_stats(&self) {
        let s = self.stats();
        info!(
            payloads_received = s.payloads_received,
            payloads_transmitted = s.payloads_transmitted,
            frames_forwarded = s.frames_forwarded,
            empty_frames = s.empty_frames,
            noise_dropped = s.noise_dropped,
            residual_bits = s.residual_bits,
            capture_overflows = s.capture_overflows,
            no_peer_drops = s.no_peer_drops,
            oversize_rejected = s.oversize_rejected,
            transmit_failures = s.transmit_failures,
            send_failures = s.send_failures,
            "bridge statistics"
        );
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut N {
        &mut self.network
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    // ── Network → link ────────────────────────────────────────────────────────

    fn pump_network(&mut self) -> NetToLink {
        let (len, sender) = match self.network.try_recv_from(&mut self.recv_buf) {
            Ok(Some(received)) => received,
            Ok(None) => return NetToLink::Idle,
            Err(e) => {
                self.stats.network_errors += 1;
                warn!(error = %e, "network receive failed");
                return NetToLink::ReceiveFailed(e.to_string());
            }
        };

        if len > self.max_payload {
            self.stats.oversize_rejected += 1;
            warn!(
                sender = %sender,
                max_payload = self.max_payload,
                "oversize datagram rejected"
            );
            return NetToLink::Rejected {
                len,
                max: self.max_payload,
            };
        }

        if self.peer != Some(sender) {
            info!(peer = %sender, "network peer set");
            self.peer = Some(sender);
        }

        if len == 0 {
            self.stats.peer_registrations += 1;
            debug!(peer = %sender, "empty datagram; nothing to transmit");
            return NetToLink::PeerRegistered(sender);
        }

        self.stats.payloads_received += 1;
        let payload = &self.recv_buf[..len];
        let pulses = self.encoder.encode(payload);
        let record = LinkLogRecord::new(Direction::NetToLink, payload, self.preview_bytes);

        match self.transport.transmit(&pulses) {
            Ok(()) => {
                self.stats.payloads_transmitted += 1;
                debug!(pulses = pulses.len(), "payload encoded onto link");
                record.emit();
                NetToLink::Transmitted(record)
            }
            Err(e) => {
                self.stats.transmit_failures += 1;
                warn!(error = %e, byte_count = len, "link transmit failed; payload dropped");
                NetToLink::TransmitFailed(record)
            }
        }
    }

    // ── Link → network ────────────────────────────────────────────────────────

    fn pump_link(&mut self) -> LinkToNet {
        let batch = match self.transport.try_receive() {
            Ok(Some(batch)) => batch,
            Ok(None) => return LinkToNet::Idle,
            Err(e) => {
                self.stats.link_errors += 1;
                warn!(error = %e, "link receive failed");
                return LinkToNet::ReceiveFailed(e.to_string());
            }
        };

        self.stats.batches_captured += 1;
        debug!(
            pulses = batch.pulses.len(),
            preview = %pulse_preview(&batch.pulses, CAPTURE_PREVIEW_PULSES),
            "captured pulse batch"
        );

        if batch.overflowed {
            self.stats.capture_overflows += 1;
            warn!(
                captured = batch.pulses.len(),
                lost_events = batch.lost_events,
                "capture queue overflowed; frame dropped"
            );
            return LinkToNet::Overflowed {
                lost_events: batch.lost_events,
            };
        }

        let Some(frame) = self.assembler.assemble(&batch.pulses) else {
            return LinkToNet::EmptyFrame;
        };

        let record = LinkLogRecord::new(Direction::LinkToNet, &frame.bytes, self.preview_bytes);
        let Some(peer) = self.peer else {
            self.stats.no_peer_drops += 1;
            warn!(byte_count = frame.len(), "no network peer yet; frame dropped");
            return LinkToNet::DroppedNoPeer(record);
        };

        match self.network.send_to(&frame.bytes, peer) {
            Ok(()) => {
                self.stats.frames_forwarded += 1;
                record.emit();
                LinkToNet::Forwarded { record, peer }
            }
            Err(e) => {
                self.stats.send_failures += 1;
                warn!(error = %e, peer = %peer, "network send failed; frame dropped");
                LinkToNet::SendFailed(record)
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
