//! Emulated wire between two bridge instances.
//!
//! Each transmitted pulse batch becomes one UDP datagram, serialized with
//! `bincode` (variable-length integers, so a reference half-bit costs two
//! bytes).  On receipt the segments are replayed through a local
//! [`PulseCapture`] followed by an idle gap, so the far bridge sees exactly
//! what an edge-capture receiver would: merged levels, filtered glitches and
//! a bounded queue.
//!
//! ```text
//! bridge A                              bridge B
//! transmit([PulseEvent]) ──UDP──► recv ──► PulseCapture ──► try_receive
//! ```

use std::io;
use std::net::{SocketAddr, UdpSocket};

use bincode::Options;
use spear_core::PulseEvent;
use tracing::{info, warn};

use crate::application::{CapturedBatch, PulseTransport, TransportError};
use crate::infrastructure::capture::PulseCapture;

/// Largest UDP payload over IPv4.
const MAX_DATAGRAM: usize = 65_507;

fn codec() -> impl Options {
    bincode::DefaultOptions::new().with_limit(MAX_DATAGRAM as u64)
}

/// Pulse link carried over a UDP socket.
pub struct UdpPulseTransport {
    socket: UdpSocket,
    remote: SocketAddr,
    capture: PulseCapture,
    buf: Vec<u8>,
}

impl UdpPulseTransport {
    /// Binds the local wire endpoint in non-blocking mode.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Io`] if the socket cannot be bound.
    pub fn bind(
        local: SocketAddr,
        remote: SocketAddr,
        capture: PulseCapture,
    ) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(local)?;
        socket.set_nonblocking(true)?;
        info!(
            local = %socket.local_addr()?,
            remote = %remote,
            "pulse wire bound"
        );
        Ok(Self {
            socket,
            remote,
            capture,
            buf: vec![0; MAX_DATAGRAM],
        })
    }

    /// # Errors
    ///
    /// Returns [`TransportError::Io`] if the OS cannot report the address.
    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.socket.local_addr()?)
    }

    /// Points transmissions at a different far end.
    pub fn set_remote(&mut self, remote: SocketAddr) {
        self.remote = remote;
    }

    /// Moves every datagram already queued on the socket into the capture.
    fn drain_socket(&mut self) -> Result<(), TransportError> {
        loop {
            let (len, from) = match self.socket.recv_from(&mut self.buf) {
                Ok(pair) => pair,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) if e.kind() == io::ErrorKind::ConnectionReset => continue,
                Err(e) => return Err(e.into()),
            };
            match codec().deserialize::<Vec<PulseEvent>>(&self.buf[..len]) {
                Ok(segments) => {
                    self.capture.record_all(&segments);
                    self.capture.idle();
                }
                Err(e) => warn!(from = %from, error = %e, "malformed pulse datagram dropped"),
            }
        }
    }
}

impl PulseTransport for UdpPulseTransport {
    fn transmit(&mut self, pulses: &[PulseEvent]) -> Result<(), TransportError> {
        if pulses.is_empty() {
            return Ok(());
        }
        let datagram = codec().serialize(pulses).map_err(|e| match *e {
            bincode::ErrorKind::SizeLimit => TransportError::BatchTooLarge {
                pulses: pulses.len(),
            },
            _ => TransportError::Codec(e.to_string()),
        })?;
        self.socket.send_to(&datagram, self.remote)?;
        Ok(())
    }

    fn try_receive(&mut self) -> Result<Option<CapturedBatch>, TransportError> {
        self.drain_socket()?;
        Ok(self.capture.try_take())
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use spear_core::{FrameAssembler, PulseEncoder};

    use super::*;

    fn endpoint() -> UdpPulseTransport {
        let local = "127.0.0.1:0".parse().unwrap();
        // Remote is fixed up once both ends are bound.
        UdpPulseTransport::bind(local, local, PulseCapture::new(2, 2000, 16_384)).expect("bind")
    }

    fn pair() -> (UdpPulseTransport, UdpPulseTransport) {
        let mut a = endpoint();
        let mut b = endpoint();
        a.set_remote(b.local_addr().unwrap());
        b.set_remote(a.local_addr().unwrap());
        (a, b)
    }

    fn receive_within(t: &mut UdpPulseTransport) -> Option<CapturedBatch> {
        let deadline = Instant::now() + Duration::from_secs(1);
        while Instant::now() < deadline {
            if let Some(batch) = t.try_receive().expect("receive") {
                return Some(batch);
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        None
    }

    #[test]
    fn test_reference_half_bit_costs_two_bytes_on_the_wire() {
        let pulses = PulseEncoder::default().encode(&[0x00; 4]);
        let bytes = codec().serialize(&pulses).unwrap();
        // One length byte plus (duration, level) per pulse.
        assert_eq!(bytes.len(), 1 + 2 * pulses.len());
    }

    #[test]
    fn test_batch_crosses_the_wire_and_decodes() {
        // Arrange
        let (mut a, mut b) = pair();
        let payload = [0xAA, 0x55, 0x01];

        // Act
        a.transmit(&PulseEncoder::default().encode(&payload)).unwrap();
        let batch = receive_within(&mut b).expect("batch");

        // Assert
        let frame = FrameAssembler::default().assemble(&batch.pulses).unwrap();
        assert_eq!(frame.bytes, payload);
    }

    #[test]
    fn test_nothing_sent_means_nothing_received() {
        let (_a, mut b) = pair();
        assert!(b.try_receive().unwrap().is_none());
    }

    #[test]
    fn test_malformed_datagram_is_skipped() {
        // Arrange: raw garbage followed by a valid batch
        let (mut a, mut b) = pair();
        let raw = UdpSocket::bind("127.0.0.1:0").unwrap();
        raw.send_to(&[0xFF; 3], b.local_addr().unwrap()).unwrap();
        a.transmit(&PulseEncoder::default().encode(b"k")).unwrap();

        // Act
        let batch = receive_within(&mut b).expect("batch");

        // Assert
        let frame = FrameAssembler::default().assemble(&batch.pulses).unwrap();
        assert_eq!(frame.bytes, b"k");
    }

    #[test]
    fn test_batch_over_datagram_limit_is_rejected() {
        // 40_000 pulses of 20 ticks need more than 65_507 bytes.
        let (mut a, _b) = pair();
        let pulses: Vec<PulseEvent> = (0..40_000)
            .map(|i| PulseEvent::new(20, (i % 2 == 0).into()))
            .collect();

        let result = a.transmit(&pulses);

        assert!(matches!(
            result,
            Err(TransportError::BatchTooLarge { pulses: 40_000 })
        ));
    }
}
