//! Non-blocking UDP implementation of [`DatagramPort`].
//!
//! The socket is put into non-blocking mode at bind time, so
//! `try_recv_from` returns `Ok(None)` instead of waiting when no datagram is
//! queued.  The polling loop provides all pacing.
//!
//! A datagram longer than the caller's buffer is truncated by the OS; the
//! controller sizes its buffer one byte past `max_payload` so truncation
//! shows up as an oversize length.

use std::io;
use std::net::{SocketAddr, UdpSocket};

use tracing::{debug, info};

use crate::application::{DatagramPort, PortError};

/// A UDP socket bound for the bridge's network side.
pub struct UdpDatagramPort {
    socket: UdpSocket,
}

impl UdpDatagramPort {
    /// Binds `addr` and switches the socket to non-blocking mode.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Io`] if the bind or the mode switch fails.
    pub fn bind(addr: SocketAddr) -> Result<Self, PortError> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_nonblocking(true)?;
        info!("network port listening on UDP {}", socket.local_addr()?);
        Ok(Self { socket })
    }

    /// The bound address (resolves port 0 to the assigned port).
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Io`] if the OS cannot report the address.
    pub fn local_addr(&self) -> Result<SocketAddr, PortError> {
        Ok(self.socket.local_addr()?)
    }
}

impl DatagramPort for UdpDatagramPort {
    fn try_recv_from(&mut self, buf: &mut [u8]) -> Result<Option<(usize, SocketAddr)>, PortError> {
        match self.socket.recv_from(buf) {
            Ok(pair) => Ok(Some(pair)),
            Err(e) if is_transient(&e) => Ok(None),
            Err(e) => Err(PortError::Io(e)),
        }
    }

    fn send_to(&mut self, payload: &[u8], peer: SocketAddr) -> Result<(), PortError> {
        let sent = self.socket.send_to(payload, peer)?;
        if sent != payload.len() {
            return Err(PortError::Truncated {
                sent,
                len: payload.len(),
            });
        }
        debug!(peer = %peer, bytes = sent, "datagram sent");
        Ok(())
    }
}

/// `true` for errors that only mean "nothing to read right now".
///
/// `ConnectionReset` is what Windows reports on a UDP socket after an ICMP
/// port-unreachable for an earlier send; it says nothing about this read.
fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut
            | io::ErrorKind::Interrupted
            | io::ErrorKind::ConnectionReset
    )
}
