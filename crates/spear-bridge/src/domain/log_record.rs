//! Per-payload forwarding record.

use std::fmt;
use std::fmt::Write as _;

use spear_core::PulseEvent;
use tracing::info;

/// Which way a payload crossed the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// A network datagram encoded onto the link.
    NetToLink,
    /// A decoded frame sent to the network peer.
    LinkToNet,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::NetToLink => f.write_str("NET_TO_LINK"),
            Direction::LinkToNet => f.write_str("LINK_TO_NET"),
        }
    }
}

/// One forwarding event: direction, size and an optional hex preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkLogRecord {
    pub direction: Direction,
    pub byte_count: usize,
    /// `None` when previews are disabled.
    pub preview: Option<String>,
}

impl LinkLogRecord {
    /// Builds a record for `bytes`, previewing at most `preview_bytes` of them.
    pub fn new(direction: Direction, bytes: &[u8], preview_bytes: usize) -> Self {
        let preview = (preview_bytes > 0).then(|| hex_preview(bytes, preview_bytes));
        Self {
            direction,
            byte_count: bytes.len(),
            preview,
        }
    }

    /// Emits the record as a structured `info` event.
    pub fn emit(&self) {
        match &self.preview {
            Some(preview) => info!(
                direction = %self.direction,
                byte_count = self.byte_count,
                preview = %preview,
                "payload forwarded"
            ),
            None => info!(
                direction = %self.direction,
                byte_count = self.byte_count,
                "payload forwarded"
            ),
        }
    }
}

/// Lowercase hex of the first `max` bytes, space separated, with `..`
/// appended when `bytes` is longer.
///
/// ```rust
/// use spear_bridge::domain::hex_preview;
///
/// assert_eq!(hex_preview(&[0xAA, 0x55, 0x01], 2), "aa 55 ..");
/// ```
pub fn hex_preview(bytes: &[u8], max: usize) -> String {
    let mut out = String::with_capacity(max.min(bytes.len()) * 3 + 2);
    for (i, b) in bytes.iter().take(max).enumerate() {
        if i > 0 {
            out.push(' ');
        }
        // Writing to a String cannot fail.
        let _ = write!(out, "{b:02x}");
    }
    if bytes.len() > max {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str("..");
    }
    out
}

/// `(level:duration)` pairs for the first `max` pulses of a capture.
pub fn pulse_preview(pulses: &[PulseEvent], max: usize) -> String {
    let mut out = String::new();
    for p in pulses.iter().take(max) {
        let _ = write!(out, "{p}");
    }
    if pulses.len() > max {
        out.push_str("..");
    }
    out
}
