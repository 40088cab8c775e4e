//! Frame delimiting on top of the decoder.
//!
//! The transport decides where a frame ends: it reports a batch once the line
//! has been silent for its idle threshold.  The assembler never merges or
//! splits those batches.  One capture goes in, one decode runs, and at most
//! one frame comes out.
//!
//! A frame has no length prefix and no checksum.  A batch that decodes to
//! zero bytes is a legal empty frame; it is counted and skipped rather than
//! handed upstream.

use tracing::debug;

use crate::linecode::decoder::PulseDecoder;
use crate::linecode::pulse::PulseEvent;
use crate::linecode::timing::TimingProfile;

/// A non-empty byte sequence decoded from one idle-bounded capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Decoded payload.
    pub bytes: Vec<u8>,
    /// Trailing bits dropped because they did not complete a byte.
    pub discarded_bits: u8,
    /// Pulses dropped as noise while decoding this frame.
    pub noise_dropped: usize,
}

impl Frame {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Running totals kept by a [`FrameAssembler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AssemblerStats {
    /// Batches handed to the decoder.
    pub batches: u64,
    /// Non-empty frames produced.
    pub frames: u64,
    /// Batches that decoded to zero bytes.
    pub empty_frames: u64,
    /// Noise pulses dropped across all batches.
    pub noise_dropped: u64,
    /// Sub-byte residue bits discarded across all batches.
    pub discarded_bits: u64,
}

/// Turns idle-bounded pulse batches into frames.
#[derive(Debug, Clone)]
pub struct FrameAssembler {
    decoder: PulseDecoder,
    stats: AssemblerStats,
}

impl FrameAssembler {
    pub fn new(profile: TimingProfile) -> Self {
        Self {
            decoder: PulseDecoder::new(profile),
            stats: AssemblerStats::default(),
        }
    }

    /// Decodes one capture batch.
    ///
    /// Returns `None` when the batch holds no complete byte.
    pub fn assemble(&mut self, pulses: &[PulseEvent]) -> Option<Frame> {
        let batch = self.decoder.decode(pulses);

        self.stats.batches += 1;
        self.stats.noise_dropped += batch.noise_dropped as u64;
        self.stats.discarded_bits += u64::from(batch.residual_bits);

        if batch.residual_bits > 0 {
            debug!(
                residual_bits = batch.residual_bits,
                bytes = batch.bytes.len(),
                "capture ended mid-byte; discarding residue"
            );
        }

        if batch.bytes.is_empty() {
            self.stats.empty_frames += 1;
            debug!(pulses = pulses.len(), "empty frame skipped");
            return None;
        }

        self.stats.frames += 1;
        Some(Frame {
            bytes: batch.bytes,
            discarded_bits: batch.residual_bits,
            noise_dropped: batch.noise_dropped,
        })
    }

    pub fn stats(&self) -> AssemblerStats {
        self.stats
    }

    pub fn profile(&self) -> &TimingProfile {
        self.decoder.profile()
    }
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new(TimingProfile::reference())
    }
}
