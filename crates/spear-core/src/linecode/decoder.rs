//! Pulse-to-byte decoder with timing classification and phase tracking.
//!
//! # How decoding works
//!
//! Every captured pulse is first classified against the [`TimingProfile`]:
//!
//! - **short** – one half-bit window at the pulse's level;
//! - **long**  – two half-bit windows, both at the pulse's level (no
//!   transition happened at the bit boundary between them);
//! - **noise** – dropped without touching any state.
//!
//! Half-bit windows then drive a two-state phase machine.  In the first half
//! of a bit nothing is resolved.  In the second half the sampled level *is*
//! the bit value: a high second half means the mid-bit edge rose (logic 1),
//! a low second half means it fell (logic 0).  The phase toggles after every
//! window and resolved bits fill a byte MSB first.
//!
//! # Frame alignment
//!
//! The decoder assumes the first pulse of every batch starts exactly on a bit
//! boundary.  There is no preamble search and no phase-locked loop: if the
//! capture starts half a bit late, every following bit is shifted and the
//! payload is silently wrong.  Dropping noise keeps glitches from breaking
//! alignment, but a dropped pulse can also hide a genuinely missing edge.

use tracing::trace;

use crate::linecode::pulse::{Level, PulseEvent};
use crate::linecode::timing::{PulseClass, TimingProfile};

/// Which half of the current bit period the next half-bit window falls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BitPhase {
    /// First half: the level is sampled but no bit is resolved.
    #[default]
    First,
    /// Second half: the level resolves the bit value.
    Second,
}

impl BitPhase {
    /// Returns the other phase.
    pub fn toggled(self) -> Self {
        match self {
            BitPhase::First => BitPhase::Second,
            BitPhase::Second => BitPhase::First,
        }
    }
}

/// Collects resolved bits MSB first until a full byte is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ByteAccumulator {
    bits_filled: u8,
    value: u8,
}

impl ByteAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bits collected towards the current byte (0..8).
    pub fn bits_filled(&self) -> u8 {
        self.bits_filled
    }

    /// Bits collected so far, left-aligned at their MSB-first positions.
    pub fn value(&self) -> u8 {
        self.value
    }

    /// Writes `bit` at the next MSB-first position.
    ///
    /// Returns the completed byte and resets when the eighth bit lands.
    pub fn push_bit(&mut self, bit: bool) -> Option<u8> {
        if bit {
            self.value |= 0x80 >> self.bits_filled;
        }
        self.bits_filled += 1;
        if self.bits_filled == 8 {
            let byte = self.value;
            self.reset();
            Some(byte)
        } else {
            None
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Output of decoding one idle-bounded batch of pulses.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DecodedBatch {
    /// Complete bytes, in arrival order.
    pub bytes: Vec<u8>,
    /// Bits collected after the last complete byte.  They are discarded.
    pub residual_bits: u8,
    /// Pulses classified as noise and dropped.
    pub noise_dropped: usize,
    /// Half-bit windows processed (short = 1, long = 2).
    pub half_bits: usize,
}

/// Manchester decoder owning its phase and byte state.
///
/// State lives in the instance, never in a static, so several links can be
/// decoded side by side and tests never see each other's leftovers.
#[derive(Debug, Clone)]
pub struct PulseDecoder {
    profile: TimingProfile,
    phase: BitPhase,
    accumulator: ByteAccumulator,
}

impl PulseDecoder {
    pub fn new(profile: TimingProfile) -> Self {
        Self {
            profile,
            phase: BitPhase::First,
            accumulator: ByteAccumulator::new(),
        }
    }

    pub fn profile(&self) -> &TimingProfile {
        &self.profile
    }

    /// Phase the decoder finished the last batch in.
    pub fn phase(&self) -> BitPhase {
        self.phase
    }

    /// Accumulator state the decoder finished the last batch in.
    pub fn accumulator(&self) -> ByteAccumulator {
        self.accumulator
    }

    /// Decodes one batch of pulses captured between two idle gaps.
    ///
    /// Phase and accumulator are reset before the first pulse, so every batch
    /// decodes independently.  Bits that do not complete a byte by the end of
    /// the batch are reported in [`DecodedBatch::residual_bits`] and dropped.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use spear_core::{PulseDecoder, PulseEncoder, TimingProfile};
    ///
    /// let pulses = PulseEncoder::default().encode(b"hi");
    /// let mut decoder = PulseDecoder::new(TimingProfile::reference());
    /// let batch = decoder.decode(&pulses);
    /// assert_eq!(batch.bytes, b"hi");
    /// assert_eq!(batch.residual_bits, 0);
    /// ```
    pub fn decode(&mut self, pulses: &[PulseEvent]) -> DecodedBatch {
        self.reset();
        let mut batch = DecodedBatch {
            bytes: Vec::with_capacity(pulses.len() / 16),
            ..DecodedBatch::default()
        };

        for pulse in pulses {
            let class = self.profile.classify(pulse.duration);
            if class == PulseClass::Noise {
                trace!(duration = pulse.duration, pulse_level = %pulse.level, "dropping noise pulse");
                batch.noise_dropped += 1;
                continue;
            }
            for _ in 0..class.half_bits() {
                if let Some(byte) = self.process_half_bit(pulse.level) {
                    batch.bytes.push(byte);
                }
                batch.half_bits += 1;
            }
        }

        batch.residual_bits = self.accumulator.bits_filled();
        batch
    }

    /// Returns phase and accumulator to their start-of-frame defaults.
    pub fn reset(&mut self) {
        self.phase = BitPhase::First;
        self.accumulator.reset();
    }

    fn process_half_bit(&mut self, level: Level) -> Option<u8> {
        let completed = match self.phase {
            BitPhase::First => None,
            BitPhase::Second => self.accumulator.push_bit(level.is_high()),
        };
        self.phase = self.phase.toggled();
        completed
    }
}

impl Default for PulseDecoder {
    fn default() -> Self {
        Self::new(TimingProfile::reference())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linecode::encoder::PulseEncoder;

    fn decode(pulses: &[PulseEvent]) -> DecodedBatch {
        PulseDecoder::default().decode(pulses)
    }

    // ── ByteAccumulator ──────────────────────────────────────────────────────

    #[test]
    fn test_accumulator_fills_msb_first() {
        // Arrange
        let mut acc = ByteAccumulator::new();

        // Act: 1 0 1 0 0 0 0 1
        let mut out = None;
        for bit in [true, false, true, false, false, false, false, true] {
            out = acc.push_bit(bit);
        }

        // Assert
        assert_eq!(out, Some(0b1010_0001));
        assert_eq!(acc.bits_filled(), 0, "accumulator resets after a byte");
    }

    #[test]
    fn test_accumulator_partial_byte_is_not_flushed() {
        let mut acc = ByteAccumulator::new();
        assert_eq!(acc.push_bit(true), None);
        assert_eq!(acc.push_bit(true), None);
        assert_eq!(acc.bits_filled(), 2);
        assert_eq!(acc.value(), 0b1100_0000);
    }

    // ── Phase machine ────────────────────────────────────────────────────────

    #[test]
    fn test_first_half_resolves_nothing() {
        // Arrange: a single short pulse is only the first half of a bit
        let mut decoder = PulseDecoder::default();

        // Act
        let batch = decoder.decode(&[PulseEvent::low(10)]);

        // Assert
        assert!(batch.bytes.is_empty());
        assert_eq!(batch.residual_bits, 0);
        assert_eq!(decoder.phase(), BitPhase::Second);
    }

    #[test]
    fn test_second_half_level_is_bit_value() {
        let mut decoder = PulseDecoder::default();
        decoder.decode(&[PulseEvent::low(10), PulseEvent::high(10)]);
        assert_eq!(decoder.accumulator().bits_filled(), 1);
        assert_eq!(decoder.accumulator().value(), 0x80);
    }

    #[test]
    fn test_long_pulse_counts_as_two_half_bits_at_same_level() {
        // Arrange: bits "1 0" with the boundary pulse merged:
        // Low(10) | High(20) | Low(10)
        let pulses = [PulseEvent::low(10), PulseEvent::high(20), PulseEvent::low(10)];
        let mut decoder = PulseDecoder::default();

        // Act
        let batch = decoder.decode(&pulses);

        // Assert
        assert_eq!(batch.half_bits, 4);
        assert_eq!(decoder.accumulator().bits_filled(), 2);
        assert_eq!(decoder.accumulator().value(), 0b1000_0000);
    }

    #[test]
    fn test_state_resets_between_batches() {
        // Arrange: leave the decoder mid-bit and mid-byte
        let mut decoder = PulseDecoder::default();
        let odd = PulseEncoder::default().encode(&[0xFF]);
        decoder.decode(&odd[..5]);
        assert_ne!(decoder.phase(), BitPhase::First);

        // Act
        let batch = decoder.decode(&PulseEncoder::default().encode(&[0x42]));

        // Assert: the second batch decodes as if the first never happened
        assert_eq!(batch.bytes, vec![0x42]);
    }

    // ── Classification ───────────────────────────────────────────────────────

    #[test]
    fn test_window_edges_decode_like_nominal() {
        // Arrange: the same byte at nominal, minimum and maximum short widths
        let nominal = PulseEncoder::new(10).encode(&[0xC3]);
        let at_min = PulseEncoder::new(7).encode(&[0xC3]);
        let at_max = PulseEncoder::new(13).encode(&[0xC3]);

        // Act / Assert
        assert_eq!(decode(&nominal).bytes, vec![0xC3]);
        assert_eq!(decode(&at_min).bytes, vec![0xC3]);
        assert_eq!(decode(&at_max).bytes, vec![0xC3]);
    }

    #[test]
    fn test_long_window_edges_decode_like_nominal() {
        let nominal = [PulseEvent::low(10), PulseEvent::high(20), PulseEvent::low(10)];
        let low_edge = [PulseEvent::low(10), PulseEvent::high(17), PulseEvent::low(10)];
        let high_edge = [PulseEvent::low(10), PulseEvent::high(23), PulseEvent::low(10)];
        assert_eq!(decode(&nominal), decode(&low_edge));
        assert_eq!(decode(&nominal), decode(&high_edge));
    }

    #[test]
    fn test_one_tick_outside_window_is_dropped_as_noise() {
        let batch = decode(&[
            PulseEvent::low(6),
            PulseEvent::high(14),
            PulseEvent::low(16),
            PulseEvent::high(24),
        ]);
        assert_eq!(batch.noise_dropped, 4);
        assert_eq!(batch.half_bits, 0);
    }

    #[test]
    fn test_noise_between_half_bits_does_not_shift_phase() {
        // Arrange: insert a 3-tick glitch after every valid pulse
        let clean = PulseEncoder::default().encode(&[0x5A, 0xF0]);
        let mut noisy = Vec::new();
        for pulse in &clean {
            noisy.push(*pulse);
            noisy.push(PulseEvent::new(3, pulse.level.inverted()));
        }

        // Act
        let batch = decode(&noisy);

        // Assert
        assert_eq!(batch.bytes, vec![0x5A, 0xF0]);
        assert_eq!(batch.noise_dropped, clean.len());
    }

    // ── Truncation ───────────────────────────────────────────────────────────

    #[test]
    fn test_truncated_batch_keeps_whole_bytes_only() {
        // Arrange: two full bytes plus 11 half-bits of a third
        let pulses = PulseEncoder::default().encode(&[0x12, 0x34, 0x56]);
        let truncated = &pulses[..16 * 2 + 11];

        // Act
        let batch = decode(truncated);

        // Assert: floor(43 / 16) = 2 bytes; 5 resolved bits are discarded
        assert_eq!(batch.bytes, vec![0x12, 0x34]);
        assert_eq!(batch.half_bits, 43);
        assert_eq!(batch.residual_bits, 5);
    }

    #[test]
    fn test_empty_batch_decodes_to_nothing() {
        let batch = decode(&[]);
        assert_eq!(batch, DecodedBatch::default());
    }

    // ── Alignment limitation ─────────────────────────────────────────────────

    #[test]
    fn test_missing_first_half_bit_shifts_every_bit() {
        // Arrange: drop the very first pulse so decoding starts mid-bit
        let pulses = PulseEncoder::default().encode(&[0x0F, 0x0F]);

        // Act
        let batch = decode(&pulses[1..]);

        // Assert: the frame decodes, but to different bytes; nothing flags it
        assert_eq!(batch.bytes.len(), 1);
        assert_ne!(batch.bytes[0], 0x0F);
    }
}
