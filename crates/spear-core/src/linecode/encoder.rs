//! Byte-to-pulse Manchester encoder.
//!
//! Each data bit becomes two half-bit pulses with a transition at the bit
//! centre (IEEE 802.3 convention):
//!
//! ```text
//!   bit 1:  ____|‾‾‾‾     Low then High  (rising mid-bit edge)
//!   bit 0:  ‾‾‾‾|____     High then Low  (falling mid-bit edge)
//! ```
//!
//! Bits are sent most-significant first.  The encoder carries no state
//! between calls, so identical input always yields an identical pulse
//! sequence.

use crate::linecode::pulse::{Level, PulseEvent, Ticks};
use crate::linecode::timing::TimingProfile;

/// Number of pulses [`PulseEncoder::encode`] emits per input byte.
pub const PULSES_PER_BYTE: usize = 16;

/// Stateless Manchester encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseEncoder {
    half_bit: Ticks,
}

impl PulseEncoder {
    /// Creates an encoder that emits half-bits of `half_bit` ticks.
    pub fn new(half_bit: Ticks) -> Self {
        Self { half_bit }
    }

    /// Creates an encoder whose half-bit width sits at the centre of the
    /// profile's short window.
    pub fn for_profile(profile: &TimingProfile) -> Self {
        Self::new(profile.nominal_half_bit())
    }

    /// Width of one transmitted half-bit in ticks.
    pub fn half_bit(&self) -> Ticks {
        self.half_bit
    }

    /// Encodes `bytes` into exactly `16 * bytes.len()` half-bit pulses.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use spear_core::{Level, PulseEncoder};
    ///
    /// let pulses = PulseEncoder::new(10).encode(&[0x80]);
    /// assert_eq!(pulses.len(), 16);
    /// // MSB is 1: low first half, high second half.
    /// assert_eq!(pulses[0].level, Level::Low);
    /// assert_eq!(pulses[1].level, Level::High);
    /// ```
    pub fn encode(&self, bytes: &[u8]) -> Vec<PulseEvent> {
        let mut out = Vec::with_capacity(bytes.len() * PULSES_PER_BYTE);
        self.encode_into(bytes, &mut out);
        out
    }

    /// Appends the encoding of `bytes` to `out`.
    pub fn encode_into(&self, bytes: &[u8], out: &mut Vec<PulseEvent>) {
        for &byte in bytes {
            for bit in (0..8).rev() {
                let (first, second) = Self::half_levels((byte >> bit) & 0x01 == 1);
                out.push(PulseEvent::new(self.half_bit, first));
                out.push(PulseEvent::new(self.half_bit, second));
            }
        }
    }

    /// Encodes `bytes`, fusing every pair of adjacent equal-level half-bits
    /// into one pulse of twice the width.
    ///
    /// This is the waveform an edge-capturing receiver actually measures.
    /// Decoding it must give the same bytes as decoding [`encode`] output,
    /// since a long pulse is read back as two half-bits at one level.
    ///
    /// [`encode`]: PulseEncoder::encode
    pub fn encode_merged(&self, bytes: &[u8]) -> Vec<PulseEvent> {
        let mut out: Vec<PulseEvent> = Vec::with_capacity(bytes.len() * PULSES_PER_BYTE);
        for pulse in self.encode(bytes) {
            match out.last_mut() {
                // Only a single half-bit may absorb its neighbour: a bit
                // boundary never joins more than two half-bits.
                Some(last) if last.level == pulse.level && last.duration == self.half_bit => {
                    last.duration += pulse.duration;
                }
                _ => out.push(pulse),
            }
        }
        out
    }

    fn half_levels(bit: bool) -> (Level, Level) {
        if bit {
            (Level::Low, Level::High)
        } else {
            (Level::High, Level::Low)
        }
    }
}

impl Default for PulseEncoder {
    fn default() -> Self {
        Self::new(TimingProfile::REFERENCE_HALF_BIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_emits_sixteen_pulses_per_byte() {
        // Arrange
        let encoder = PulseEncoder::default();

        // Act
        let pulses = encoder.encode(&[0x00, 0xFF, 0x5A]);

        // Assert
        assert_eq!(pulses.len(), 48);
        assert!(pulses.iter().all(|p| p.duration == 10));
    }

    #[test]
    fn test_encode_empty_input_yields_no_pulses() {
        assert!(PulseEncoder::default().encode(&[]).is_empty());
    }

    #[test]
    fn test_encode_one_bit_is_low_then_high() {
        let pulses = PulseEncoder::default().encode(&[0xFF]);
        for pair in pulses.chunks(2) {
            assert_eq!(pair[0].level, Level::Low);
            assert_eq!(pair[1].level, Level::High);
        }
    }

    #[test]
    fn test_encode_zero_bit_is_high_then_low() {
        let pulses = PulseEncoder::default().encode(&[0x00]);
        for pair in pulses.chunks(2) {
            assert_eq!(pair[0].level, Level::High);
            assert_eq!(pair[1].level, Level::Low);
        }
    }

    #[test]
    fn test_encode_is_msb_first() {
        // Arrange: 0x01 is seven zeros followed by a single one
        let pulses = PulseEncoder::default().encode(&[0x01]);

        // Assert: the first bit is a zero, the last bit is a one
        assert_eq!(pulses[0].level, Level::High);
        assert_eq!(pulses[14].level, Level::Low);
        assert_eq!(pulses[15].level, Level::High);
    }

    #[test]
    fn test_encode_is_deterministic_across_calls() {
        let encoder = PulseEncoder::new(12);
        assert_eq!(encoder.encode(b"spear"), encoder.encode(b"spear"));
    }

    #[test]
    fn test_encode_into_appends() {
        let encoder = PulseEncoder::default();
        let mut out = encoder.encode(&[0xAA]);
        encoder.encode_into(&[0x55], &mut out);
        assert_eq!(out, encoder.encode(&[0xAA, 0x55]));
    }

    #[test]
    fn test_encode_merged_alternating_bits_is_bit_rate_square_wave() {
        // Arrange: 0xAA -> L H|H L|L H|H L ... every bit boundary joins a pair
        let pulses = PulseEncoder::default().encode_merged(&[0xAA]);

        // Assert: short, seven longs, short
        assert_eq!(pulses.len(), 9);
        assert_eq!(pulses[0], PulseEvent::low(10));
        assert!(pulses[1..8].iter().all(|p| p.duration == 20));
        assert_eq!(pulses[8], PulseEvent::low(10));
    }

    #[test]
    fn test_encode_merged_constant_byte_has_no_long_pulses() {
        // 0xFF repeats "low, high" so neighbouring bits never share a level
        // across the boundary.
        let pulses = PulseEncoder::default().encode_merged(&[0xFF]);
        assert_eq!(pulses.len(), 16);
    }

    #[test]
    fn test_encode_merged_joins_equal_levels_at_bit_boundary() {
        // Arrange: bits "1 0" -> Low High | High Low -> Low, High(long), Low
        let pulses = PulseEncoder::default().encode_merged(&[0b1000_0000]);

        // Assert
        assert_eq!(pulses[0], PulseEvent::low(10));
        assert_eq!(pulses[1], PulseEvent::high(20));
        assert_eq!(pulses[2], PulseEvent::low(10));
    }

    #[test]
    fn test_for_profile_uses_short_window_centre() {
        let profile = TimingProfile::new(8, 14, 18, 26).unwrap();
        assert_eq!(PulseEncoder::for_profile(&profile).half_bit(), 11);
    }
}
