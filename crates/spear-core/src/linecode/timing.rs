//! Timing windows used to classify captured pulse durations.
//!
//! A captured pulse is either one half-bit long ("short"), two half-bits
//! long because no transition happened at a bit boundary ("long"), or
//! neither ("noise").  The windows are inclusive on both ends.
//!
//! ```text
//!   ticks:  0 ... short_min ====== short_max ... long_min ====== long_max ...
//!           noise            short             noise          long        noise
//! ```

use serde::{Deserialize, Serialize};

use crate::error::TimingError;
use crate::linecode::pulse::Ticks;

/// Result of classifying one pulse duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseClass {
    /// One half-bit window.
    Short,
    /// Two consecutive half-bit windows at the same level.
    Long,
    /// Outside both windows; dropped by the decoder.
    Noise,
}

impl PulseClass {
    /// Number of half-bit windows this class stands for.
    pub fn half_bits(self) -> u8 {
        match self {
            PulseClass::Short => 1,
            PulseClass::Long => 2,
            PulseClass::Noise => 0,
        }
    }
}

/// The four tick bounds that define the short and long windows.
///
/// Invariant: `short_min >= 1`, each window is non-inverted and
/// `short_max < long_min`.  The fields are private so the invariant can only
/// be established through [`TimingProfile::new`] or
/// [`TimingProfile::from_nominal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTimingProfile", into = "RawTimingProfile")]
pub struct TimingProfile {
    short_min: Ticks,
    short_max: Ticks,
    long_min: Ticks,
    long_max: Ticks,
}

impl TimingProfile {
    /// Reference half-bit width: 500 ns at 50 ns per tick.
    pub const REFERENCE_HALF_BIT: Ticks = 10;

    /// Reference tolerance applied on both sides of each nominal width.
    pub const REFERENCE_TOLERANCE: Ticks = 3;

    /// Builds a profile from explicit window bounds.
    ///
    /// # Errors
    ///
    /// Returns [`TimingError`] if a window is inverted, the short window
    /// starts at zero, or the two windows overlap.
    pub fn new(
        short_min: Ticks,
        short_max: Ticks,
        long_min: Ticks,
        long_max: Ticks,
    ) -> Result<Self, TimingError> {
        if short_min == 0 {
            return Err(TimingError::ZeroShortMin);
        }
        if short_min > short_max {
            return Err(TimingError::InvertedWindow {
                window: "short",
                min: short_min,
                max: short_max,
            });
        }
        if long_min > long_max {
            return Err(TimingError::InvertedWindow {
                window: "long",
                min: long_min,
                max: long_max,
            });
        }
        if short_max >= long_min {
            return Err(TimingError::Overlap {
                short_max,
                long_min,
            });
        }
        Ok(Self {
            short_min,
            short_max,
            long_min,
            long_max,
        })
    }

    /// Builds `[h - t, h + t]` and `[2h - t, 2h + t]` around a nominal
    /// half-bit width `h`.
    ///
    /// # Errors
    ///
    /// Returns [`TimingError::ToleranceTooWide`] if `tolerance >= half_bit`,
    /// or any error [`TimingProfile::new`] would return.
    pub fn from_nominal(half_bit: Ticks, tolerance: Ticks) -> Result<Self, TimingError> {
        if tolerance >= half_bit {
            return Err(TimingError::ToleranceTooWide {
                half_bit,
                tolerance,
            });
        }
        let long = half_bit.saturating_mul(2);
        Self::new(
            half_bit - tolerance,
            half_bit.saturating_add(tolerance),
            long - tolerance,
            long.saturating_add(tolerance),
        )
    }

    /// The reference profile: short `[7, 13]`, long `[17, 23]` ticks.
    pub fn reference() -> Self {
        Self {
            short_min: 7,
            short_max: 13,
            long_min: 17,
            long_max: 23,
        }
    }

    /// Classifies a duration against both windows.
    pub fn classify(&self, duration: Ticks) -> PulseClass {
        if (self.short_min..=self.short_max).contains(&duration) {
            PulseClass::Short
        } else if (self.long_min..=self.long_max).contains(&duration) {
            PulseClass::Long
        } else {
            PulseClass::Noise
        }
    }

    pub fn short_min(&self) -> Ticks {
        self.short_min
    }

    pub fn short_max(&self) -> Ticks {
        self.short_max
    }

    pub fn long_min(&self) -> Ticks {
        self.long_min
    }

    pub fn long_max(&self) -> Ticks {
        self.long_max
    }

    /// Centre of the short window, used as the transmit half-bit width when
    /// no explicit width is configured.
    pub fn nominal_half_bit(&self) -> Ticks {
        self.short_min + (self.short_max - self.short_min) / 2
    }
}

impl Default for TimingProfile {
    fn default() -> Self {
        Self::reference()
    }
}

/// Unchecked serde mirror of [`TimingProfile`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct RawTimingProfile {
    short_min: Ticks,
    short_max: Ticks,
    long_min: Ticks,
    long_max: Ticks,
}

impl TryFrom<RawTimingProfile> for TimingProfile {
    type Error = TimingError;

    fn try_from(raw: RawTimingProfile) -> Result<Self, Self::Error> {
        TimingProfile::new(raw.short_min, raw.short_max, raw.long_min, raw.long_max)
    }
}

impl From<TimingProfile> for RawTimingProfile {
    fn from(p: TimingProfile) -> Self {
        Self {
            short_min: p.short_min,
            short_max: p.short_max,
            long_min: p.long_min,
            long_max: p.long_max,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_profile_matches_nominal_construction() {
        // Arrange / Act
        let built = TimingProfile::from_nominal(
            TimingProfile::REFERENCE_HALF_BIT,
            TimingProfile::REFERENCE_TOLERANCE,
        )
        .unwrap();

        // Assert
        assert_eq!(built, TimingProfile::reference());
    }

    #[test]
    fn test_classify_inclusive_window_edges() {
        let p = TimingProfile::reference();
        assert_eq!(p.classify(7), PulseClass::Short);
        assert_eq!(p.classify(10), PulseClass::Short);
        assert_eq!(p.classify(13), PulseClass::Short);
        assert_eq!(p.classify(17), PulseClass::Long);
        assert_eq!(p.classify(20), PulseClass::Long);
        assert_eq!(p.classify(23), PulseClass::Long);
    }

    #[test]
    fn test_classify_one_tick_outside_is_noise() {
        let p = TimingProfile::reference();
        assert_eq!(p.classify(6), PulseClass::Noise);
        assert_eq!(p.classify(14), PulseClass::Noise);
        assert_eq!(p.classify(16), PulseClass::Noise);
        assert_eq!(p.classify(24), PulseClass::Noise);
        assert_eq!(p.classify(0), PulseClass::Noise);
    }

    #[test]
    fn test_new_rejects_overlapping_windows() {
        // Arrange / Act: short_max == long_min would be ambiguous
        let result = TimingProfile::new(7, 17, 17, 23);

        // Assert
        assert_eq!(
            result,
            Err(TimingError::Overlap {
                short_max: 17,
                long_min: 17
            })
        );
    }

    #[test]
    fn test_new_rejects_inverted_window() {
        let result = TimingProfile::new(7, 13, 23, 17);
        assert!(matches!(
            result,
            Err(TimingError::InvertedWindow { window: "long", .. })
        ));
    }

    #[test]
    fn test_new_rejects_zero_short_min() {
        assert_eq!(
            TimingProfile::new(0, 13, 17, 23),
            Err(TimingError::ZeroShortMin)
        );
    }

    #[test]
    fn test_from_nominal_rejects_tolerance_wider_than_half_bit() {
        let result = TimingProfile::from_nominal(4, 4);
        assert!(matches!(result, Err(TimingError::ToleranceTooWide { .. })));
    }

    #[test]
    fn test_nominal_half_bit_is_window_centre() {
        assert_eq!(TimingProfile::reference().nominal_half_bit(), 10);
    }

    #[test]
    fn test_class_half_bit_counts() {
        assert_eq!(PulseClass::Short.half_bits(), 1);
        assert_eq!(PulseClass::Long.half_bits(), 2);
        assert_eq!(PulseClass::Noise.half_bits(), 0);
    }
}
