//! Timed level transitions as seen on the wire.
//!
//! A [`PulseEvent`] says "the line sat at `level` for `duration` ticks".  The
//! transport produces them in time order and each one is consumed exactly
//! once.  A tick is the transport's time quantum (50 ns in the reference
//! configuration, i.e. an 80 MHz clock divided by 4).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Pulse duration measured in transport ticks.
pub type Ticks = u32;

/// Logic level held on the line for the duration of a pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Level {
    Low = 0,
    High = 1,
}

impl Level {
    /// Returns the opposite level.
    pub fn inverted(self) -> Self {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }

    /// Returns `true` for [`Level::High`].
    pub fn is_high(self) -> bool {
        self == Level::High
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", *self as u8)
    }
}

/// One captured or to-be-transmitted pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PulseEvent {
    /// How long the level was held, in ticks.
    pub duration: Ticks,
    /// The level held for `duration`.
    pub level: Level,
}

impl PulseEvent {
    pub const fn new(duration: Ticks, level: Level) -> Self {
        Self { duration, level }
    }

    pub const fn low(duration: Ticks) -> Self {
        Self::new(duration, Level::Low)
    }

    pub const fn high(duration: Ticks) -> Self {
        Self::new(duration, Level::High)
    }
}

impl fmt::Display for PulseEvent {
    /// Formats as `(level:duration)`, the notation used by capture previews.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}:{})", self.level, self.duration)
    }
}
