//! Error types for the line-coding engine.
//!
//! Decoding itself never fails: noise is dropped and truncated bytes are
//! discarded locally.  The only fallible operation in this crate is building
//! a [`crate::TimingProfile`] from untrusted configuration.

use thiserror::Error;

use crate::linecode::pulse::Ticks;

/// Errors raised while validating a timing profile.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimingError {
    /// A window's lower bound is above its upper bound.
    #[error("inverted {window} window: min {min} > max {max}")]
    InvertedWindow {
        window: &'static str,
        min: Ticks,
        max: Ticks,
    },

    /// The short and long windows touch or overlap, so a duration could
    /// classify as both.
    #[error("ambiguous windows: short_max {short_max} must be below long_min {long_min}")]
    Overlap { short_max: Ticks, long_min: Ticks },

    /// A zero-width half-bit cannot be transmitted.
    #[error("short_min must be at least 1 tick")]
    ZeroShortMin,

    /// The tolerance swallows the whole nominal half-bit width.
    #[error("tolerance {tolerance} must be smaller than the half-bit width {half_bit}")]
    ToleranceTooWide { half_bit: Ticks, tolerance: Ticks },
}
