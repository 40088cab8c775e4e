//! # spear-core
//!
//! Line-coding engine shared by every S.P.E.A.R. bridge binary.  It turns
//! bytes into timed level transitions (pulses) and recovers bytes from a
//! captured, possibly noisy, pulse stream.
//!
//! This crate has zero dependencies on OS APIs, sockets or async runtimes.
//! Everything here is a pure, bounded-time transformation over its input,
//! so it can run inside a cooperative polling loop or a unit test alike.
//!
//! # Architecture overview
//!
//! ```text
//! bytes ──► PulseEncoder ──► [PulseEvent] ──► (transport) ──► [PulseEvent]
//!                                                                  │
//!                                  Frame ◄── FrameAssembler ◄── PulseDecoder
//! ```
//!
//! - **`linecode::encoder`** – MSB-first Manchester encoding, two half-bit
//!   pulses per data bit.
//! - **`linecode::decoder`** – timing classification (short / long / noise)
//!   and the half-bit phase state machine.
//! - **`linecode::frame`** – one idle-bounded capture batch in, at most one
//!   non-empty frame out.
//! - **`linecode::timing`** – the tick windows that separate a half-bit pulse
//!   from a merged two-half-bit pulse.
//!
//! There is no checksum, preamble or resynchronisation anywhere in this
//! crate: a frame's boundary is purely timing-derived and a misclassified
//! edge silently corrupts the payload.

pub mod error;
pub mod linecode;

pub use error::TimingError;
pub use linecode::decoder::{BitPhase, ByteAccumulator, DecodedBatch, PulseDecoder};
pub use linecode::encoder::PulseEncoder;
pub use linecode::frame::{AssemblerStats, Frame, FrameAssembler};
pub use linecode::pulse::{Level, PulseEvent, Ticks};
pub use linecode::timing::{PulseClass, TimingProfile};
