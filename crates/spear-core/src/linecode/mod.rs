//! Line code: pulse types, timing windows, encoder, decoder and framing.

pub mod decoder;
pub mod encoder;
pub mod frame;
pub mod pulse;
pub mod timing;

pub use decoder::{BitPhase, ByteAccumulator, DecodedBatch, PulseDecoder};
pub use encoder::PulseEncoder;
pub use frame::{AssemblerStats, Frame, FrameAssembler};
pub use pulse::{Level, PulseEvent, Ticks};
pub use timing::{PulseClass, TimingProfile};
