//! In-process pulse transport: whatever is transmitted is captured by the
//! same bridge, as if the emitter faced its own receiver.

use spear_core::PulseEvent;

use crate::application::{CapturedBatch, PulseTransport, TransportError};
use crate::domain::LinkConfig;
use crate::infrastructure::capture::PulseCapture;

/// Transmit side feeds the receive side's [`PulseCapture`] directly.
pub struct LoopbackTransport {
    capture: PulseCapture,
}

impl LoopbackTransport {
    pub fn new(capture: PulseCapture) -> Self {
        Self { capture }
    }

    pub fn from_config(link: &LinkConfig) -> Self {
        Self::new(PulseCapture::from_config(link))
    }

    /// Direct access to the receive side, e.g. to inject line noise.
    pub fn capture_mut(&mut self) -> &mut PulseCapture {
        &mut self.capture
    }

    pub fn capture(&self) -> &PulseCapture {
        &self.capture
    }
}

impl PulseTransport for LoopbackTransport {
    fn transmit(&mut self, pulses: &[PulseEvent]) -> Result<(), TransportError> {
        self.capture.record_all(pulses);
        self.capture.idle();
        Ok(())
    }

    fn try_receive(&mut self) -> Result<Option<CapturedBatch>, TransportError> {
        Ok(self.capture.try_take())
    }
}
