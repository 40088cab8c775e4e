//! Edge-capture model shared by the pulse transports.
//!
//! A receive peripheral does not see the transmitter's pulse list; it sees a
//! line level and timestamps its transitions.  [`PulseCapture`] turns a raw
//! stream of `(duration, level)` segments into what such a peripheral would
//! hand the decoder.  Each recorded segment goes through these stages:
//!
//! 1. **Idle split** – a segment at least `idle_threshold` long ends the
//!    current batch (the line went quiet).
//! 2. **Glitch filter** – a segment shorter than `filter_min` is ignored; its
//!    time is credited to the level that was already on the line.
//! 3. **Level merge** – a segment at the same level as the previous one
//!    extends it, since no edge separates them.
//! 4. **Bounded queue** – at most `capacity` events wait to be decoded,
//!    across all finished and in-progress batches.  Events beyond that are
//!    lost, and the batch they belonged to is flagged `overflowed`.
//!
//! Finished batches are handed out oldest first by [`PulseCapture::try_take`].

use std::collections::VecDeque;

use spear_core::{PulseEvent, Ticks};
use tracing::{debug, trace};

use crate::application::CapturedBatch;
use crate::domain::LinkConfig;

/// Bounded, idle-delimited capture queue.
#[derive(Debug, Clone)]
pub struct PulseCapture {
    filter_min: Ticks,
    idle_threshold: Ticks,
    capacity: usize,
    pending: Vec<PulseEvent>,
    pending_overflowed: bool,
    pending_lost: usize,
    /// Something (even a filtered glitch) arrived since the last idle.
    activity: bool,
    ready: VecDeque<CapturedBatch>,
    /// Events held in `ready` plus `pending`.
    queued: usize,
    glitches_filtered: u64,
}

impl PulseCapture {
    pub fn new(filter_min: Ticks, idle_threshold: Ticks, capacity: usize) -> Self {
        Self {
            filter_min,
            idle_threshold,
            capacity,
            pending: Vec::new(),
            pending_overflowed: false,
            pending_lost: 0,
            activity: false,
            ready: VecDeque::new(),
            queued: 0,
            glitches_filtered: 0,
        }
    }

    pub fn from_config(link: &LinkConfig) -> Self {
        Self::new(
            link.filter_min_ticks,
            link.idle_threshold_ticks,
            link.capture_capacity,
        )
    }

    /// Feeds one line segment into the capture.
    pub fn record(&mut self, segment: PulseEvent) {
        if segment.duration >= self.idle_threshold {
            self.idle();
            return;
        }
        self.activity = true;

        if segment.duration < self.filter_min {
            self.glitches_filtered += 1;
            trace!(duration = segment.duration, "glitch filtered");
            if let Some(last) = self.pending.last_mut() {
                last.duration = last.duration.saturating_add(segment.duration);
            }
            return;
        }

        if self.pending_overflowed {
            self.pending_lost += 1;
            return;
        }

        if let Some(last) = self.pending.last_mut() {
            if last.level == segment.level {
                last.duration = last.duration.saturating_add(segment.duration);
                return;
            }
        }

        if self.queued >= self.capacity {
            debug!(capacity = self.capacity, "capture queue full");
            self.pending_overflowed = true;
            self.pending_lost += 1;
            return;
        }

        self.pending.push(segment);
        self.queued += 1;
    }

    /// Feeds a sequence of segments, in order.
    pub fn record_all(&mut self, segments: &[PulseEvent]) {
        for segment in segments {
            self.record(*segment);
        }
    }

    /// Marks the line as idle, closing the in-progress batch.
    ///
    /// Does nothing if nothing was recorded since the previous idle.
    pub fn idle(&mut self) {
        if !self.activity {
            return;
        }
        let batch = CapturedBatch {
            pulses: std::mem::take(&mut self.pending),
            overflowed: self.pending_overflowed,
            lost_events: self.pending_lost,
        };
        self.ready.push_back(batch);
        self.pending_overflowed = false;
        self.pending_lost = 0;
        self.activity = false;
    }

    /// Takes the oldest finished batch.
    pub fn try_take(&mut self) -> Option<CapturedBatch> {
        let batch = self.ready.pop_front()?;
        self.queued -= batch.pulses.len();
        Some(batch)
    }

    /// Number of finished batches waiting.
    pub fn ready_batches(&self) -> usize {
        self.ready.len()
    }

    /// Events currently held, finished or in progress.
    pub fn queued_events(&self) -> usize {
        self.queued
    }

    pub fn glitches_filtered(&self) -> u64 {
        self.glitches_filtered
    }
}
