//! Redraw scheduling
//!
//! Redraw requests are coalesced into frames capped at a target rate. While
//! the user zooms or pans continuously, frames drop to a lower rate and draft
//! quality; once the interaction has been quiet for the settle delay, one
//! full-quality frame follows.

use std::time::{Duration, Instant};

use crate::settings::FrameSettings;

/// Quality a frame should be drawn at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameQuality {
    Full,
    /// Reduced quality during continuous interaction
    Draft,
}

#[derive(Debug, Clone)]
pub struct FrameScheduler {
    frame_interval: Duration,
    interaction_interval: Duration,
    settle_delay: Duration,
    pending: bool,
    last_frame: Option<Instant>,
    last_interaction: Option<Instant>,
    /// Draft frames were drawn since the last full frame
    settle_pending: bool,
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new(&FrameSettings::default())
    }
}

fn interval(fps: u32) -> Duration {
    Duration::from_nanos(1_000_000_000 / u64::from(fps.max(1)))
}

impl FrameScheduler {
    pub fn new(settings: &FrameSettings) -> Self {
        Self {
            frame_interval: interval(settings.target_fps),
            interaction_interval: interval(settings.interaction_fps),
            settle_delay: Duration::from_millis(settings.settle_delay_ms),
            pending: false,
            last_frame: None,
            last_interaction: None,
            settle_pending: false,
        }
    }

    /// Ask for a redraw. Requests made before the next frame collapse into it.
    pub fn request_redraw(&mut self) {
        self.pending = true;
    }

    /// Record a continuous interaction step (zoom or pan) and ask for a redraw
    pub fn notify_interaction(&mut self, now: Instant) {
        self.last_interaction = Some(now);
        self.pending = true;
    }

    pub fn is_interacting(&self, now: Instant) -> bool {
        self.last_interaction
            .is_some_and(|last| now.saturating_duration_since(last) < self.settle_delay)
    }

    /// True while a redraw is pending or a settle frame is still owed
    pub fn has_pending(&self) -> bool {
        self.pending || self.settle_pending
    }

    /// The frame to draw now, if one is due and the rate limit allows it
    pub fn poll(&mut self, now: Instant) -> Option<FrameQuality> {
        let interacting = self.is_interacting(now);
        let settle_due = self.settle_pending && !interacting;
        if !self.pending && !settle_due {
            return None;
        }

        let min_interval = if interacting {
            self.interaction_interval
        } else {
            self.frame_interval
        };
        if let Some(last) = self.last_frame {
            if now.saturating_duration_since(last) < min_interval {
                return None;
            }
        }

        self.pending = false;
        self.last_frame = Some(now);
        if interacting {
            self.settle_pending = true;
            Some(FrameQuality::Draft)
        } else {
            self.settle_pending = false;
            Some(FrameQuality::Full)
        }
    }
}
