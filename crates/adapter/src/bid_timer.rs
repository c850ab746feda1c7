//! Timing of a bid round, for the summary line logged on completion.

use std::time::{Duration, Instant};

/// Milestones of one round: the SDK load was requested, then every slot
/// definition was queued. The auction itself ends whenever the exchange
/// calls back, which is when the summary is logged.
#[derive(Debug, Clone, Copy)]
pub struct BidTimer {
    started: Instant,
    sdk_requested: Option<Instant>,
    slots_queued: Option<Instant>,
}

impl BidTimer {
    #[must_use]
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            sdk_requested: None,
            slots_queued: None,
        }
    }

    pub fn mark_sdk(&mut self) {
        self.sdk_requested = Some(Instant::now());
    }

    pub fn mark_slots(&mut self) {
        self.slots_queued = Some(Instant::now());
    }

    /// Time spent getting the SDK load going.
    #[must_use]
    pub fn sdk_ms(&self) -> f64 {
        self.sdk_requested
            .map_or(0.0, |at| millis(at.duration_since(self.started)))
    }

    /// Time spent queueing slot definitions after the SDK request.
    #[must_use]
    pub fn slots_ms(&self) -> f64 {
        let Some(queued) = self.slots_queued else {
            return 0.0;
        };
        millis(queued.duration_since(self.sdk_requested.unwrap_or(self.started)))
    }

    #[must_use]
    pub fn total_ms(&self) -> f64 {
        millis(self.started.elapsed())
    }

    #[must_use]
    pub fn log_line(&self) -> String {
        format!(
            "fastlane bidding complete: {:.1}ms (sdk={:.1}ms slots={:.1}ms)",
            self.total_ms(),
            self.sdk_ms(),
            self.slots_ms(),
        )
    }
}

fn millis(elapsed: Duration) -> f64 {
    elapsed.as_secs_f64() * 1000.0
}
