//! Local round timer
//!
//! Wall-clock countdown that gates whether moves go anywhere. Not stored on
//! chain; every client runs its own.

use serde::{Deserialize, Serialize};

/// Current phase of the round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundPhase {
    /// Waiting for the local slice to spawn
    NotStarted,
    /// Countdown running, moves dispatched
    Running,
    /// Countdown hit zero, moves ignored until restart
    Over,
}

/// Countdown state machine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundTimer {
    pub phase: RoundPhase,
    /// Seconds remaining
    pub remaining: u32,
    duration: u32,
}

impl RoundTimer {
    pub fn new(duration: u32) -> Self {
        Self {
            phase: RoundPhase::NotStarted,
            remaining: duration,
            duration,
        }
    }

    /// Start the round the first time the local slice has size
    pub fn observe_size(&mut self, size: u32) {
        if self.phase == RoundPhase::NotStarted && size > 0 {
            self.phase = RoundPhase::Running;
            self.remaining = self.duration;
            log::info!("Round started ({}s)", self.duration);
        }
    }

    /// One-second tick. Returns true when this tick ended the round (the
    /// caller runs a final reconciliation poll).
    pub fn tick(&mut self) -> bool {
        if self.phase != RoundPhase::Running {
            return false;
        }
        if self.remaining <= 1 {
            self.remaining = 0;
            self.phase = RoundPhase::Over;
            log::info!("Round over");
            return true;
        }
        self.remaining -= 1;
        false
    }

    /// Start a new round after the previous one ended
    pub fn restart(&mut self) {
        if self.phase != RoundPhase::Over {
            return;
        }
        self.remaining = self.duration;
        self.phase = RoundPhase::Running;
        log::info!("Round restarted");
    }

    pub fn is_over(&self) -> bool {
        self.phase == RoundPhase::Over
    }

    pub fn is_running(&self) -> bool {
        self.phase == RoundPhase::Running
    }
}
