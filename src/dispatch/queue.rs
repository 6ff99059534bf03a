//! Submission ordering
//!
//! One transaction in flight per dispatcher; the rest wait in FIFO order.
//! A failed submission releases the queue exactly like a successful one.

use std::collections::VecDeque;

use super::TxIntent;

#[derive(Debug, Default)]
pub struct TxQueue {
    waiting: VecDeque<TxIntent>,
    in_flight: bool,
}

impl TxQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an intent. Returns it back if it should be submitted now.
    pub fn enqueue(&mut self, intent: TxIntent) -> Option<TxIntent> {
        if self.in_flight {
            self.waiting.push_back(intent);
            None
        } else {
            self.in_flight = true;
            Some(intent)
        }
    }

    /// The in-flight submission finished; returns the next one to start
    pub fn complete(&mut self) -> Option<TxIntent> {
        let next = self.waiting.pop_front();
        self.in_flight = next.is_some();
        next
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight
    }

    /// Drop queued moves, keeping any queued respawn. Returns how many went.
    pub fn discard_moves(&mut self) -> usize {
        let before = self.waiting.len();
        self.waiting.retain(|intent| *intent == TxIntent::Respawn);
        before - self.waiting.len()
    }
}
