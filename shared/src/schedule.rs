//! Periodic tasks driven by an explicit clock.
//!
//! Session loops own one [`Periodic`] per repeating send and call
//! [`Periodic::poll`] with the current time every tick. Nothing here reads the
//! wall clock, so tests advance time by passing later instants.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct Periodic {
    period: Duration,
    next_fire: Option<Instant>,
}

impl Periodic {
    /// Creates a stopped task.
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next_fire: None,
        }
    }

    /// Schedules the first fire `initial_delay` after `now`.
    pub fn start(&mut self, now: Instant, initial_delay: Duration) {
        self.next_fire = Some(now + initial_delay);
    }

    /// Abandons any pending fire.
    pub fn stop(&mut self) {
        self.next_fire = None;
    }

    pub fn is_running(&self) -> bool {
        self.next_fire.is_some()
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn next_fire(&self) -> Option<Instant> {
        self.next_fire
    }

    /// Returns true if the task is due at `now` and schedules the next fire.
    ///
    /// Fires at most once per call. Missed periods are skipped rather than
    /// replayed in a burst.
    pub fn poll(&mut self, now: Instant) -> bool {
        let Some(due) = self.next_fire else {
            return false;
        };
        if now < due {
            return false;
        }

        let mut next = due + self.period;
        if next <= now {
            next = now + self.period;
        }
        self.next_fire = Some(next);
        true
    }
}
