//! Logout countdown
//!
//! A two-state machine (running with some seconds left, or stopped). The
//! session service owns one and drives it once per second. Every `start`
//! bumps the generation, so a ticker that belongs to an earlier start can
//! tell that it has been superseded.

use std::time::Duration;

use serde::Serialize;

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CountdownState {
    Running { remaining_secs: u64 },
    Stopped,
}

/// What a single tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Still running with this many seconds left
    Running(u64),
    /// Reached zero on this tick and stopped
    Expired,
    /// Nothing to do, the countdown was already stopped
    Idle,
}

#[derive(Debug, Clone)]
pub struct Countdown {
    duration_secs: u64,
    state: CountdownState,
    generation: u64,
}

impl Countdown {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration_secs: duration.as_secs().max(1),
            state: CountdownState::Stopped,
            generation: 0,
        }
    }

    /// (Re)start from the full duration, returning the new generation
    pub fn start(&mut self) -> u64 {
        self.generation += 1;
        self.state = CountdownState::Running {
            remaining_secs: self.duration_secs,
        };
        self.generation
    }

    /// Stop counting; stopping a stopped countdown does nothing
    pub fn stop(&mut self) {
        self.state = CountdownState::Stopped;
    }

    pub fn tick(&mut self) -> TickOutcome {
        match self.state {
            CountdownState::Stopped => TickOutcome::Idle,
            CountdownState::Running { remaining_secs } => {
                let remaining_secs = remaining_secs.saturating_sub(1);
                if remaining_secs == 0 {
                    self.state = CountdownState::Stopped;
                    TickOutcome::Expired
                } else {
                    self.state = CountdownState::Running { remaining_secs };
                    TickOutcome::Running(remaining_secs)
                }
            }
        }
    }

    pub fn state(&self) -> CountdownState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn duration_secs(&self) -> u64 {
        self.duration_secs
    }

    pub fn remaining_secs(&self) -> Option<u64> {
        match self.state {
            CountdownState::Running { remaining_secs } => Some(remaining_secs),
            CountdownState::Stopped => None,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, CountdownState::Running { .. })
    }
}
