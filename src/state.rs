//! Debounced traffic-light state machine.
//!
//! Raw per-frame observations are noisy: a single misread frame must not
//! flip the reported state, and a light briefly occluded by a passing
//! object must not flicker to UNKNOWN. The debouncer requires consecutive
//! agreeing frames before a state change and keeps reporting the confirmed
//! state through a bounded persistence window.

use std::time::{Duration, Instant};

/// Consecutive agreeing frames required to confirm a state change.
pub const CONFIRMATION_FRAMES: u32 = 3;

/// How long a confirmed state keeps being reported without reconfirmation.
pub const PERSISTENCE_WINDOW: Duration = Duration::from_millis(5000);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TrafficLightState {
    Red,
    Green,
    #[default]
    Unknown,
}

impl TrafficLightState {
    /// Raw observed state for a detection label.
    pub fn from_label(label: &str) -> Self {
        if label.eq_ignore_ascii_case("red") {
            TrafficLightState::Red
        } else if label.eq_ignore_ascii_case("green") {
            TrafficLightState::Green
        } else {
            TrafficLightState::Unknown
        }
    }
}

/// Per-session debouncer state.
///
/// Moore-style machine with hysteresis: a candidate state is promoted to
/// the confirmed state after [`CONFIRMATION_FRAMES`] consecutive agreeing
/// frames, and the confirmed state decays to UNKNOWN once
/// [`PERSISTENCE_WINDOW`] passes without reconfirmation. A fresh
/// observation whose confirmed value has gone stale still reports UNKNOWN
/// until it re-confirms; that conservatism is intentional.
pub struct StateDebouncer {
    confirmed: TrafficLightState,
    confirmed_at: Instant,
    candidate: TrafficLightState,
    run_length: u32,
}

impl StateDebouncer {
    pub fn new() -> Self {
        Self::new_at(Instant::now())
    }

    /// Construct with an explicit session-start instant (tests).
    pub fn new_at(now: Instant) -> Self {
        Self {
            confirmed: TrafficLightState::Unknown,
            confirmed_at: now,
            candidate: TrafficLightState::Unknown,
            run_length: 0,
        }
    }

    /// Reinitialize, e.g. on model or backend switch.
    pub fn reset(&mut self) {
        self.reset_at(Instant::now());
    }

    /// [`StateDebouncer::reset`] with an injected clock.
    pub fn reset_at(&mut self, now: Instant) {
        *self = Self::new_at(now);
    }

    /// Feed this frame's raw observation and get the debounced state.
    pub fn update(&mut self, observed: TrafficLightState) -> TrafficLightState {
        self.update_at(observed, Instant::now())
    }

    /// [`StateDebouncer::update`] with an injected clock.
    pub fn update_at(&mut self, observed: TrafficLightState, now: Instant) -> TrafficLightState {
        if observed != TrafficLightState::Unknown {
            if observed == self.candidate {
                self.run_length += 1;
            } else {
                self.candidate = observed;
                self.run_length = 1;
            }
            // Every agreeing frame past the threshold re-stamps the
            // confirmation, keeping the persistence window alive.
            if self.run_length >= CONFIRMATION_FRAMES {
                if self.confirmed != observed {
                    log::info!("traffic light state confirmed: {:?}", observed);
                }
                self.confirmed = observed;
                self.confirmed_at = now;
            }
        }

        if now.duration_since(self.confirmed_at) < PERSISTENCE_WINDOW {
            self.confirmed
        } else {
            TrafficLightState::Unknown
        }
    }
}

impl Default for StateDebouncer {
    fn default() -> Self {
        Self::new()
    }
}
