//! The simulation clock: seconds since epoch, scaled by a dimensionless
//! acceleration factor while playing.

use crate::SimError;

/// Run state of the simulation. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Paused,
    Playing,
    Stopped,
}

/// Simulation time and pacing. Owned exclusively by the engine.
#[derive(Debug, Clone)]
pub struct SimulationClock {
    /// Simulation time (s since epoch J2000). Monotonic non-decreasing
    /// while playing.
    pub sim_time_s: f64,
    /// Wall-to-simulation acceleration factor; always positive.
    pub time_scale: f64,
    pub state: RunState,
}

impl SimulationClock {
    /// A paused clock at the given simulation instant, running 1:1.
    pub fn new(start_time_s: f64) -> Self {
        Self {
            sim_time_s: start_time_s,
            time_scale: 1.0,
            state: RunState::Paused,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.state == RunState::Playing
    }

    /// Advance by a wall-clock delta; a no-op unless playing.
    pub fn advance(&mut self, wall_dt_s: f64) {
        if self.is_playing() && wall_dt_s > 0.0 {
            self.sim_time_s += wall_dt_s * self.time_scale;
        }
    }

    /// Set the acceleration factor; rejects non-positive or non-finite
    /// values without touching the current scale.
    pub fn set_speed(&mut self, factor: f64) -> Result<(), SimError> {
        if !(factor.is_finite() && factor > 0.0) {
            return Err(SimError::InvalidSpeed(factor));
        }
        self.time_scale = factor;
        Ok(())
    }
}
