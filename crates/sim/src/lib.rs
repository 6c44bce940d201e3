//! The time-stepped simulation: a clock with variable acceleration, per-tick
//! body states, and the roster of launched missions.
//!
//! The engine is synchronous and owns all mutable simulation state; the
//! server drives it from a single tick task and feeds it wall-clock deltas,
//! so `step` stays a pure function of (state, Δt) and identical command
//! traces replay identically.

use thiserror::Error;

pub mod clock;
pub mod engine;
pub mod mission;

pub use clock::{RunState, SimulationClock};
pub use engine::{Engine, EngineCommand};
pub use mission::{Mission, MissionStatus};

/// Errors surfaced by simulation commands.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("speed must be positive and finite, got {0}")]
    InvalidSpeed(f64),
    #[error("simulation is stopped")]
    Stopped,
}
