//! Analytic heliocentric ephemeris: the planetary catalog and two-body
//! Keplerian propagation.
//!
//! Positions come from mean Keplerian elements at a single fixed epoch
//! (J2000.0), propagated with Kepler's equation. Accuracy is the mean-element
//! kind — arcminutes over decades — which is what a launch-window planner
//! needs; there is no perturbation model.

use orbit_core::vector::Vector3;
use thiserror::Error;

pub mod data;
pub mod kepler;
pub mod universal;

pub use data::{Body, BodyData, MU_SUN_M3_S2, OrbitalElements};
pub use kepler::{propagate, solve_kepler};
pub use universal::propagate_state;

/// Heliocentric state of a body at one simulation instant.
///
/// Recomputed from elements and time on every query; it has no independent
/// lifetime.
#[derive(Debug, Clone, Copy)]
pub struct BodyState {
    pub body: Body,
    /// Heliocentric ecliptic position (m).
    pub position_m: Vector3,
    /// Heliocentric ecliptic velocity (m/s).
    pub velocity_m_s: Vector3,
}

impl BodyState {
    /// State pinned to the frame origin, used for the Sun.
    pub fn at_rest(body: Body) -> Self {
        Self {
            body,
            position_m: [0.0; 3],
            velocity_m_s: [0.0; 3],
        }
    }
}

/// Errors surfaced while resolving bodies or propagating orbits.
#[derive(Debug, Error)]
pub enum EphemerisError {
    #[error("unknown body `{0}`")]
    UnknownBody(String),
    #[error("{context} did not converge within {iterations} iterations")]
    ConvergenceFailure {
        context: &'static str,
        iterations: u32,
    },
}
