//! Orbit Engine: deterministic heliocentric simulation and mission planning.
//!
//! The physics and planning logic lives in per-concern workspace crates; this
//! facade re-exports them under one roof so front-ends (CLI, observers, tests)
//! depend on a single crate.

pub use orbit_config as config;
pub use orbit_core as core;
pub use orbit_ephemeris as ephemeris;
pub use orbit_impulsive as impulsive;
pub use orbit_journal as journal;
pub use orbit_server as server;
pub use orbit_sim as sim;
pub use orbit_transfer as transfer;

/// Returns the version of the library for smoke tests.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
