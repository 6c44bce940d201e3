//! Trajectory planning on top of the ephemeris and the Lambert solver:
//! single transfer evaluation and porkchop grid generation.

pub mod porkchop;
pub mod transfer;

pub use porkchop::{CellMetrics, PorkchopEvaluator, PorkchopGrid, PorkchopRequest, porkchop};
pub use transfer::{PlannerError, TRAJECTORY_SAMPLES, Transfer, TrajectorySample, compute_transfer};
