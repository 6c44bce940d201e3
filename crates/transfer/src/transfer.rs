//! Single-transfer evaluation: Lambert terminal velocities relative to the
//! departure and arrival bodies, launch energy, and the impulsive Δv total.

use orbit_core::time::seconds_to_days;
use orbit_core::units::ms_to_kms;
use orbit_core::vector::{self, Vector3};
use orbit_ephemeris::{Body, BodyState, EphemerisError, MU_SUN_M3_S2, propagate, propagate_state};
use orbit_impulsive::{LambertError, lambert};
use thiserror::Error;

/// Points sampled along a transfer arc for visualization.
pub const TRAJECTORY_SAMPLES: usize = 60;

/// Multi-revolution classes considered when sweeping Lambert branches.
const BRANCH_REVOLUTION_CAP: u32 = 8;

/// One sampled point of a transfer arc.
#[derive(Debug, Clone, Copy)]
pub struct TrajectorySample {
    /// Seconds since epoch.
    pub t_s: f64,
    /// Heliocentric position (m).
    pub position_m: Vector3,
}

/// A fully evaluated interplanetary transfer.
#[derive(Debug, Clone)]
pub struct Transfer {
    pub departure: Body,
    pub arrival: Body,
    /// Departure instant (s since epoch).
    pub t_dep_s: f64,
    /// Arrival instant (s since epoch).
    pub t_arr_s: f64,
    /// Time of flight (s).
    pub tof_s: f64,
    /// Heliocentric departure position (m).
    pub r1_m: Vector3,
    /// Heliocentric arrival position (m).
    pub r2_m: Vector3,
    /// Lambert departure velocity (m/s).
    pub v1_m_s: Vector3,
    /// Lambert arrival velocity (m/s).
    pub v2_m_s: Vector3,
    /// Hyperbolic excess relative to the departure body (m/s).
    pub vinf_dep_m_s: Vector3,
    /// Hyperbolic excess relative to the arrival body (m/s).
    pub vinf_arr_m_s: Vector3,
    /// Characteristic energy |v∞_dep|² (km²/s²).
    pub c3_km2_s2: f64,
    /// Impulsive free-flight total |v∞_dep| + |v∞_arr| (km/s).
    pub delta_v_km_s: f64,
    /// Complete revolutions of the selected Lambert branch.
    pub revolutions: u32,
    /// Sampled arc for visualization, departure to arrival inclusive.
    pub trajectory: Vec<TrajectorySample>,
}

/// Errors surfaced by the planner.
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("ephemeris propagation failed: {0}")]
    Ephemeris(#[from] EphemerisError),
    #[error("lambert solver failed: {0}")]
    Lambert(#[from] LambertError),
    #[error("arrival at {t_arr_s} s does not follow departure at {t_dep_s} s")]
    InvalidTimeOfFlight { t_dep_s: f64, t_arr_s: f64 },
    #[error("date window is empty or reversed")]
    InvalidWindow,
    #[error("no feasible transfers in the requested window")]
    NoFeasibleTransfers,
}

/// Metrics of the best prograde Lambert branch between two body states.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BranchMetrics {
    pub v1_m_s: Vector3,
    pub v2_m_s: Vector3,
    pub vinf_dep_m_s: Vector3,
    pub vinf_arr_m_s: Vector3,
    pub c3_km2_s2: f64,
    pub delta_v_km_s: f64,
    pub revolutions: u32,
}

/// Sweep the prograde Lambert branches (zero-rev plus every feasible
/// complete-revolution class) and keep the minimum-Δv one.
///
/// Retrograde branches are never considered.
pub(crate) fn best_prograde_branch(
    dep: &BodyState,
    arr: &BodyState,
    tof_s: f64,
) -> Result<BranchMetrics, LambertError> {
    let candidates = lambert::solutions(
        &dep.position_m,
        &arr.position_m,
        tof_s,
        MU_SUN_M3_S2,
        true,
        BRANCH_REVOLUTION_CAP,
    )?;

    let mut best: Option<BranchMetrics> = None;
    for candidate in candidates {
        let vinf_dep = vector::sub(&candidate.v1, &dep.velocity_m_s);
        let vinf_arr = vector::sub(&candidate.v2, &arr.velocity_m_s);
        let vinf_dep_mag = vector::norm(&vinf_dep);
        let vinf_arr_mag = vector::norm(&vinf_arr);
        let metrics = BranchMetrics {
            v1_m_s: candidate.v1,
            v2_m_s: candidate.v2,
            vinf_dep_m_s: vinf_dep,
            vinf_arr_m_s: vinf_arr,
            c3_km2_s2: ms_to_kms(vinf_dep_mag).powi(2),
            delta_v_km_s: ms_to_kms(vinf_dep_mag + vinf_arr_mag),
            revolutions: candidate.revolutions,
        };
        let better = best
            .as_ref()
            .is_none_or(|current| metrics.delta_v_km_s < current.delta_v_km_s);
        if better {
            best = Some(metrics);
        }
    }

    best.ok_or(LambertError::ConvergenceFailure)
}

/// Evaluate the transfer departing `dep` at `t_dep_s` and arriving at `arr`
/// at `t_arr_s` (both seconds since epoch).
pub fn compute_transfer(
    dep: Body,
    arr: Body,
    t_dep_s: f64,
    t_arr_s: f64,
) -> Result<Transfer, PlannerError> {
    if t_arr_s <= t_dep_s {
        return Err(PlannerError::InvalidTimeOfFlight { t_dep_s, t_arr_s });
    }
    let tof_s = t_arr_s - t_dep_s;

    let dep_state = propagate(dep, t_dep_s)?;
    let arr_state = propagate(arr, t_arr_s)?;
    let branch = best_prograde_branch(&dep_state, &arr_state, tof_s)?;
    let trajectory = sample_arc(&dep_state.position_m, &branch.v1_m_s, t_dep_s, tof_s)?;

    Ok(Transfer {
        departure: dep,
        arrival: arr,
        t_dep_s,
        t_arr_s,
        tof_s,
        r1_m: dep_state.position_m,
        r2_m: arr_state.position_m,
        v1_m_s: branch.v1_m_s,
        v2_m_s: branch.v2_m_s,
        vinf_dep_m_s: branch.vinf_dep_m_s,
        vinf_arr_m_s: branch.vinf_arr_m_s,
        c3_km2_s2: branch.c3_km2_s2,
        delta_v_km_s: branch.delta_v_km_s,
        revolutions: branch.revolutions,
        trajectory,
    })
}

impl Transfer {
    /// Time of flight in days, as reported on the wire.
    pub fn tof_days(&self) -> f64 {
        seconds_to_days(self.tof_s)
    }
}

/// Propagate the osculating state at departure along the arc at evenly
/// spaced times.
fn sample_arc(
    r1: &Vector3,
    v1: &Vector3,
    t_dep_s: f64,
    tof_s: f64,
) -> Result<Vec<TrajectorySample>, PlannerError> {
    let mut samples = Vec::with_capacity(TRAJECTORY_SAMPLES);
    let step = tof_s / (TRAJECTORY_SAMPLES - 1) as f64;
    for i in 0..TRAJECTORY_SAMPLES {
        let offset = step * i as f64;
        let (position, _) = propagate_state(r1, v1, offset, MU_SUN_M3_S2)?;
        samples.push(TrajectorySample {
            t_s: t_dep_s + offset,
            position_m: position,
        });
    }
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrival_must_follow_departure() {
        assert!(matches!(
            compute_transfer(Body::Earth, Body::Mars, 1_000.0, 1_000.0),
            Err(PlannerError::InvalidTimeOfFlight { .. })
        ));
        assert!(matches!(
            compute_transfer(Body::Earth, Body::Mars, 1_000.0, 500.0),
            Err(PlannerError::InvalidTimeOfFlight { .. })
        ));
    }

    #[test]
    fn trajectory_spans_the_flight_interval() {
        let t_dep = orbit_core::time::parse_epoch("2024-10-07T00:00:00Z").expect("dep");
        let t_arr = orbit_core::time::parse_epoch("2025-08-18T00:00:00Z").expect("arr");
        let transfer = compute_transfer(Body::Earth, Body::Mars, t_dep, t_arr).expect("transfer");

        assert_eq!(transfer.trajectory.len(), TRAJECTORY_SAMPLES);
        let first = transfer.trajectory.first().expect("first sample");
        let last = transfer.trajectory.last().expect("last sample");
        assert!((first.t_s - t_dep).abs() < 1.0);
        assert!((last.t_s - t_arr).abs() < 1.0);
        let start_error = vector::norm(&vector::sub(&first.position_m, &transfer.r1_m));
        assert!(start_error < 1.0, "arc must start at r1, off by {start_error} m");
    }
}
