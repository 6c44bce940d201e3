//! Porkchop grid generation: launch-energy and Δv surfaces over a
//! departure/arrival date window.
//!
//! The Kepler step is evaluated once per axis date; the Lambert step runs
//! per cell. Numeric failures are holes in the surface, never grid failures,
//! and evaluation is row-by-row so a caller can interleave it with other
//! work and stop at a deadline with a partial grid.

use orbit_core::time::seconds_to_days;
use orbit_ephemeris::{Body, BodyState, propagate};

use crate::transfer::{PlannerError, best_prograde_branch};

/// Hard per-axis cap; requests beyond it are clamped by the caller.
pub const MAX_AXIS_POINTS: usize = 200;

/// A porkchop request over two date windows (seconds since epoch).
#[derive(Debug, Clone)]
pub struct PorkchopRequest {
    pub departure: Body,
    pub arrival: Body,
    pub departure_start_s: f64,
    pub departure_end_s: f64,
    pub arrival_start_s: f64,
    pub arrival_end_s: f64,
    /// Grid shape: (departure points, arrival points).
    pub grid: (usize, usize),
}

/// Metrics of one feasible grid cell.
#[derive(Debug, Clone, Copy)]
pub struct CellMetrics {
    pub c3_km2_s2: f64,
    pub delta_v_km_s: f64,
    pub tof_days: f64,
}

/// The evaluated surface. Cell `[i][j]` pairs departure date `i` with
/// arrival date `j`; `None` marks an infeasible or unevaluated cell.
#[derive(Debug, Clone)]
pub struct PorkchopGrid {
    pub departure_times_s: Vec<f64>,
    pub arrival_times_s: Vec<f64>,
    pub c3_km2_s2: Vec<Vec<Option<f64>>>,
    pub delta_v_km_s: Vec<Vec<Option<f64>>>,
    pub tof_days: Vec<Vec<Option<f64>>>,
    /// True when a deadline cut evaluation short; trailing rows are null.
    pub partial: bool,
}

/// Axis states prepared once, ready for row-by-row Lambert evaluation.
pub struct PorkchopEvaluator {
    departure_times_s: Vec<f64>,
    arrival_times_s: Vec<f64>,
    departure_states: Vec<Option<BodyState>>,
    arrival_states: Vec<Option<BodyState>>,
}

impl PorkchopEvaluator {
    /// Validate the request and run the vectorized Kepler step over both
    /// date axes.
    pub fn new(request: &PorkchopRequest) -> Result<Self, PlannerError> {
        if request.departure_end_s < request.departure_start_s
            || request.arrival_end_s < request.arrival_start_s
        {
            return Err(PlannerError::InvalidWindow);
        }
        let (rows, cols) = request.grid;
        if rows == 0 || cols == 0 {
            return Err(PlannerError::InvalidWindow);
        }
        let rows = rows.min(MAX_AXIS_POINTS);
        let cols = cols.min(MAX_AXIS_POINTS);

        let departure_times_s = linspace(request.departure_start_s, request.departure_end_s, rows);
        let arrival_times_s = linspace(request.arrival_start_s, request.arrival_end_s, cols);
        let departure_states = axis_states(request.departure, &departure_times_s);
        let arrival_states = axis_states(request.arrival, &arrival_times_s);

        Ok(Self {
            departure_times_s,
            arrival_times_s,
            departure_states,
            arrival_states,
        })
    }

    /// Number of departure rows.
    pub fn rows(&self) -> usize {
        self.departure_times_s.len()
    }

    /// Number of arrival columns.
    pub fn cols(&self) -> usize {
        self.arrival_times_s.len()
    }

    /// Evaluate every cell of departure row `i`.
    ///
    /// Cells with arrival at or before departure, a missing axis state, or a
    /// failed Lambert solve are `None`.
    pub fn evaluate_row(&self, i: usize) -> Vec<Option<CellMetrics>> {
        let t_dep = self.departure_times_s[i];
        let dep_state = self.departure_states[i];

        self.arrival_times_s
            .iter()
            .zip(self.arrival_states.iter())
            .map(|(&t_arr, arr_state)| {
                let dep = dep_state.as_ref()?;
                let arr = arr_state.as_ref()?;
                if t_arr <= t_dep {
                    return None;
                }
                let tof_s = t_arr - t_dep;
                let branch = best_prograde_branch(dep, arr, tof_s).ok()?;
                Some(CellMetrics {
                    c3_km2_s2: branch.c3_km2_s2,
                    delta_v_km_s: branch.delta_v_km_s,
                    tof_days: seconds_to_days(tof_s),
                })
            })
            .collect()
    }

    /// Assemble a grid from evaluated rows, padding unevaluated trailing
    /// rows with nulls when a deadline stopped early.
    pub fn finish(
        &self,
        mut evaluated: Vec<Vec<Option<CellMetrics>>>,
        partial: bool,
    ) -> Result<PorkchopGrid, PlannerError> {
        while evaluated.len() < self.rows() {
            evaluated.push(vec![None; self.cols()]);
        }

        let any_feasible = evaluated
            .iter()
            .any(|row| row.iter().any(Option::is_some));
        if !any_feasible && !partial {
            return Err(PlannerError::NoFeasibleTransfers);
        }

        let mut c3 = Vec::with_capacity(evaluated.len());
        let mut delta_v = Vec::with_capacity(evaluated.len());
        let mut tof = Vec::with_capacity(evaluated.len());
        for row in &evaluated {
            c3.push(row.iter().map(|cell| cell.map(|c| c.c3_km2_s2)).collect());
            delta_v.push(row.iter().map(|cell| cell.map(|c| c.delta_v_km_s)).collect());
            tof.push(row.iter().map(|cell| cell.map(|c| c.tof_days)).collect());
        }

        Ok(PorkchopGrid {
            departure_times_s: self.departure_times_s.clone(),
            arrival_times_s: self.arrival_times_s.clone(),
            c3_km2_s2: c3,
            delta_v_km_s: delta_v,
            tof_days: tof,
            partial,
        })
    }
}

/// Evaluate a complete porkchop grid synchronously.
pub fn porkchop(request: &PorkchopRequest) -> Result<PorkchopGrid, PlannerError> {
    let evaluator = PorkchopEvaluator::new(request)?;
    let rows = (0..evaluator.rows())
        .map(|i| evaluator.evaluate_row(i))
        .collect();
    evaluator.finish(rows, false)
}

fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![start];
    }
    let step = (end - start) / (n - 1) as f64;
    (0..n).map(|i| start + step * i as f64).collect()
}

fn axis_states(body: Body, times_s: &[f64]) -> Vec<Option<BodyState>> {
    times_s.iter().map(|&t| propagate(body, t).ok()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbit_core::time::parse_epoch;

    #[test]
    fn reversed_window_is_rejected() {
        let request = PorkchopRequest {
            departure: Body::Earth,
            arrival: Body::Mars,
            departure_start_s: 100.0,
            departure_end_s: 0.0,
            arrival_start_s: 200.0,
            arrival_end_s: 300.0,
            grid: (4, 4),
        };
        assert!(matches!(
            porkchop(&request),
            Err(PlannerError::InvalidWindow)
        ));
    }

    #[test]
    fn arrival_before_departure_leaves_holes_not_failures() {
        // Arrival window entirely before the departure window: every cell
        // is null, so the grid as a whole is infeasible.
        let t0 = parse_epoch("2026-01-01").expect("t0");
        let request = PorkchopRequest {
            departure: Body::Earth,
            arrival: Body::Mars,
            departure_start_s: t0,
            departure_end_s: t0 + 10.0 * 86_400.0,
            arrival_start_s: t0 - 100.0 * 86_400.0,
            arrival_end_s: t0 - 50.0 * 86_400.0,
            grid: (3, 3),
        };
        assert!(matches!(
            porkchop(&request),
            Err(PlannerError::NoFeasibleTransfers)
        ));
    }

    #[test]
    fn small_earth_mars_grid_has_feasible_cells() {
        let request = PorkchopRequest {
            departure: Body::Earth,
            arrival: Body::Mars,
            departure_start_s: parse_epoch("2026-08-01").expect("dep start"),
            departure_end_s: parse_epoch("2026-12-01").expect("dep end"),
            arrival_start_s: parse_epoch("2027-02-01").expect("arr start"),
            arrival_end_s: parse_epoch("2027-12-01").expect("arr end"),
            grid: (6, 6),
        };
        let grid = porkchop(&request).expect("grid");
        assert_eq!(grid.c3_km2_s2.len(), 6);
        assert_eq!(grid.c3_km2_s2[0].len(), 6);
        assert!(!grid.partial);
        let feasible = grid
            .c3_km2_s2
            .iter()
            .flatten()
            .filter(|cell| cell.is_some())
            .count();
        assert!(feasible > 10, "expected a mostly feasible grid, got {feasible}");
    }
}
