//! Planner request execution on the cooperative scheduler.
//!
//! Grid evaluation yields between rows so the tick task keeps its cadence,
//! and checks a wall-clock deadline at each row boundary; expiry returns the
//! partial grid instead of an error. A session that disconnects mid-request
//! simply discards the finished result.

use std::str::FromStr;
use std::time::Duration;

use orbit_config::PlannerConfig;
use orbit_core::time::parse_epoch;
use orbit_ephemeris::Body;
use orbit_transfer::porkchop::MAX_AXIS_POINTS;
use orbit_transfer::{PorkchopEvaluator, PorkchopRequest, Transfer, compute_transfer};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::protocol::{
    PorkchopRequestPayload, PorkchopResponsePayload, RequestError, TransferRequestPayload,
    porkchop_payload,
};

/// Resolve and evaluate a single transfer request.
pub fn resolve_transfer(payload: &TransferRequestPayload) -> Result<Transfer, RequestError> {
    let departure = Body::from_str(&payload.departure)?;
    let arrival = Body::from_str(&payload.arrival)?;
    let t_dep = parse_epoch(&payload.departure_date)?;
    let t_arr = parse_epoch(&payload.arrival_date)?;
    Ok(compute_transfer(departure, arrival, t_dep, t_arr)?)
}

/// Evaluate a porkchop grid row by row under the configured deadline.
///
/// `cancelled` is probed at row boundaries; a session that has gone away
/// stops the evaluation instead of computing a result nobody will read.
pub async fn run_porkchop(
    payload: &PorkchopRequestPayload,
    config: &PlannerConfig,
    cancelled: impl Fn() -> bool,
) -> Result<PorkchopResponsePayload, RequestError> {
    let departure = Body::from_str(&payload.departure)?;
    let arrival = Body::from_str(&payload.arrival)?;

    let [rows, cols] = payload
        .grid
        .unwrap_or([config.default_grid, config.default_grid]);
    if rows > MAX_AXIS_POINTS || cols > MAX_AXIS_POINTS {
        warn!(rows, cols, cap = MAX_AXIS_POINTS, "clamping oversized porkchop grid");
    }

    let request = PorkchopRequest {
        departure,
        arrival,
        departure_start_s: parse_epoch(&payload.departure_start)?,
        departure_end_s: parse_epoch(&payload.departure_end)?,
        arrival_start_s: parse_epoch(&payload.arrival_start)?,
        arrival_end_s: parse_epoch(&payload.arrival_end)?,
        grid: (rows.min(MAX_AXIS_POINTS), cols.min(MAX_AXIS_POINTS)),
    };

    let evaluator = PorkchopEvaluator::new(&request)?;
    let deadline = Instant::now() + Duration::from_secs_f64(config.deadline_s);

    let mut evaluated = Vec::with_capacity(evaluator.rows());
    let mut partial = false;
    for i in 0..evaluator.rows() {
        if cancelled() {
            debug!(completed = i, "porkchop evaluation cancelled");
            return Err(RequestError::Protocol(
                "session closed during evaluation".to_string(),
            ));
        }
        if Instant::now() >= deadline {
            warn!(
                completed = i,
                rows = evaluator.rows(),
                "porkchop deadline expired; returning partial grid"
            );
            partial = true;
            break;
        }
        evaluated.push(evaluator.evaluate_row(i));
        tokio::task::yield_now().await;
    }

    let grid = evaluator.finish(evaluated, partial)?;
    debug!(
        departure = %departure,
        arrival = %arrival,
        rows,
        cols,
        partial = grid.partial,
        "porkchop grid evaluated"
    );
    Ok(porkchop_payload(grid))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_request_resolves_bodies_and_dates() {
        let payload = TransferRequestPayload {
            departure: "earth".into(),
            arrival: "mars".into(),
            departure_date: "2026-11-01".into(),
            arrival_date: "2027-08-01".into(),
        };
        let transfer = resolve_transfer(&payload).expect("transfer");
        assert_eq!(transfer.departure, Body::Earth);
        assert_eq!(transfer.arrival, Body::Mars);
        assert!(transfer.tof_days() > 200.0);
    }

    #[test]
    fn unknown_body_surfaces_the_contracted_kind() {
        let payload = TransferRequestPayload {
            departure: "vulcan".into(),
            arrival: "mars".into(),
            departure_date: "2026-11-01".into(),
            arrival_date: "2027-08-01".into(),
        };
        let err = resolve_transfer(&payload).expect_err("unknown body");
        assert_eq!(err.kind(), "unknown_body");
    }

    #[tokio::test]
    async fn expired_deadline_yields_a_partial_grid() {
        let payload = PorkchopRequestPayload {
            departure: "earth".into(),
            arrival: "mars".into(),
            departure_start: "2026-04-01".into(),
            departure_end: "2026-12-01".into(),
            arrival_start: "2026-10-01".into(),
            arrival_end: "2028-01-01".into(),
            grid: Some([24, 24]),
        };
        let config = PlannerConfig {
            deadline_s: 1e-9,
            default_grid: 40,
        };
        let response = run_porkchop(&payload, &config, || false)
            .await
            .expect("partial grid");
        assert!(response.partial);
        assert_eq!(response.c3.len(), 24);
        assert!(response.c3.iter().all(|row| row.iter().all(Option::is_none)));
    }
}
