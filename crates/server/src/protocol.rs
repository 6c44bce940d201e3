//! The newline-delimited JSON protocol: inbound commands and requests,
//! outbound snapshots, responses, and structured errors.
//!
//! Times cross this boundary as ISO-8601 UTC strings; everything behind it
//! is seconds since epoch.

use std::collections::BTreeMap;

use orbit_core::time::{self, TimeError};
use orbit_core::units::m_to_au;
use orbit_core::vector::Vector3;
use orbit_ephemeris::{Body, EphemerisError};
use orbit_impulsive::LambertError;
use orbit_sim::{Engine, Mission, MissionStatus, SimError};
use orbit_transfer::{PlannerError, PorkchopGrid, Transfer};
use serde::{Deserialize, Serialize};

/// Inbound message, tagged by `kind`.
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClientMessage {
    Control {
        #[serde(flatten)]
        action: ControlAction,
    },
    Focus {
        body: String,
        #[serde(default)]
        id: Option<String>,
    },
    Subscribe,
    Unsubscribe,
    Porkchop {
        #[serde(default)]
        id: Option<String>,
        #[serde(flatten)]
        request: PorkchopRequestPayload,
    },
    Transfer {
        #[serde(default)]
        id: Option<String>,
        #[serde(flatten)]
        request: TransferRequestPayload,
    },
    Launch {
        #[serde(default)]
        id: Option<String>,
        #[serde(flatten)]
        request: LaunchRequestPayload,
    },
}

/// Control actions, tagged by `action`.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ControlAction {
    Play,
    Pause,
    SetSpeed { speed: f64 },
}

/// Porkchop request over two date windows.
#[derive(Debug, Deserialize)]
pub struct PorkchopRequestPayload {
    pub departure: String,
    pub arrival: String,
    pub departure_start: String,
    pub departure_end: String,
    pub arrival_start: String,
    pub arrival_end: String,
    /// Grid shape [departure points, arrival points]; defaults from config.
    #[serde(default)]
    pub grid: Option<[usize; 2]>,
}

/// Single-transfer request.
#[derive(Debug, Clone, Deserialize)]
pub struct TransferRequestPayload {
    pub departure: String,
    pub arrival: String,
    pub departure_date: String,
    pub arrival_date: String,
}

/// Launch accepts a previously returned transfer or an inline request.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum LaunchRequestPayload {
    Precomputed { transfer: TransferResponsePayload },
    Inline(TransferRequestPayload),
}

/// Outbound message, tagged by `type`.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Snapshot(StateSnapshot),
    Response {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        result: ResponsePayload,
    },
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        error: &'static str,
        message: String,
    },
}

/// One-shot request results.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ResponsePayload {
    BodyInfo(BodyInfoPayload),
    Porkchop(PorkchopResponsePayload),
    Transfer(TransferResponsePayload),
    Launch(MissionPayload),
}

/// Per-tick view of the simulation, identical for every observer.
#[derive(Debug, Serialize)]
pub struct StateSnapshot {
    /// Simulation time (s since epoch).
    pub sim_time: f64,
    /// Wall-clock instant of the tick (ISO-8601).
    pub real_time: String,
    pub time_scale: f64,
    pub is_playing: bool,
    pub bodies: BTreeMap<String, SnapshotBody>,
    pub missions: Vec<MissionPayload>,
}

#[derive(Debug, Serialize)]
pub struct SnapshotBody {
    pub name: String,
    pub position_au: [f64; 3],
    pub velocity_ms: [f64; 3],
    pub mass_kg: f64,
    pub radius_m: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semi_major_axis_m: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eccentricity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orbital_period_days: Option<f64>,
}

/// Body catalog attributes plus the current state, answering a focus
/// request.
#[derive(Debug, Serialize)]
pub struct BodyInfoPayload {
    pub body: String,
    pub name: String,
    pub mu_m3_s2: f64,
    pub radius_m: f64,
    pub mass_kg: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semi_major_axis_m: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eccentricity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inclination_rad: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orbital_period_days: Option<f64>,
    pub position_au: [f64; 3],
    pub velocity_ms: [f64; 3],
    /// Simulation time the state was sampled at (s since epoch).
    pub sim_time: f64,
}

#[derive(Debug, Serialize)]
pub struct PorkchopResponsePayload {
    pub departure_dates: Vec<String>,
    pub arrival_dates: Vec<String>,
    pub c3: Vec<Vec<Option<f64>>>,
    pub delta_v: Vec<Vec<Option<f64>>>,
    pub time_of_flight: Vec<Vec<Option<f64>>>,
    pub partial: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferResponsePayload {
    pub departure: String,
    pub arrival: String,
    /// Characteristic energy (km²/s²).
    pub c3: f64,
    /// Impulsive free-flight total (km/s).
    pub delta_v: f64,
    /// Time of flight (days).
    pub time_of_flight: f64,
    pub departure_date: String,
    pub arrival_date: String,
    #[serde(default)]
    pub trajectory: Vec<TrajectoryPointPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrajectoryPointPayload {
    /// ISO-8601 instant of the sample.
    pub t: String,
    pub position_au: [f64; 3],
}

/// Wire view of a mission roster entry.
#[derive(Debug, Clone, Serialize)]
pub struct MissionPayload {
    pub id: String,
    pub departure: String,
    pub arrival: String,
    pub status: MissionStatus,
    pub progress: f64,
    /// Impulsive free-flight total (km/s).
    pub delta_v: f64,
    pub departure_date: String,
    pub arrival_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_position_au: Option<[f64; 3]>,
    pub trajectory: Vec<TrajectoryPointPayload>,
}

/// Failures answered to a single request; the stream is never interrupted.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error(transparent)]
    Planner(#[from] PlannerError),
    #[error(transparent)]
    Ephemeris(#[from] EphemerisError),
    #[error(transparent)]
    Sim(#[from] SimError),
    #[error("malformed timestamp: {0}")]
    Time(#[from] TimeError),
    #[error("malformed command: {0}")]
    Protocol(String),
}

impl RequestError {
    /// Stable error kind for the wire, one of the contracted set.
    pub fn kind(&self) -> &'static str {
        match self {
            RequestError::Planner(err) => planner_kind(err),
            RequestError::Ephemeris(err) => ephemeris_kind(err),
            RequestError::Sim(SimError::InvalidSpeed(_)) => "invalid_speed",
            RequestError::Sim(SimError::Stopped) => "protocol_error",
            RequestError::Time(_) | RequestError::Protocol(_) => "protocol_error",
        }
    }

    /// Whether the offending session must be closed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RequestError::Time(_) | RequestError::Protocol(_))
    }
}

fn planner_kind(err: &PlannerError) -> &'static str {
    match err {
        PlannerError::Ephemeris(inner) => ephemeris_kind(inner),
        PlannerError::Lambert(inner) => lambert_kind(inner),
        PlannerError::InvalidTimeOfFlight { .. } | PlannerError::InvalidWindow => {
            "invalid_time_of_flight"
        }
        PlannerError::NoFeasibleTransfers => "no_feasible_transfers",
    }
}

fn ephemeris_kind(err: &EphemerisError) -> &'static str {
    match err {
        EphemerisError::UnknownBody(_) => "unknown_body",
        EphemerisError::ConvergenceFailure { .. } => "convergence_failure",
    }
}

fn lambert_kind(err: &LambertError) -> &'static str {
    match err {
        LambertError::InvalidTimeOfFlight(_) => "invalid_time_of_flight",
        LambertError::DegenerateGeometry(_) => "degenerate_geometry",
        LambertError::ConvergenceFailure => "convergence_failure",
        LambertError::UnsupportedRevolutions { .. } => "unsupported_revolutions",
    }
}

/// ISO rendering with a plain-seconds fallback for out-of-range instants.
pub fn iso_or_seconds(t_s: f64) -> String {
    time::format_epoch(t_s).unwrap_or_else(|_| format!("{t_s:.0}s"))
}

fn position_au(v: &Vector3) -> [f64; 3] {
    [m_to_au(v[0]), m_to_au(v[1]), m_to_au(v[2])]
}

/// Build the per-tick snapshot from the engine.
pub fn build_snapshot(engine: &Engine) -> StateSnapshot {
    let clock = engine.clock();
    let bodies = engine
        .body_states()
        .iter()
        .map(|state| {
            let data = state.body.data();
            let elements = state.body.elements();
            (
                state.body.id().to_string(),
                SnapshotBody {
                    name: data.name.to_string(),
                    position_au: position_au(&state.position_m),
                    velocity_ms: state.velocity_m_s,
                    mass_kg: data.mass_kg,
                    radius_m: data.radius_m,
                    semi_major_axis_m: elements.map(|el| el.a_m),
                    eccentricity: elements.map(|el| el.e),
                    orbital_period_days: elements.map(|el| el.period_days()),
                },
            )
        })
        .collect();
    let missions = engine.missions().iter().map(mission_payload).collect();

    StateSnapshot {
        sim_time: clock.sim_time_s,
        real_time: time::now_iso(),
        time_scale: clock.time_scale,
        is_playing: clock.is_playing(),
        bodies,
        missions,
    }
}

/// Wire view of one mission.
pub fn mission_payload(mission: &Mission) -> MissionPayload {
    let transfer = &mission.transfer;
    MissionPayload {
        id: mission.id.clone(),
        departure: transfer.departure.id().to_string(),
        arrival: transfer.arrival.id().to_string(),
        status: mission.status,
        progress: mission.progress,
        delta_v: transfer.delta_v_km_s,
        departure_date: iso_or_seconds(transfer.t_dep_s),
        arrival_date: iso_or_seconds(transfer.t_arr_s),
        current_position_au: mission.current_position_m.as_ref().map(position_au),
        trajectory: trajectory_payload(transfer),
    }
}

/// Wire view of a planned transfer.
pub fn transfer_payload(transfer: &Transfer) -> TransferResponsePayload {
    TransferResponsePayload {
        departure: transfer.departure.id().to_string(),
        arrival: transfer.arrival.id().to_string(),
        c3: transfer.c3_km2_s2,
        delta_v: transfer.delta_v_km_s,
        time_of_flight: transfer.tof_days(),
        departure_date: iso_or_seconds(transfer.t_dep_s),
        arrival_date: iso_or_seconds(transfer.t_arr_s),
        trajectory: trajectory_payload(transfer),
    }
}

fn trajectory_payload(transfer: &Transfer) -> Vec<TrajectoryPointPayload> {
    transfer
        .trajectory
        .iter()
        .map(|sample| TrajectoryPointPayload {
            t: iso_or_seconds(sample.t_s),
            position_au: position_au(&sample.position_m),
        })
        .collect()
}

/// Wire view of a porkchop grid.
pub fn porkchop_payload(grid: PorkchopGrid) -> PorkchopResponsePayload {
    PorkchopResponsePayload {
        departure_dates: grid.departure_times_s.iter().copied().map(iso_or_seconds).collect(),
        arrival_dates: grid.arrival_times_s.iter().copied().map(iso_or_seconds).collect(),
        c3: grid.c3_km2_s2,
        delta_v: grid.delta_v_km_s,
        time_of_flight: grid.tof_days,
        partial: grid.partial,
    }
}

/// Answer a focus request from the engine's current state.
pub fn body_info(engine: &Engine, body: Body) -> BodyInfoPayload {
    let data = body.data();
    let elements = body.elements();
    let state = engine.state_of(body);
    let (position, velocity) = state
        .map(|s| (s.position_m, s.velocity_m_s))
        .unwrap_or(([0.0; 3], [0.0; 3]));

    BodyInfoPayload {
        body: body.id().to_string(),
        name: data.name.to_string(),
        mu_m3_s2: data.mu_m3_s2,
        radius_m: data.radius_m,
        mass_kg: data.mass_kg,
        semi_major_axis_m: elements.map(|el| el.a_m),
        eccentricity: elements.map(|el| el.e),
        inclination_rad: elements.map(|el| el.i_rad),
        orbital_period_days: elements.map(|el| el.period_days()),
        position_au: position_au(&position),
        velocity_ms: velocity,
        sim_time: engine.clock().sim_time_s,
    }
}

/// Serialize an outbound message to one protocol line.
pub fn encode(message: &ServerMessage) -> String {
    serde_json::to_string(message).unwrap_or_else(|err| {
        format!(
            r#"{{"type":"error","error":"protocol_error","message":"encode failure: {err}"}}"#
        )
    })
}
