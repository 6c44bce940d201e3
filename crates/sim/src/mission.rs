//! Launched missions and their progression along precomputed transfer arcs.

use orbit_core::vector::Vector3;
use orbit_ephemeris::{MU_SUN_M3_S2, propagate_state};
use orbit_transfer::Transfer;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Lifecycle of a mission. `Failed` is entered when arc propagation errors;
/// `Completed` missions are never mutated again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissionStatus {
    Pending,
    Active,
    Completed,
    Failed,
}

/// A spacecraft flying a precomputed transfer arc.
#[derive(Debug, Clone)]
pub struct Mission {
    /// Monotonic identifier, e.g. `m-000001`.
    pub id: String,
    pub transfer: Transfer,
    pub status: MissionStatus,
    /// Fraction of the arc flown, in [0, 1].
    pub progress: f64,
    /// Current heliocentric position while active (m).
    pub current_position_m: Option<Vector3>,
}

impl Mission {
    /// Create a mission for a transfer; it activates immediately when the
    /// departure instant is not in the future.
    pub fn new(id: String, transfer: Transfer, sim_time_s: f64) -> Self {
        let status = if transfer.t_dep_s <= sim_time_s {
            MissionStatus::Active
        } else {
            MissionStatus::Pending
        };
        let mut mission = Self {
            id,
            transfer,
            status,
            progress: 0.0,
            current_position_m: None,
        };
        mission.update(sim_time_s);
        mission
    }

    /// Advance the mission to the given simulation time.
    ///
    /// Progress derives from sim_time alone, never from integrated deltas,
    /// so changing the time scale only changes wall-clock pacing.
    pub fn update(&mut self, sim_time_s: f64) {
        match self.status {
            MissionStatus::Completed | MissionStatus::Failed => return,
            MissionStatus::Pending => {
                if sim_time_s < self.transfer.t_dep_s {
                    return;
                }
                self.status = MissionStatus::Active;
            }
            MissionStatus::Active => {}
        }

        if sim_time_s >= self.transfer.t_arr_s {
            self.status = MissionStatus::Completed;
            self.progress = 1.0;
            self.current_position_m = Some(self.transfer.r2_m);
            return;
        }

        let elapsed = sim_time_s - self.transfer.t_dep_s;
        self.progress = (elapsed / self.transfer.tof_s).clamp(0.0, 1.0);
        match propagate_state(
            &self.transfer.r1_m,
            &self.transfer.v1_m_s,
            elapsed,
            MU_SUN_M3_S2,
        ) {
            Ok((position, _)) => self.current_position_m = Some(position),
            Err(err) => {
                warn!(mission = %self.id, %err, "mission arc propagation failed");
                self.status = MissionStatus::Failed;
            }
        }
    }
}
