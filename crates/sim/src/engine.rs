//! The simulation engine: exclusive owner of the clock, the per-tick body
//! states, and the mission roster.

use orbit_ephemeris::{Body, BodyState, propagate};
use orbit_transfer::Transfer;
use tracing::warn;

use crate::clock::{RunState, SimulationClock};
use crate::mission::Mission;
use crate::SimError;

/// Control commands, applied between ticks by the owning task.
#[derive(Debug, Clone)]
pub enum EngineCommand {
    Play,
    Pause,
    SetSpeed(f64),
    Focus(Body),
}

/// The simulation state machine. Starts paused at the given instant.
pub struct Engine {
    clock: SimulationClock,
    body_states: Vec<BodyState>,
    missions: Vec<Mission>,
    next_mission: u64,
    focused: Option<Body>,
    tick: u64,
}

impl Engine {
    pub fn new(start_time_s: f64) -> Self {
        let clock = SimulationClock::new(start_time_s);
        let body_states = compute_body_states(start_time_s, None);
        Self {
            clock,
            body_states,
            missions: Vec::new(),
            next_mission: 1,
            focused: None,
            tick: 0,
        }
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn body_states(&self) -> &[BodyState] {
        &self.body_states
    }

    pub fn state_of(&self, body: Body) -> Option<&BodyState> {
        self.body_states.iter().find(|state| state.body == body)
    }

    pub fn missions(&self) -> &[Mission] {
        &self.missions
    }

    pub fn focused(&self) -> Option<Body> {
        self.focused
    }

    /// Apply a control command. Commands are rejected once stopped.
    pub fn apply(&mut self, command: EngineCommand) -> Result<(), SimError> {
        if self.clock.state == RunState::Stopped {
            return Err(SimError::Stopped);
        }
        match command {
            EngineCommand::Play => self.clock.state = RunState::Playing,
            EngineCommand::Pause => self.clock.state = RunState::Paused,
            EngineCommand::SetSpeed(factor) => self.clock.set_speed(factor)?,
            EngineCommand::Focus(body) => self.focused = Some(body),
        }
        Ok(())
    }

    /// Add a mission for a resolved transfer and return the roster entry.
    pub fn launch(&mut self, transfer: Transfer) -> &Mission {
        let id = format!("m-{:06}", self.next_mission);
        self.next_mission += 1;
        let mission = Mission::new(id, transfer, self.clock.sim_time_s);
        self.missions.push(mission);
        self.missions.last().expect("mission was just pushed")
    }

    /// Run one tick: advance the clock by the wall delta, recompute body
    /// states, and progress the mission roster. Never fails; per-body and
    /// per-mission faults degrade locally.
    pub fn step(&mut self, wall_dt_s: f64) {
        self.clock.advance(wall_dt_s);
        let sim_time = self.clock.sim_time_s;
        self.body_states = compute_body_states(sim_time, Some(&self.body_states));
        for mission in &mut self.missions {
            mission.update(sim_time);
        }
        self.tick += 1;
    }

    /// Enter the terminal stopped state.
    pub fn shutdown(&mut self) {
        self.clock.state = RunState::Stopped;
    }
}

/// Propagate every catalog body, keeping the previous state on a solver
/// fault so one bad body cannot take down a tick.
fn compute_body_states(sim_time_s: f64, previous: Option<&[BodyState]>) -> Vec<BodyState> {
    Body::ALL
        .iter()
        .map(|&body| match propagate(body, sim_time_s) {
            Ok(state) => state,
            Err(err) => {
                warn!(%body, %err, "body propagation failed; keeping previous state");
                previous
                    .and_then(|states| states.iter().find(|s| s.body == body))
                    .copied()
                    .unwrap_or_else(|| BodyState::at_rest(body))
            }
        })
        .collect()
}
