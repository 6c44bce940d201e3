//! The tick task: sole owner of the simulation engine.
//!
//! Commands queued by sessions are drained at the start of each tick, the
//! engine steps by the measured wall delta, and the resulting snapshot is
//! serialized once and fanned out. Snapshots publish at the tick cadence
//! even while paused (idle heartbeats).

use std::sync::Arc;
use std::time::Duration;

use orbit_core::time::now_iso;
use orbit_ephemeris::Body;
use orbit_journal::JournalRecord;
use orbit_sim::{Engine, EngineCommand};
use orbit_transfer::Transfer;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{info, warn};

use crate::protocol::{
    BodyInfoPayload, MissionPayload, ServerMessage, body_info, build_snapshot, encode,
    mission_payload,
};

/// Commands multiplexed into the tick task.
pub enum TickCommand {
    Control(EngineCommand),
    Launch {
        transfer: Transfer,
        reply: oneshot::Sender<MissionPayload>,
    },
    BodyInfo {
        body: Body,
        reply: oneshot::Sender<BodyInfoPayload>,
    },
}

pub struct TickTask {
    pub engine: Engine,
    pub commands: mpsc::Receiver<TickCommand>,
    pub snapshots: broadcast::Sender<Arc<String>>,
    pub journal: Option<broadcast::Sender<JournalRecord>>,
    pub period: Duration,
    pub shutdown: watch::Receiver<bool>,
}

impl TickTask {
    pub async fn run(mut self) {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately; anchor the wall delta there.
        interval.tick().await;
        let mut last = Instant::now();

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = self.shutdown.changed() => break,
            }

            while let Ok(command) = self.commands.try_recv() {
                self.handle(command);
            }

            let now = Instant::now();
            let wall_dt = (now - last).as_secs_f64();
            last = now;

            self.engine.step(wall_dt);
            self.publish();
        }

        // Drain whatever arrived before the stop, then halt the engine.
        while let Ok(command) = self.commands.try_recv() {
            self.handle(command);
        }
        self.engine.shutdown();
        info!(ticks = self.engine.tick(), "tick loop stopped");
    }

    fn handle(&mut self, command: TickCommand) {
        match command {
            TickCommand::Control(engine_command) => {
                if let Err(err) = self.engine.apply(engine_command) {
                    // Sessions validate before queueing, so this is a race
                    // with shutdown at worst.
                    warn!(%err, "engine rejected a queued command");
                }
            }
            TickCommand::Launch { transfer, reply } => {
                let mission = self.engine.launch(transfer);
                info!(
                    mission = %mission.id,
                    departure = %mission.transfer.departure,
                    arrival = %mission.transfer.arrival,
                    "mission launched"
                );
                let _ = reply.send(mission_payload(mission));
            }
            TickCommand::BodyInfo { body, reply } => {
                let _ = reply.send(body_info(&self.engine, body));
            }
        }
    }

    fn publish(&self) {
        let snapshot = build_snapshot(&self.engine);
        let line = encode(&ServerMessage::Snapshot(snapshot));
        // Send fails only when no session is subscribed; that is idle, not
        // an error.
        let _ = self.snapshots.send(Arc::new(line));

        if let Some(journal) = &self.journal {
            let clock = self.engine.clock();
            let record = JournalRecord::from_states(
                self.engine.tick(),
                clock.sim_time_s,
                now_iso(),
                clock.time_scale,
                self.engine.body_states(),
            );
            let _ = journal.send(record);
        }
    }
}
