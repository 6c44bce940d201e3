//! Batched journal of per-tick simulation state.
//!
//! Records accumulate in memory and are flushed every `batch_size` ticks to
//! a new sequentially numbered JSON file of the form `{metadata, data}`. The
//! batcher itself is synchronous; the server hands full batches to a
//! background task so the tick loop never touches the filesystem.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use orbit_core::time::EPOCH_ISO;
use orbit_core::units::m_to_au;
use orbit_ephemeris::BodyState;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Records per journal file.
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// Errors surfaced while writing journal files.
#[derive(Debug, Error)]
pub enum JournalError {
    #[error("journal I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("journal serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Per-body entry of a journal record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalBodyState {
    /// Heliocentric position (m).
    pub r_m: [f64; 3],
    /// Heliocentric position (AU).
    pub r_au: [f64; 3],
    /// Heliocentric velocity (m/s).
    pub v_ms: [f64; 3],
}

/// One tick of simulation state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalRecord {
    pub tick: u64,
    /// Simulation time (s since epoch).
    pub sim_time: f64,
    /// Wall-clock instant the tick ran (ISO-8601).
    pub wall_time: String,
    pub time_scale: f64,
    pub bodies: BTreeMap<String, JournalBodyState>,
}

impl JournalRecord {
    /// Build a record from the engine's per-tick body states.
    pub fn from_states(
        tick: u64,
        sim_time: f64,
        wall_time: String,
        time_scale: f64,
        states: &[BodyState],
    ) -> Self {
        let bodies = states
            .iter()
            .map(|state| {
                let r = state.position_m;
                (
                    state.body.id().to_string(),
                    JournalBodyState {
                        r_m: r,
                        r_au: [m_to_au(r[0]), m_to_au(r[1]), m_to_au(r[2])],
                        v_ms: state.velocity_m_s,
                    },
                )
            })
            .collect();
        Self {
            tick,
            sim_time,
            wall_time,
            time_scale,
            bodies,
        }
    }
}

/// Header of a journal file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalMetadata {
    pub total_timesteps: usize,
    /// Simulation time of the first record (s since epoch).
    pub start_time: f64,
    /// Simulation time of the last record (s since epoch).
    pub end_time: f64,
    /// ISO-8601 rendering of the epoch all times are relative to.
    pub epoch: String,
    pub file_number: u64,
}

/// On-disk layout of one journal file.
#[derive(Debug, Serialize, Deserialize)]
pub struct JournalFile {
    pub metadata: JournalMetadata,
    pub data: Vec<JournalRecord>,
}

/// A full (or final partial) batch ready to be written.
#[derive(Debug)]
pub struct JournalBatch {
    pub file_number: u64,
    pub records: Vec<JournalRecord>,
}

impl JournalBatch {
    /// File name for this batch within the journal directory.
    pub fn file_name(&self) -> String {
        format!("journal_{:05}.json", self.file_number)
    }

    /// Write the batch as `{metadata, data}` and return the path.
    pub fn write(self, dir: &Path) -> Result<PathBuf, JournalError> {
        let start_time = self.records.first().map(|r| r.sim_time).unwrap_or(0.0);
        let end_time = self.records.last().map(|r| r.sim_time).unwrap_or(start_time);
        let path = dir.join(self.file_name());
        let file = JournalFile {
            metadata: JournalMetadata {
                total_timesteps: self.records.len(),
                start_time,
                end_time,
                epoch: EPOCH_ISO.to_string(),
                file_number: self.file_number,
            },
            data: self.records,
        };
        let writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer(writer, &file)?;
        Ok(path)
    }
}

/// Accumulates records and emits numbered batches.
pub struct JournalBatcher {
    dir: PathBuf,
    batch_size: usize,
    pending: Vec<JournalRecord>,
    next_file: u64,
}

impl JournalBatcher {
    /// Create the journal directory if missing and start numbering at 1.
    pub fn create(dir: impl Into<PathBuf>, batch_size: usize) -> Result<Self, JournalError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            batch_size: batch_size.max(1),
            pending: Vec::new(),
            next_file: 1,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Append a record; returns a batch when the threshold is reached.
    pub fn push(&mut self, record: JournalRecord) -> Option<JournalBatch> {
        self.pending.push(record);
        if self.pending.len() >= self.batch_size {
            return self.take_batch();
        }
        None
    }

    /// Drain whatever is pending, if anything; used at shutdown.
    pub fn take_partial(&mut self) -> Option<JournalBatch> {
        if self.pending.is_empty() {
            return None;
        }
        self.take_batch()
    }

    fn take_batch(&mut self) -> Option<JournalBatch> {
        let file_number = self.next_file;
        self.next_file += 1;
        Some(JournalBatch {
            file_number,
            records: std::mem::take(&mut self.pending),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbit_ephemeris::{Body, propagate};

    fn record(tick: u64) -> JournalRecord {
        let states: Vec<BodyState> = Body::ALL
            .iter()
            .map(|&body| propagate(body, tick as f64 * 3_600.0).expect("state"))
            .collect();
        JournalRecord::from_states(
            tick,
            tick as f64 * 3_600.0,
            "2026-01-01T00:00:00Z".to_string(),
            1.0,
            &states,
        )
    }

    #[test]
    fn batches_emit_at_threshold_with_sequential_numbers() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut batcher = JournalBatcher::create(dir.path(), 3).expect("batcher");

        assert!(batcher.push(record(1)).is_none());
        assert!(batcher.push(record(2)).is_none());
        let first = batcher.push(record(3)).expect("first batch");
        assert_eq!(first.file_number, 1);
        assert_eq!(first.records.len(), 3);

        assert!(batcher.push(record(4)).is_none());
        let partial = batcher.take_partial().expect("final partial");
        assert_eq!(partial.file_number, 2);
        assert_eq!(partial.records.len(), 1);
        assert!(batcher.take_partial().is_none());
    }

    #[test]
    fn written_file_round_trips_with_metadata() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut batcher = JournalBatcher::create(dir.path(), 2).expect("batcher");
        batcher.push(record(10));
        let batch = batcher.push(record(11)).expect("batch");
        let path = batch.write(dir.path()).expect("write");
        assert!(path.ends_with("journal_00001.json"));

        let file: JournalFile =
            serde_json::from_reader(File::open(&path).expect("open")).expect("parse");
        assert_eq!(file.metadata.total_timesteps, 2);
        assert_eq!(file.metadata.file_number, 1);
        assert_eq!(file.metadata.epoch, EPOCH_ISO);
        assert!(file.metadata.end_time > file.metadata.start_time);
        let earth = &file.data[0].bodies["earth"];
        let r_au = (earth.r_au[0].powi(2) + earth.r_au[1].powi(2) + earth.r_au[2].powi(2)).sqrt();
        assert!((0.9..1.1).contains(&r_au), "earth at {r_au} AU");
    }

    #[test]
    fn missing_directory_is_created() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("logs/deep");
        let batcher = JournalBatcher::create(&nested, 5).expect("batcher");
        assert!(batcher.dir().is_dir());
    }
}
