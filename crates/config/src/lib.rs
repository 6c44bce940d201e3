//! Configuration models and loaders for the Orbit Engine server.
//!
//! Every field is defaulted so an empty file (or no file) yields a runnable
//! configuration; CLI flags override on top.

use std::fs::File;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    /// TCP port the stream server listens on.
    pub port: u16,
    /// Target tick cadence (Hz).
    pub tick_hz: f64,
    /// Bounded per-session snapshot queue; overflow drops oldest.
    pub snapshot_queue: usize,
    /// Bounded command queue into the tick task.
    pub command_queue: usize,
    pub journal: JournalConfig,
    pub planner: PlannerConfig,
}

/// Journal (C7) settings.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct JournalConfig {
    pub enabled: bool,
    pub dir: PathBuf,
    /// Records per journal file.
    pub batch_size: usize,
    /// Bounded record queue between the tick task and the writer.
    pub queue: usize,
}

/// Planner worker settings.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PlannerConfig {
    /// Wall-clock deadline for one grid evaluation (s); expiry yields a
    /// partial grid.
    pub deadline_s: f64,
    /// Grid shape used when a porkchop request omits one.
    pub default_grid: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8030,
            tick_hz: 20.0,
            snapshot_queue: 4,
            command_queue: 256,
            journal: JournalConfig::default(),
            planner: PlannerConfig::default(),
        }
    }
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: PathBuf::from("simulation_logs"),
            batch_size: 10_000,
            queue: 1_024,
        }
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            deadline_s: 30.0,
            default_grid: 40,
        }
    }
}

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Load a configuration file, dispatching on extension: `.toml` is parsed as
/// TOML, anything else as YAML.
pub fn load<P: AsRef<Path>>(path: P) -> Result<ServerConfig, ConfigError> {
    let path = path.as_ref();
    let config: ServerConfig = if path.extension().map(|ext| ext == "toml").unwrap_or(false) {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)?
    } else {
        serde_yaml::from_reader(File::open(path)?)?
    };
    config.validate()?;
    Ok(config)
}

impl ServerConfig {
    /// Reject configurations the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.tick_hz.is_finite() && self.tick_hz > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "tick_hz must be positive and finite, got {}",
                self.tick_hz
            )));
        }
        if self.snapshot_queue == 0 {
            return Err(ConfigError::Invalid(
                "snapshot_queue must be at least 1".to_string(),
            ));
        }
        if self.command_queue == 0 {
            return Err(ConfigError::Invalid(
                "command_queue must be at least 1".to_string(),
            ));
        }
        if self.journal.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "journal.batch_size must be at least 1".to_string(),
            ));
        }
        if self.journal.queue == 0 {
            return Err(ConfigError::Invalid(
                "journal.queue must be at least 1".to_string(),
            ));
        }
        if !(self.planner.deadline_s.is_finite() && self.planner.deadline_s > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "planner.deadline_s must be positive, got {}",
                self.planner.deadline_s
            )));
        }
        if self.planner.default_grid == 0 {
            return Err(ConfigError::Invalid(
                "planner.default_grid must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        ServerConfig::default().validate().expect("defaults validate");
    }

    #[test]
    fn yaml_overrides_merge_with_defaults() {
        let config: ServerConfig =
            serde_yaml::from_str("port: 9000\njournal:\n  enabled: false\n").expect("yaml");
        assert_eq!(config.port, 9000);
        assert!(!config.journal.enabled);
        assert_eq!(config.tick_hz, 20.0);
        assert_eq!(config.journal.batch_size, 10_000);
    }

    #[test]
    fn toml_parses_too() {
        let config: ServerConfig =
            toml::from_str("tick_hz = 50.0\n[planner]\ndeadline_s = 5.0\n").expect("toml");
        assert_eq!(config.tick_hz, 50.0);
        assert_eq!(config.planner.deadline_s, 5.0);
    }

    #[test]
    fn zero_tick_rate_is_invalid() {
        let mut config = ServerConfig::default();
        config.tick_hz = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
