use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use orbit_engine::config::{self, ServerConfig};
use tracing::error;

/// Orbit Engine: heliocentric simulation and mission-planning server.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// TCP port to listen on.
    #[arg(long)]
    port: Option<u16>,

    /// Simulation tick cadence in Hz.
    #[arg(long)]
    tick_hz: Option<f64>,

    /// Directory for tick journal files.
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Disable the tick journal entirely.
    #[arg(long, default_value_t = false)]
    no_log: bool,

    /// Optional YAML or TOML configuration file; flags override it.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            error!(%err, "configuration error");
            return ExitCode::from(2);
        }
    };

    match serve(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "server terminated");
            ExitCode::FAILURE
        }
    }
}

fn build_config(cli: &Cli) -> anyhow::Result<ServerConfig> {
    let mut config = match &cli.config {
        Some(path) => config::load(path)?,
        None => ServerConfig::default(),
    };

    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(tick_hz) = cli.tick_hz {
        config.tick_hz = tick_hz;
    }
    if let Some(dir) = &cli.log_dir {
        config.journal.dir = dir.clone();
    }
    if cli.no_log {
        config.journal.enabled = false;
    }

    config.validate()?;
    Ok(config)
}

fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(orbit_engine::server::run(config))?;
    Ok(())
}
