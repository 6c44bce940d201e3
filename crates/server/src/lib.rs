//! The session/stream server: accepts observer connections over TCP,
//! fans out per-tick state snapshots, routes control commands to the
//! simulation, and serves one-shot planner queries.
//!
//! Runs on a current-thread tokio runtime: one tick task exclusively owns
//! the engine, sessions are independent tasks, and every cross-task edge is
//! a bounded channel. Slow observers lose snapshots, never simulation time.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use orbit_config::ServerConfig;
use orbit_journal::{JournalBatcher, JournalError, JournalRecord};
use orbit_sim::Engine;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

pub mod planner;
pub mod protocol;
pub mod session;
pub mod tick;

use tick::{TickCommand, TickTask};

/// Fatal server errors; per-session and per-request failures never reach
/// this type.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("journal setup failed: {0}")]
    Journal(#[from] JournalError),
}

/// Shared handles a session needs to talk to the rest of the server.
#[derive(Clone)]
pub struct SessionContext {
    pub commands: mpsc::Sender<TickCommand>,
    pub snapshots: broadcast::Sender<Arc<String>>,
    pub planner: orbit_config::PlannerConfig,
}

/// A bound listener, ready to serve.
pub struct Server {
    listener: TcpListener,
    config: ServerConfig,
}

/// Bind the listen socket for the configured port.
pub async fn bind(config: ServerConfig) -> Result<Server, ServerError> {
    let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
    Ok(Server { listener, config })
}

impl Server {
    /// The bound address (useful when the configured port is 0).
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve until the shutdown future resolves, then drain: stop the tick
    /// loop, flush the journal's final partial batch, and cancel sessions.
    pub async fn serve(self, shutdown: impl Future<Output = ()>) -> Result<(), ServerError> {
        let Server { listener, config } = self;
        info!(addr = %listener.local_addr()?, tick_hz = config.tick_hz, "orbit engine listening");

        let (command_tx, command_rx) = mpsc::channel(config.command_queue);
        let (snapshot_tx, _) = broadcast::channel(config.snapshot_queue);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let (journal_tx, journal_task) = if config.journal.enabled {
            let batcher = JournalBatcher::create(&config.journal.dir, config.journal.batch_size)?;
            let (tx, rx) = broadcast::channel::<JournalRecord>(config.journal.queue);
            (Some(tx), Some(tokio::spawn(journal_loop(batcher, rx))))
        } else {
            (None, None)
        };

        let engine = Engine::new(orbit_core::time::now_seconds());
        let tick_task = tokio::spawn(
            TickTask {
                engine,
                commands: command_rx,
                snapshots: snapshot_tx.clone(),
                journal: journal_tx,
                period: Duration::from_secs_f64(1.0 / config.tick_hz),
                shutdown: shutdown_rx,
            }
            .run(),
        );

        let context = SessionContext {
            commands: command_tx,
            snapshots: snapshot_tx,
            planner: config.planner.clone(),
        };

        let mut sessions = JoinSet::new();
        let mut next_session = 1u64;

        let mut shutdown = std::pin::pin!(shutdown);
        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((socket, _)) => {
                        sessions.spawn(session::run(socket, next_session, context.clone()));
                        next_session += 1;
                    }
                    Err(err) => warn!(%err, "accept failed"),
                },
                _ = &mut shutdown => break,
            }
        }

        info!("shutting down");
        drop(listener);
        drop(context);
        let _ = shutdown_tx.send(true);
        // The tick task drains the command queue, stops the engine, and
        // drops the journal sender, which lets the writer flush and exit.
        let _ = tick_task.await;
        if let Some(task) = journal_task {
            let _ = task.await;
        }
        sessions.abort_all();
        while sessions.join_next().await.is_some() {}
        Ok(())
    }
}

/// Bind and serve until ctrl-c.
pub async fn run(config: ServerConfig) -> Result<(), ServerError> {
    let server = bind(config).await?;
    server
        .serve(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
}

/// The journal writer: drains the record queue, batches, and writes files
/// on the blocking pool so the scheduler thread never waits on disk.
async fn journal_loop(
    mut batcher: JournalBatcher,
    mut records: broadcast::Receiver<JournalRecord>,
) {
    let mut dropped: u64 = 0;
    let mut io_errors: u64 = 0;

    loop {
        match records.recv().await {
            Ok(record) => {
                if let Some(batch) = batcher.push(record) {
                    write_batch(&batcher, batch, &mut io_errors).await;
                }
            }
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                dropped += missed;
                warn!(missed, "journal queue overflowed; oldest records dropped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }

    if let Some(batch) = batcher.take_partial() {
        write_batch(&batcher, batch, &mut io_errors).await;
    }
    info!(dropped, io_errors, "journal writer stopped");
}

async fn write_batch(
    batcher: &JournalBatcher,
    batch: orbit_journal::JournalBatch,
    io_errors: &mut u64,
) {
    let dir = batcher.dir().to_path_buf();
    let records = batch.records.len();
    match tokio::task::spawn_blocking(move || batch.write(&dir)).await {
        Ok(Ok(path)) => debug!(path = %path.display(), records, "journal batch flushed"),
        Ok(Err(err)) => {
            *io_errors += 1;
            warn!(%err, "journal flush failed");
        }
        Err(err) => {
            *io_errors += 1;
            warn!(%err, "journal flush task failed");
        }
    }
}
