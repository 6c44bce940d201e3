//! Observer sessions: one reader task (commands and requests) and one
//! writer task (snapshot stream plus responses) per connection.
//!
//! The writer owns a bounded snapshot subscription: a session that cannot
//! keep up lags the broadcast and loses the oldest snapshots, counted per
//! session, while the tick task never waits on anyone.

use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use orbit_ephemeris::Body;
use orbit_sim::{EngineCommand, SimError};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::protocol::{
    ClientMessage, ControlAction, LaunchRequestPayload, RequestError, ResponsePayload,
    ServerMessage, TransferRequestPayload, encode,
};
use crate::tick::TickCommand;
use crate::{planner, SessionContext};

/// Run one session to completion. Returns when the peer disconnects, a
/// protocol error closes it, or the server shuts down.
pub async fn run(socket: TcpStream, session_id: u64, context: SessionContext) {
    let peer = socket
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    info!(session = session_id, peer = %peer, "session opened");

    let (read_half, write_half) = socket.into_split();
    let subscribed = Arc::new(AtomicBool::new(true));
    let dropped_snapshots = Arc::new(AtomicU64::new(0));
    let (response_tx, response_rx) = mpsc::channel::<String>(16);

    let writer = tokio::spawn(write_loop(
        write_half,
        context.snapshots.subscribe(),
        response_rx,
        Arc::clone(&subscribed),
        Arc::clone(&dropped_snapshots),
    ));

    read_loop(read_half, &context, &subscribed, &response_tx).await;

    // Closing the session cancels its streaming task immediately.
    writer.abort();
    info!(
        session = session_id,
        dropped_snapshots = dropped_snapshots.load(Ordering::Relaxed),
        "session closed"
    );
}

async fn read_loop(
    read_half: tokio::net::tcp::OwnedReadHalf,
    context: &SessionContext,
    subscribed: &AtomicBool,
    responses: &mpsc::Sender<String>,
) {
    let mut lines = BufReader::new(read_half).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) | Err(_) => return,
        };
        if line.trim().is_empty() {
            continue;
        }

        let message = match serde_json::from_str::<ClientMessage>(&line) {
            Ok(message) => message,
            Err(err) => {
                let err = RequestError::Protocol(err.to_string());
                let _ = send_error(responses, None, &err).await;
                return;
            }
        };

        match dispatch(message, context, subscribed, responses).await {
            Ok(()) => {}
            Err(SessionEnd) => return,
        }
    }
}

/// Marker for "stop reading; the session is over".
struct SessionEnd;

async fn dispatch(
    message: ClientMessage,
    context: &SessionContext,
    subscribed: &AtomicBool,
    responses: &mpsc::Sender<String>,
) -> Result<(), SessionEnd> {
    match message {
        ClientMessage::Subscribe => {
            subscribed.store(true, Ordering::Relaxed);
            Ok(())
        }
        ClientMessage::Unsubscribe => {
            subscribed.store(false, Ordering::Relaxed);
            Ok(())
        }
        ClientMessage::Control { action } => {
            let command = match action {
                ControlAction::Play => EngineCommand::Play,
                ControlAction::Pause => EngineCommand::Pause,
                ControlAction::SetSpeed { speed } => {
                    if !(speed.is_finite() && speed > 0.0) {
                        let err = RequestError::from(SimError::InvalidSpeed(speed));
                        return send_error(responses, None, &err).await;
                    }
                    EngineCommand::SetSpeed(speed)
                }
            };
            queue_command(context, TickCommand::Control(command)).await
        }
        ClientMessage::Focus { body, id } => {
            let body = match Body::from_str(&body) {
                Ok(body) => body,
                Err(err) => return send_error(responses, id, &err.into()).await,
            };
            queue_command(context, TickCommand::Control(EngineCommand::Focus(body))).await?;

            let (reply_tx, reply_rx) = oneshot::channel();
            queue_command(context, TickCommand::BodyInfo { body, reply: reply_tx }).await?;
            match reply_rx.await {
                Ok(payload) => {
                    send_response(responses, id, ResponsePayload::BodyInfo(payload)).await
                }
                Err(_) => Err(SessionEnd),
            }
        }
        ClientMessage::Transfer { id, request } => {
            match planner::resolve_transfer(&request) {
                Ok(transfer) => {
                    let payload = crate::protocol::transfer_payload(&transfer);
                    send_response(responses, id, ResponsePayload::Transfer(payload)).await
                }
                Err(err) => send_error(responses, id, &err).await,
            }
        }
        ClientMessage::Porkchop { id, request } => {
            let cancelled = || responses.is_closed();
            match planner::run_porkchop(&request, &context.planner, cancelled).await {
                Ok(payload) => {
                    send_response(responses, id, ResponsePayload::Porkchop(payload)).await
                }
                Err(err) => send_error(responses, id, &err).await,
            }
        }
        ClientMessage::Launch { id, request } => {
            let resolved = resolve_launch(&request);
            let transfer = match resolved {
                Ok(transfer) => transfer,
                Err(err) => return send_error(responses, id, &err).await,
            };

            let (reply_tx, reply_rx) = oneshot::channel();
            queue_command(
                context,
                TickCommand::Launch {
                    transfer,
                    reply: reply_tx,
                },
            )
            .await?;
            match reply_rx.await {
                Ok(mission) => {
                    send_response(responses, id, ResponsePayload::Launch(mission)).await
                }
                Err(_) => Err(SessionEnd),
            }
        }
    }
}

/// Resolve a launch request to a transfer through the planner. A
/// precomputed transfer is re-resolved from its identities and dates, which
/// reproduces it bit-for-bit.
fn resolve_launch(
    request: &LaunchRequestPayload,
) -> Result<orbit_transfer::Transfer, RequestError> {
    let inline;
    let payload: &TransferRequestPayload = match request {
        LaunchRequestPayload::Inline(payload) => payload,
        LaunchRequestPayload::Precomputed { transfer } => {
            inline = TransferRequestPayload {
                departure: transfer.departure.clone(),
                arrival: transfer.arrival.clone(),
                departure_date: transfer.departure_date.clone(),
                arrival_date: transfer.arrival_date.clone(),
            };
            &inline
        }
    };
    planner::resolve_transfer(payload)
}

async fn queue_command(
    context: &SessionContext,
    command: TickCommand,
) -> Result<(), SessionEnd> {
    if context.commands.send(command).await.is_err() {
        // Tick task is gone; the server is shutting down.
        debug!("command queue closed; ending session");
        return Err(SessionEnd);
    }
    Ok(())
}

async fn send_response(
    responses: &mpsc::Sender<String>,
    id: Option<String>,
    result: ResponsePayload,
) -> Result<(), SessionEnd> {
    let line = encode(&ServerMessage::Response { id, result });
    responses.send(line).await.map_err(|_| SessionEnd)
}

async fn send_error(
    responses: &mpsc::Sender<String>,
    id: Option<String>,
    err: &RequestError,
) -> Result<(), SessionEnd> {
    warn!(kind = err.kind(), %err, "request failed");
    let line = encode(&ServerMessage::Error {
        id,
        error: err.kind(),
        message: err.to_string(),
    });
    if responses.send(line).await.is_err() {
        return Err(SessionEnd);
    }
    if err.is_fatal() {
        return Err(SessionEnd);
    }
    Ok(())
}

async fn write_loop(
    mut socket: OwnedWriteHalf,
    mut snapshots: broadcast::Receiver<Arc<String>>,
    mut responses: mpsc::Receiver<String>,
    subscribed: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
) {
    loop {
        tokio::select! {
            snapshot = snapshots.recv() => match snapshot {
                Ok(line) => {
                    if subscribed.load(Ordering::Relaxed)
                        && write_line(&mut socket, &line).await.is_err()
                    {
                        return;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    dropped.fetch_add(missed, Ordering::Relaxed);
                }
                Err(broadcast::error::RecvError::Closed) => return,
            },
            response = responses.recv() => match response {
                Some(line) => {
                    if write_line(&mut socket, &line).await.is_err() {
                        return;
                    }
                }
                None => return,
            },
        }
    }
}

async fn write_line(socket: &mut OwnedWriteHalf, line: &str) -> std::io::Result<()> {
    socket.write_all(line.as_bytes()).await?;
    socket.write_all(b"\n").await
}
