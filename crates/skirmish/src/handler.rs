//! Per-connection handler: join, handshake, and input routing.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Optionally receive `JOIN` (name, id and token to resume) within the
//!      join timeout
//!   2. Claim a player id and queue the join for the simulation
//!   3. Queue the handshake frames, then attach the outbox for broadcasts
//!   4. Loop: receive `INPUT` lines → queue them for the simulation
//!   5. On EOF, a read error, or a writer that gave up, the session becomes
//!      a ghost
//!
//! All writes to the socket happen in one writer task per connection, fed
//! by the outbox. The handler and the simulation driver only queue frames.

use std::sync::Arc;
use std::time::Duration;

use skirmish_protocol::{
    parse_client_line, ClientMessage, Input, PlayerId, ResumeToken, ServerMessage,
    PROTOCOL_VERSION,
};
use skirmish_session::{outbox, Claim, Outbound, OutboxReceiver};
use skirmish_sim::{spawn_point, SimEvent};
use skirmish_transport::{Connection, LineConnection};
use tracing::{debug, info, trace, warn};

use crate::server::ServerState;
use crate::SkirmishError;

/// What the first line of a connection asked for.
#[derive(Debug, Default)]
struct JoinRequest {
    name: Option<String>,
    resume: Option<(PlayerId, ResumeToken)>,
    /// An `INPUT` line that arrived before any `JOIN`.
    early_input: Option<Input>,
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(
    conn: LineConnection,
    state: Arc<ServerState>,
) -> Result<(), SkirmishError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    debug!(%conn_id, peer = %conn.peer_addr(), "handling new connection");

    // --- Step 1: optional JOIN ---
    let Some(request) = read_join(&conn, &state).await? else {
        debug!(%conn_id, "connection closed before handshake");
        return Ok(());
    };

    // --- Steps 2 and 3: claim, queue handshake, attach ---
    let (outbox, frames) = outbox();
    let claim = {
        let mut registry = state.registry.lock().await;
        let claim = registry.claim(request.resume, conn_id, request.name, &state.allocator);

        let spawn = spawn_point(
            state.grid.as_ref(),
            state.seed,
            claim.player_id,
            state.spawn_min_distance,
        );
        state
            .events
            .send(SimEvent::Join {
                player_id: claim.player_id,
                name: claim.name.clone(),
                spawn,
                token: claim.token,
            })
            .map_err(|_| SkirmishError::ShuttingDown)?;

        // Queued before the outbox is attached, so no snapshot can get
        // ahead of READY.
        for frame in handshake_frames(&state, &claim) {
            let _ = outbox.try_send(Outbound::Text(frame));
        }
        registry.attach(claim.player_id, conn_id, outbox)?;
        claim
    };
    let player_id = claim.player_id;
    info!(%conn_id, %player_id, name = %claim.name, resumed = claim.resumed, "player joined");

    let mut writer = tokio::spawn(write_loop(
        Arc::clone(&conn),
        frames,
        player_id,
        state.write_timeout,
    ));

    // --- Step 4: input loop ---
    if let Some(input) = request.early_input {
        let _ = state.events.send(SimEvent::Input { player_id, input });
    }
    let result = tokio::select! {
        result = read_loop(&conn, &state, player_id) => result,
        _ = &mut writer => {
            debug!(%player_id, "writer finished, dropping connection");
            Ok(())
        }
    };

    // --- Step 5: ghost ---
    if let Err(e) = state.registry.lock().await.disconnect(player_id, conn_id) {
        debug!(%player_id, error = %e, "disconnect failed");
    }
    result
}

/// Waits up to the join timeout for the first line.
///
/// Returns `None` if the peer hung up before sending anything. Silence
/// past the timeout is an anonymous join.
async fn read_join(
    conn: &LineConnection,
    state: &ServerState,
) -> Result<Option<JoinRequest>, SkirmishError> {
    let line = match tokio::time::timeout(state.join_timeout, conn.recv()).await {
        Ok(Ok(Some(line))) => line,
        Ok(Ok(None)) => return Ok(None),
        Ok(Err(e)) => return Err(SkirmishError::Transport(e)),
        Err(_) => {
            trace!(conn_id = %conn.id(), "no JOIN line, joining anonymously");
            return Ok(Some(JoinRequest::default()));
        }
    };

    let request = match parse_client_line(&line) {
        Some(ClientMessage::Join {
            name,
            resume,
            token,
        }) => JoinRequest {
            name,
            resume: resume.zip(token),
            early_input: None,
        },
        Some(ClientMessage::Input(input)) => JoinRequest {
            early_input: Some(input),
            ..JoinRequest::default()
        },
        None => {
            debug!(conn_id = %conn.id(), "ignoring unrecognised first line");
            JoinRequest::default()
        }
    };
    Ok(Some(request))
}

/// The seven handshake frames, in wire order.
fn handshake_frames(state: &ServerState, claim: &Claim) -> [Arc<str>; 7] {
    [
        ServerMessage::Hello {
            protocol: PROTOCOL_VERSION,
        }
        .to_string()
        .into(),
        ServerMessage::Seed(state.seed).to_string().into(),
        ServerMessage::TickRate(state.tick_rate).to_string().into(),
        Arc::clone(&state.map_block),
        ServerMessage::You {
            id: claim.player_id,
            token: Some(claim.token),
        }
        .to_string()
        .into(),
        ServerMessage::Ready.to_string().into(),
        ServerMessage::Welcome {
            name: claim.name.clone(),
        }
        .to_string()
        .into(),
    ]
}

/// Reads lines until the peer goes away, queueing every `INPUT`.
async fn read_loop(
    conn: &LineConnection,
    state: &ServerState,
    player_id: PlayerId,
) -> Result<(), SkirmishError> {
    loop {
        let line = match conn.recv().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                info!(%player_id, "connection closed by peer");
                return Ok(());
            }
            Err(e) => return Err(SkirmishError::Transport(e)),
        };

        match parse_client_line(&line) {
            Some(ClientMessage::Input(input)) => {
                if state
                    .events
                    .send(SimEvent::Input { player_id, input })
                    .is_err()
                {
                    debug!(%player_id, "simulation stopped, dropping input");
                    return Ok(());
                }
            }
            Some(ClientMessage::Join { .. }) => {
                debug!(%player_id, "ignoring JOIN after handshake");
            }
            None => trace!(%player_id, "ignoring unrecognised line"),
        }
    }
}

/// The single writer of one connection.
///
/// Ends when the outbox is dropped (the session became a ghost or fell too
/// far behind), when a close is requested, or after the first write that
/// fails or blocks past `write_timeout`. Frames queued after that are
/// discarded with the channel.
async fn write_loop(
    conn: Arc<LineConnection>,
    mut frames: OutboxReceiver,
    player_id: PlayerId,
    write_timeout: Duration,
) {
    while let Some(frame) = frames.recv().await {
        match frame {
            Outbound::Text(text) => match tokio::time::timeout(write_timeout, conn.send(&text)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    debug!(%player_id, error = %e, "write failed, dropping connection output");
                    break;
                }
                Err(_) => {
                    warn!(%player_id, timeout_ms = write_timeout.as_millis() as u64, "write stalled, dropping connection");
                    break;
                }
            },
            Outbound::Close => break,
        }
    }
    if let Err(e) = conn.close().await {
        trace!(%player_id, error = %e, "close failed");
    }
}
