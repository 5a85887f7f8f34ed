//! Per-connection handler: session setup, request routing and cleanup.
//!
//! Each accepted connection gets its own Tokio task running this handler,
//! plus a writer task that drains the player's outbound queue:
//!   1. Create an anonymous session and open the outbound queue
//!   2. Loop: receive frames → decode → parse → dispatch
//!   3. On exit: leave the current game, drop the session, close

use std::fmt::Display;
use std::sync::Arc;

use pong_game::{GameError, GameHost};
use pong_protocol::{Codec, Packet, PlayerId};
use pong_session::SessionError;
use pong_transport::{Connection, TcpConnection, TransportError};
use tokio::sync::{mpsc, oneshot};

use crate::request::Request;
use crate::server::ServerState;
use crate::PongError;

/// What the read loop does after a request.
enum Flow {
    Continue,
    Close,
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(
    conn: TcpConnection,
    state: Arc<ServerState>,
) -> Result<(), PongError> {
    let conn = Arc::new(conn);
    let player_id = PlayerId(conn.id().into_inner());
    let peer = conn.peer_addr();

    state
        .host
        .with_sessions(|sessions| sessions.create(player_id).map(|_| ()))?;
    let outbound = state.host.register(player_id);
    tracing::info!(%player_id, %peer, "player connected");

    // Dropped by the writer when it exits, for whatever reason.
    let (writer_alive, mut writer_gone) = oneshot::channel::<()>();
    let writer = tokio::spawn(write_packets(
        Arc::clone(&conn),
        Arc::clone(&state),
        player_id,
        outbound,
        writer_alive,
    ));

    let result = read_requests(&conn, &state, player_id, &mut writer_gone).await;

    let left = state.games.lock().await.player_leave(player_id).await;
    match left {
        Ok(players) => state.set_idle(&players),
        Err(GameError::NoGame(_)) => {}
        Err(e) => tracing::debug!(%player_id, error = %e, "leave on disconnect failed"),
    }
    state.host.with_sessions(|sessions| sessions.remove(player_id));
    state.host.unregister(player_id);

    if let Err(e) = writer.await {
        tracing::warn!(%player_id, error = %e, "writer task failed");
    }
    if let Err(e) = conn.close().await {
        tracing::debug!(%player_id, error = %e, "close failed");
    }

    tracing::info!(%player_id, "player disconnected");
    result
}

/// Reads and dispatches requests until the connection should close.
async fn read_requests(
    conn: &TcpConnection,
    state: &ServerState,
    player_id: PlayerId,
    writer_gone: &mut oneshot::Receiver<()>,
) -> Result<(), PongError> {
    let mut corrupted: u32 = 0;

    loop {
        let timeout = state
            .host
            .with_sessions(|sessions| {
                sessions
                    .get(&player_id)
                    .map(|session| session.inactive_timeout(sessions.config()))
            })
            .ok_or(SessionError::NotFound(player_id))?;

        let received = tokio::select! {
            _ = state.shutdown.wait() => {
                tracing::debug!(%player_id, "server shutting down");
                return Ok(());
            }
            _ = &mut *writer_gone => {
                tracing::debug!(%player_id, "writer stopped");
                return Ok(());
            }
            received = tokio::time::timeout(timeout, conn.recv()) => received,
        };

        let data = match received {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::debug!(%player_id, "connection closed by peer");
                return Ok(());
            }
            Ok(Err(TransportError::FrameTooLong(limit))) => {
                state.stats.record_dropped(limit);
                if too_many_corrupted(state, player_id, &mut corrupted) {
                    return Ok(());
                }
                continue;
            }
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                tracing::info!(
                    %player_id,
                    timeout_secs = timeout.as_secs(),
                    "connection inactive, closing"
                );
                return Ok(());
            }
        };

        let request = state
            .codec
            .decode(&data)
            .and_then(|packet| Request::parse(&packet).map(|request| (packet, request)));
        let request = match request {
            Ok((packet, request)) => {
                tracing::trace!(%player_id, %packet, "received");
                request
            }
            Err(e) => {
                state.stats.record_dropped(data.len());
                reply_error(state, player_id, &e);
                if too_many_corrupted(state, player_id, &mut corrupted) {
                    return Ok(());
                }
                continue;
            }
        };
        state.stats.record_received(data.len());

        match dispatch(state, player_id, request).await {
            Ok(Flow::Continue) => {}
            Ok(Flow::Close) => return Ok(()),
            Err(e) => reply_error(state, player_id, &e),
        }
    }
}

/// Counts a corrupted packet. Returns `true` once the limit is reached.
fn too_many_corrupted(state: &ServerState, player_id: PlayerId, corrupted: &mut u32) -> bool {
    *corrupted += 1;
    tracing::debug!(%player_id, corrupted = *corrupted, "corrupted packet");
    if *corrupted >= state.config.corrupted_packet_limit {
        tracing::warn!(%player_id, "too many corrupted packets, closing");
        return true;
    }
    false
}

/// Executes one request on behalf of a player.
async fn dispatch(
    state: &ServerState,
    player_id: PlayerId,
    request: Request,
) -> Result<Flow, PongError> {
    let identified = state
        .host
        .with_sessions(|sessions| sessions.get(&player_id).map(|s| s.state.is_identified()))
        .ok_or(SessionError::NotFound(player_id))?;
    if !identified && !request.allowed_anonymous() {
        return Err(SessionError::NotLoggedIn(player_id).into());
    }

    match request {
        Request::Login(nickname) => {
            state
                .host
                .with_sessions(|sessions| sessions.login(player_id, &nickname).map(|_| ()))?;
            state.host.send(player_id, Packet::new("logged_in").item(&nickname));
        }
        Request::JoinGame => {
            let game_id = state.games.lock().await.join_or_create(player_id).await?;
            state
                .host
                .with_sessions(|sessions| sessions.set_busy(player_id, true))?;
            tracing::debug!(%player_id, %game_id, "player seated");
        }
        Request::Ready => state.games.lock().await.player_ready(player_id).await?,
        Request::UpdateState(player_state) => {
            state
                .games
                .lock()
                .await
                .player_update(player_id, player_state)
                .await?
        }
        Request::Restart => state.games.lock().await.player_restart(player_id).await?,
        Request::LeaveGame => {
            let left = state.games.lock().await.player_leave(player_id).await;
            match left {
                Ok(players) => state.set_idle(&players),
                Err(e) => {
                    // Unmapped anyway.
                    state.set_idle(&[player_id]);
                    return Err(e.into());
                }
            }
        }
        Request::Ping => state.host.send(player_id, Packet::new("pong")),
        Request::Logout => {
            tracing::debug!(%player_id, "logout");
            return Ok(Flow::Close);
        }
    }
    Ok(Flow::Continue)
}

/// Sends an `error` packet to one player.
fn reply_error(state: &ServerState, player_id: PlayerId, error: &dyn Display) {
    let message = error.to_string().replace([';', '\r', '\n'], " ");
    tracing::debug!(%player_id, %message, "request rejected");
    state.host.send(player_id, Packet::new("error").item(message));
}

/// Drains a player's outbound queue onto the connection.
///
/// Stops when the queue closes, a send fails, or a send takes longer
/// than the configured timeout.
async fn write_packets(
    conn: Arc<TcpConnection>,
    state: Arc<ServerState>,
    player_id: PlayerId,
    mut outbound: mpsc::UnboundedReceiver<Packet>,
    _alive: oneshot::Sender<()>,
) {
    let send_timeout = state.config.send_timeout();

    while let Some(packet) = outbound.recv().await {
        let bytes = match state.codec.encode(&packet) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(%player_id, error = %e, "packet not encodable, dropped");
                continue;
            }
        };

        match tokio::time::timeout(send_timeout, conn.send(&bytes)).await {
            Ok(Ok(())) => state.stats.record_sent(bytes.len()),
            Ok(Err(e)) => {
                tracing::debug!(%player_id, error = %e, "send failed");
                break;
            }
            Err(_) => {
                tracing::warn!(%player_id, "send timed out");
                break;
            }
        }
    }
}
