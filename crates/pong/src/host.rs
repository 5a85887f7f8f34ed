//! The server side of [`GameHost`]: clock, outbound queues and nicknames.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use pong_game::{GameHost, Timestamp};
use pong_protocol::{GameId, Packet, PlayerId};
use pong_session::{SessionConfig, SessionManager};
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Connects games to the rest of the server.
///
/// Games call into the host while holding their own lock, so every method
/// here only takes short synchronous locks and never awaits.
pub struct ServerHost {
    epoch: Instant,
    sessions: Mutex<SessionManager>,
    outbound: Mutex<HashMap<PlayerId, mpsc::UnboundedSender<Packet>>>,
    ended: mpsc::UnboundedSender<GameId>,
}

impl ServerHost {
    /// Creates a host whose clock starts now. Ended games are reported
    /// on `ended`.
    pub fn new(config: SessionConfig, ended: mpsc::UnboundedSender<GameId>) -> Self {
        Self {
            epoch: Instant::now(),
            sessions: Mutex::new(SessionManager::new(config)),
            outbound: Mutex::new(HashMap::new()),
            ended,
        }
    }

    /// Opens the outbound queue for a player and returns its receiving end.
    ///
    /// Registering a player twice replaces the old queue, which closes it.
    pub fn register(&self, player_id: PlayerId) -> mpsc::UnboundedReceiver<Packet> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.outbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(player_id, tx);
        rx
    }

    /// Closes a player's outbound queue. Packets already queued are still
    /// delivered by the writer.
    pub fn unregister(&self, player_id: PlayerId) {
        self.outbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&player_id);
    }

    /// Runs `f` with the session table locked.
    pub fn with_sessions<R>(&self, f: impl FnOnce(&mut SessionManager) -> R) -> R {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut sessions)
    }
}

impl GameHost for ServerHost {
    fn now(&self) -> Timestamp {
        self.epoch.elapsed().as_millis() as Timestamp
    }

    fn send(&self, player_id: PlayerId, packet: Packet) {
        let outbound = self.outbound.lock().unwrap_or_else(PoisonError::into_inner);
        match outbound.get(&player_id) {
            Some(tx) => {
                if tx.send(packet).is_err() {
                    tracing::debug!(%player_id, "outbound queue closed, packet dropped");
                }
            }
            None => tracing::debug!(%player_id, "no outbound queue, packet dropped"),
        }
    }

    fn nickname(&self, player_id: PlayerId) -> String {
        self.with_sessions(|sessions| {
            sessions
                .nickname(&player_id)
                .map_or_else(|| player_id.to_string(), str::to_string)
        })
    }

    fn game_ended(&self, game_id: GameId) {
        if self.ended.send(game_id).is_err() {
            tracing::debug!(%game_id, "reaper gone, end of game not reported");
        }
    }
}
