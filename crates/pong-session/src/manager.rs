//! The session manager: tracks every connected player.
//!
//! It's responsible for:
//! - Creating a session when a connection is accepted
//! - Logging players in and keeping nicknames unique
//! - Tracking whether a player is idle or busy in a game
//! - Removing the session when the connection closes
//!
//! # Concurrency note
//!
//! `SessionManager` is NOT thread-safe by itself; it uses plain
//! `HashMap`s. The server wraps it in a mutex and never holds that lock
//! across an `.await`.

use std::collections::HashMap;

use pong_protocol::PlayerId;

use crate::{validate_nickname, Session, SessionConfig, SessionError, SessionState};

/// Manages all player sessions.
///
/// ## Lifecycle
///
/// ```text
/// create() ──→ login() ──→ set_busy(true) ⇄ set_busy(false) ──→ remove()
/// ```
pub struct SessionManager {
    /// All sessions, keyed by player ID.
    sessions: HashMap<PlayerId, Session>,

    /// Index from nickname to player, kept in sync with `sessions`.
    /// Makes the "nickname already taken" check O(1).
    nicknames: HashMap<String, PlayerId>,

    config: SessionConfig,
}

impl SessionManager {
    /// Creates a new, empty session manager with the given config.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            nicknames: HashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Creates an anonymous session for a freshly accepted connection.
    ///
    /// # Errors
    /// Returns [`SessionError::AlreadyConnected`] if the player already
    /// has a session.
    pub fn create(&mut self, player_id: PlayerId) -> Result<&Session, SessionError> {
        if self.sessions.contains_key(&player_id) {
            return Err(SessionError::AlreadyConnected(player_id));
        }

        let session = self.sessions.entry(player_id).or_insert(Session {
            player_id,
            nickname: None,
            state: SessionState::Anonymous,
        });
        tracing::debug!(%player_id, "session created");
        Ok(session)
    }

    /// Logs a player in under the given nickname.
    ///
    /// # Errors
    /// - [`SessionError::NotFound`]: no session for this player
    /// - [`SessionError::AlreadyLoggedIn`]: the player has a nickname
    /// - [`SessionError::InvalidNickname`]: the nickname breaks the rules
    /// - [`SessionError::NicknameTaken`]: another player uses it
    pub fn login(
        &mut self,
        player_id: PlayerId,
        nickname: &str,
    ) -> Result<&Session, SessionError> {
        let session = self
            .sessions
            .get(&player_id)
            .ok_or(SessionError::NotFound(player_id))?;
        if session.state.is_identified() {
            return Err(SessionError::AlreadyLoggedIn(player_id));
        }

        validate_nickname(nickname, self.config.max_nickname_len)?;
        if self.nicknames.contains_key(nickname) {
            return Err(SessionError::NicknameTaken(nickname.to_string()));
        }

        self.nicknames.insert(nickname.to_string(), player_id);
        let session = self
            .sessions
            .get_mut(&player_id)
            .ok_or(SessionError::NotFound(player_id))?;
        session.nickname = Some(nickname.to_string());
        session.state = SessionState::Idle;

        tracing::info!(%player_id, nickname, "player logged in");
        Ok(session)
    }

    /// Marks a logged-in player as busy (in a game) or idle.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] or [`SessionError::NotLoggedIn`].
    pub fn set_busy(&mut self, player_id: PlayerId, busy: bool) -> Result<(), SessionError> {
        let session = self
            .sessions
            .get_mut(&player_id)
            .ok_or(SessionError::NotFound(player_id))?;
        if !session.state.is_identified() {
            return Err(SessionError::NotLoggedIn(player_id));
        }
        session.state = if busy {
            SessionState::Busy
        } else {
            SessionState::Idle
        };
        Ok(())
    }

    /// Removes a session and frees its nickname.
    ///
    /// Returns the removed session, or `None` if there was none (so a
    /// second call is harmless).
    pub fn remove(&mut self, player_id: PlayerId) -> Option<Session> {
        let session = self.sessions.remove(&player_id)?;
        if let Some(nickname) = &session.nickname {
            self.nicknames.remove(nickname);
        }
        tracing::debug!(%player_id, "session removed");
        Some(session)
    }

    /// Looks up a session by player ID.
    pub fn get(&self, player_id: &PlayerId) -> Option<&Session> {
        self.sessions.get(player_id)
    }

    /// Returns the player's nickname, if they have logged in.
    pub fn nickname(&self, player_id: &PlayerId) -> Option<&str> {
        self.sessions.get(player_id)?.nickname.as_deref()
    }

    /// Finds the player using the given nickname.
    pub fn find(&self, nickname: &str) -> Option<PlayerId> {
        self.nicknames.get(nickname).copied()
    }

    /// Returns all sessions ordered by player ID.
    pub fn sessions(&self) -> Vec<&Session> {
        let mut sessions: Vec<&Session> = self.sessions.values().collect();
        sessions.sort_by_key(|s| s.player_id);
        sessions
    }

    /// Returns the number of sessions (any state).
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if there are no sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
