//! Error types for the session layer.

use pong_protocol::PlayerId;

/// Errors that can occur during session management.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No session exists for the given player.
    #[error("session not found for player {0}")]
    NotFound(PlayerId),

    /// A session for this player already exists.
    #[error("player {0} already has an active session")]
    AlreadyConnected(PlayerId),

    /// The player tried to log in a second time.
    #[error("player {0} is already logged in")]
    AlreadyLoggedIn(PlayerId),

    /// The operation needs a logged-in player.
    #[error("player {0} is not logged in")]
    NotLoggedIn(PlayerId),

    /// The nickname breaks the nickname rules.
    #[error("invalid nickname: {0}")]
    InvalidNickname(String),

    /// Another player already uses this nickname.
    #[error("nickname {0} is already taken")]
    NicknameTaken(String),
}
