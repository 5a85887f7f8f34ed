//! Session types: the data structures that represent a connected player.
//!
//! A "session" is the server's record of one connection. It tracks:
//! - WHO the player is (`PlayerId`, and the nickname once logged in)
//! - WHAT they are doing (anonymous, idle in the lobby, busy in a game)
//! - HOW LONG a silent connection may live in that state

use std::time::Duration;

use pong_protocol::PlayerId;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for session behavior.
///
/// Sensible defaults are provided; the server loads overrides from its
/// config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Longest accepted nickname, in characters.
    pub max_nickname_len: usize,

    /// Seconds a connection outside a game may stay silent.
    ///
    /// Default: 60 seconds.
    pub idle_timeout_secs: u64,

    /// Seconds a connection inside a game may stay silent.
    ///
    /// Players in a game stream position updates, so a long silence
    /// means the client is gone. Default: 10 seconds.
    pub busy_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_nickname_len: 16,
            idle_timeout_secs: 60,
            busy_timeout_secs: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// The current state of a player's session.
///
/// ```text
///   Anonymous ──(login)──→ Idle ──(join game)──→ Busy
///                           ↑                     │
///                           └────(game over)──────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Connected, but no nickname yet. Only `login` is accepted.
    Anonymous,

    /// Logged in and outside a game.
    Idle,

    /// Logged in and seated in a game.
    Busy,
}

impl SessionState {
    /// Returns `true` once the player has logged in.
    pub fn is_identified(self) -> bool {
        !matches!(self, Self::Anonymous)
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A single player's session on the server.
///
/// Created when a connection is accepted, removed when it closes.
#[derive(Debug, Clone)]
pub struct Session {
    /// Which player this session belongs to.
    pub player_id: PlayerId,

    /// The nickname, once the player has logged in.
    pub nickname: Option<String>,

    /// Current lifecycle state.
    pub state: SessionState,
}

impl Session {
    /// How long the connection may stay silent in its current state.
    pub fn inactive_timeout(&self, config: &SessionConfig) -> Duration {
        match self.state {
            SessionState::Busy => Duration::from_secs(config.busy_timeout_secs),
            SessionState::Anonymous | SessionState::Idle => {
                Duration::from_secs(config.idle_timeout_secs)
            }
        }
    }
}
