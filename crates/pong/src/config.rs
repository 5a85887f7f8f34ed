//! Server configuration.

use std::path::Path;
use std::time::Duration;

use pong_game::GameConfig;
use pong_session::SessionConfig;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::PongError;

/// Everything the server reads at startup.
///
/// Every field has a default, so a config file only needs the values it
/// changes:
///
/// ```json
/// { "bind_addr": "0.0.0.0:4000", "game": { "max_score": 5 } }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the listener binds to.
    pub bind_addr: String,

    /// Seconds between statistics log lines. Zero disables them.
    pub stats_period_secs: u64,

    /// How long a single outbound write may block before the connection
    /// is dropped.
    pub send_timeout_ms: u64,

    /// Undecodable packets tolerated per connection before it is closed.
    pub corrupted_packet_limit: u32,

    pub session: SessionConfig,
    pub game: GameConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:4000".to_string(),
            stats_period_secs: 60,
            send_timeout_ms: 1000,
            corrupted_packet_limit: 5,
            session: SessionConfig::default(),
            game: GameConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Reads a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PongError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Parses a JSON config document.
    pub fn from_json(text: &str) -> Result<Self, PongError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Returns a copy with out-of-range values replaced by defaults.
    pub fn validated(mut self) -> Self {
        let defaults = Self::default();

        if self.send_timeout_ms == 0 {
            warn!("send_timeout_ms must be positive, using default");
            self.send_timeout_ms = defaults.send_timeout_ms;
        }
        if self.corrupted_packet_limit == 0 {
            warn!("corrupted_packet_limit must be positive, using default");
            self.corrupted_packet_limit = defaults.corrupted_packet_limit;
        }
        if self.session.max_nickname_len == 0 {
            warn!("max_nickname_len must be positive, using default");
            self.session.max_nickname_len = defaults.session.max_nickname_len;
        }
        self.game = self.game.validated();
        self
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    /// `None` when periodic statistics are disabled.
    pub fn stats_period(&self) -> Option<Duration> {
        (self.stats_period_secs > 0).then(|| Duration::from_secs(self.stats_period_secs))
    }
}
