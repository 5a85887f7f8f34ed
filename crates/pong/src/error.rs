//! Unified error type for the pong server.

use pong_game::GameError;
use pong_protocol::ProtocolError;
use pong_session::SessionError;
use pong_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates the `From` impls,
/// so `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum PongError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, malformed request).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (login, nickname, unknown player).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A game-level error (wrong phase, not seated, full).
    #[error(transparent)]
    Game(#[from] GameError),

    /// An I/O error outside the transport (config file, socket setup).
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid JSON for [`ServerConfig`](crate::ServerConfig).
    #[error("config: {0}")]
    Config(#[from] serde_json::Error),
}
