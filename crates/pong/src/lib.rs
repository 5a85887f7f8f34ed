//! # Pong
//!
//! A server for two-player pong matches over line-framed TCP.
//!
//! Clients log in with a nickname, get paired into a game and stream
//! their paddle state. The server owns the ball: it predicts each bounce,
//! decides hits and misses, and keeps the score.
//!
//! The layers live in their own crates and meet here:
//! transport → protocol → session → game.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pong::prelude::*;
//!
//! # async fn start() -> Result<(), PongError> {
//! let server = PongServer::builder()
//!     .bind("0.0.0.0:4000")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod host;
mod request;
mod server;
mod shell;
mod stats;

pub use config::ServerConfig;
pub use error::PongError;
pub use host::ServerHost;
pub use request::Request;
pub use server::{PongServer, PongServerBuilder, ShutdownHandle};
pub use shell::{Command, Shell, UnknownCommand};
pub use stats::{Stats, StatsSnapshot};

/// Convenience re-exports for the common types.
pub mod prelude {
    pub use crate::{PongError, PongServer, PongServerBuilder, ServerConfig, ShutdownHandle};
    pub use pong_game::{GameConfig, GameError, GamePhase, PlayerDirection, PlayerState, Side};
    pub use pong_protocol::{GameId, Packet, PlayerId};
    pub use pong_session::{SessionConfig, SessionError};
}
