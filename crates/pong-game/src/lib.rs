//! The pong match: state machine, physics and game registry.
//!
//! Each [`Game`] is one two-player match. Player events arrive as async
//! calls from connection tasks; a loop task per game predicts when the
//! ball reaches a side and decides hit or miss.
//!
//! # Key types
//!
//! - [`Game`]: one match and its loop
//! - [`GameHost`]: what a game needs from the server (clock, packets)
//! - [`GameManager`]: creates games, pairs players, routes events
//! - [`GamePhase`]: lifecycle state machine
//! - [`GameConfig`]: court geometry and gameplay tunables

mod config;
mod error;
mod game;
mod host;
mod manager;
mod physics;
mod state;

pub use config::{GameConfig, GameEvent, GamePhase};
pub use error::{ErrorKind, GameError};
pub use game::{Game, GameInfo};
pub use host::GameHost;
pub use manager::GameManager;
pub use physics::{
    can_hit, expected_player_state, next_ball_state, BallRng, FixedBallRng, Launch, ThreadBallRng,
};
pub use state::{
    BallState, ParseStateError, PerSide, PlayerDirection, PlayerState, Side, Timestamp,
};
