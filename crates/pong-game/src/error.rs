//! Error types for the game layer.

use pong_protocol::{GameId, PlayerId};

use crate::{GameEvent, GamePhase};

/// Broad class of a [`GameError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request is not valid at this point of the match.
    Protocol,
    /// The request names the wrong player or game.
    Identity,
}

/// Errors that can occur during game operations.
///
/// None of them change game state: a failed call leaves the match exactly
/// as it was.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    /// The event is not allowed in the current phase.
    #[error("{event} is not allowed while the game is {phase}")]
    WrongPhase { event: GameEvent, phase: GamePhase },

    /// The player has no seat in this game.
    #[error("player {0} not in game {1}")]
    NotInGame(PlayerId, GameId),

    /// The player already has a seat (in this or another game).
    #[error("player {0} already in game {1}")]
    AlreadyInGame(PlayerId, GameId),

    /// Both seats are taken.
    #[error("game {0} is full")]
    GameFull(GameId),

    /// The game does not exist.
    #[error("game {0} not found")]
    NotFound(GameId),

    /// The player is not seated in any game.
    #[error("player {0} is not in any game")]
    NoGame(PlayerId),
}

impl GameError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::WrongPhase { .. } => ErrorKind::Protocol,
            Self::NotInGame(..)
            | Self::AlreadyInGame(..)
            | Self::GameFull(_)
            | Self::NotFound(_)
            | Self::NoGame(_) => ErrorKind::Identity,
        }
    }
}
