//! Value types shared by the game, the physics and the wire.
//!
//! Every state that travels to a client is "itemized": turned into the
//! ordered list of text items that follows the packet name. The order of
//! the items is part of the protocol and must not change.

use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Server time in milliseconds.
pub type Timestamp = i64;

// ---------------------------------------------------------------------------
// Parse errors
// ---------------------------------------------------------------------------

/// A text item that does not name a known side or direction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: {value:?}")]
pub struct ParseStateError {
    kind: &'static str,
    value: String,
}

// ---------------------------------------------------------------------------
// Side
// ---------------------------------------------------------------------------

/// One half of the court.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Both sides, left first.
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];

    pub fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => f.write_str("left"),
            Self::Right => f.write_str("right"),
        }
    }
}

impl FromStr for Side {
    type Err = ParseStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            _ => Err(ParseStateError {
                kind: "side",
                value: s.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// PerSide
// ---------------------------------------------------------------------------

/// A pair of values, one per side, indexable by [`Side`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerSide<T> {
    pub left: T,
    pub right: T,
}

impl<T> PerSide<T> {
    pub fn new(left: T, right: T) -> Self {
        Self { left, right }
    }

    /// Iterates over `(side, value)` pairs, left first.
    pub fn iter(&self) -> impl Iterator<Item = (Side, &T)> {
        [(Side::Left, &self.left), (Side::Right, &self.right)].into_iter()
    }
}

impl<T: Clone> PerSide<T> {
    /// The same value on both sides.
    pub fn splat(value: T) -> Self {
        Self {
            left: value.clone(),
            right: value,
        }
    }
}

impl<T> Index<Side> for PerSide<T> {
    type Output = T;

    fn index(&self, side: Side) -> &T {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }
}

impl<T> IndexMut<Side> for PerSide<T> {
    fn index_mut(&mut self, side: Side) -> &mut T {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }
}

// ---------------------------------------------------------------------------
// PlayerDirection
// ---------------------------------------------------------------------------

/// Where a paddle is moving.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerDirection {
    Up,
    #[default]
    Stop,
    Down,
}

impl PlayerDirection {
    /// Sign of the paddle velocity: +1 up, 0 stopped, -1 down.
    pub fn factor(self) -> i32 {
        match self {
            Self::Up => 1,
            Self::Stop => 0,
            Self::Down => -1,
        }
    }
}

impl fmt::Display for PlayerDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => f.write_str("up"),
            Self::Stop => f.write_str("stop"),
            Self::Down => f.write_str("down"),
        }
    }
}

impl FromStr for PlayerDirection {
    type Err = ParseStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(Self::Up),
            "stop" => Ok(Self::Stop),
            "down" => Ok(Self::Down),
            _ => Err(ParseStateError {
                kind: "direction",
                value: s.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// PlayerState
// ---------------------------------------------------------------------------

/// A paddle sample: where it was at `timestamp` and where it was heading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    pub timestamp: Timestamp,
    /// Offset from the court center line.
    pub position: i32,
    pub direction: PlayerDirection,
}

impl PlayerState {
    pub fn new(timestamp: Timestamp, position: i32, direction: PlayerDirection) -> Self {
        Self {
            timestamp,
            position,
            direction,
        }
    }

    /// Wire items: `timestamp, position, direction`.
    pub fn itemize(&self) -> Vec<String> {
        vec![
            self.timestamp.to_string(),
            self.position.to_string(),
            self.direction.to_string(),
        ]
    }
}

// ---------------------------------------------------------------------------
// BallState
// ---------------------------------------------------------------------------

/// The ball at one bounce point.
///
/// Used both for the last realized bounce and for the predicted arrival
/// at the next side. `angle` and `speed` describe the leg that starts at
/// this point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallState {
    pub timestamp: Timestamp,
    /// The side the ball is heading toward.
    pub side: Side,
    /// Offset from the court center line.
    pub position: i32,
    /// Degrees; positive is upward.
    pub angle: i32,
    /// Units per second.
    pub speed: i32,
}

impl BallState {
    /// Wire items: `timestamp, side, position, angle, speed`.
    pub fn itemize(&self) -> Vec<String> {
        vec![
            self.timestamp.to_string(),
            self.side.to_string(),
            self.position.to_string(),
            self.angle.to_string(),
            self.speed.to_string(),
        ]
    }
}

impl Default for BallState {
    fn default() -> Self {
        Self {
            timestamp: 0,
            side: Side::Left,
            position: 0,
            angle: 0,
            speed: 0,
        }
    }
}
