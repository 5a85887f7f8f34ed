//! Game configuration and phase machine.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

// ---------------------------------------------------------------------------
// GameConfig
// ---------------------------------------------------------------------------

/// Court geometry and gameplay tunables.
///
/// Distances are in court units, speeds in units per second, times in
/// milliseconds. Positions are offsets from the center line, so the
/// paddle bounds are symmetric by default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub game_width: i32,
    pub game_height: i32,
    pub ball_radius: i32,
    pub player_height: i32,
    pub player_speed: i32,
    pub player_position_min: i32,
    pub player_position_max: i32,
    pub ball_speed_min: i32,
    pub ball_speed_max: i32,
    /// Largest launch angle in degrees, either way.
    pub ball_angle_max: i32,
    /// A reported paddle position must be closer than this to the
    /// server's extrapolation to be accepted.
    pub position_threshold: i32,
    /// Tolerance for "now": reports up to this far in the future are
    /// accepted, and an arrival this close is resolved early.
    pub time_threshold_ms: i64,
    /// Delay between both players getting ready and the serve.
    pub start_delay_ms: i64,
    pub max_score: u32,
    /// How long the loop sleeps while nothing is in flight.
    pub idle_interval_ms: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            game_width: 1000,
            game_height: 600,
            ball_radius: 10,
            player_height: 100,
            player_speed: 400,
            player_position_min: -250,
            player_position_max: 250,
            ball_speed_min: 300,
            ball_speed_max: 700,
            ball_angle_max: 60,
            position_threshold: 30,
            time_threshold_ms: 50,
            start_delay_ms: 3000,
            max_score: 10,
            idle_interval_ms: 10_000,
        }
    }
}

impl GameConfig {
    /// Steepest launch angle the physics accepts.
    pub const ANGLE_LIMIT: i32 = 80;

    /// Fix inconsistent values so the physics never divides by zero or
    /// draws from an empty range. Each repair is logged.
    pub fn validated(mut self) -> Self {
        let defaults = Self::default();

        if self.ball_radius < 0
            || self.game_width <= 2 * self.ball_radius
            || self.game_height <= 2 * self.ball_radius
        {
            warn!(
                width = self.game_width,
                height = self.game_height,
                radius = self.ball_radius,
                "court too small for the ball, using default geometry"
            );
            self.game_width = defaults.game_width;
            self.game_height = defaults.game_height;
            self.ball_radius = defaults.ball_radius;
        }
        if self.player_position_min > self.player_position_max {
            warn!(
                min = self.player_position_min,
                max = self.player_position_max,
                "player position bounds reversed, swapping"
            );
            std::mem::swap(&mut self.player_position_min, &mut self.player_position_max);
        }
        if self.ball_speed_min <= 0 {
            warn!(speed = self.ball_speed_min, "ball_speed_min must be positive");
            self.ball_speed_min = defaults.ball_speed_min;
        }
        if self.ball_speed_max < self.ball_speed_min {
            warn!(
                min = self.ball_speed_min,
                max = self.ball_speed_max,
                "ball_speed_max below ball_speed_min, raising"
            );
            self.ball_speed_max = self.ball_speed_min;
        }
        if !(0..=Self::ANGLE_LIMIT).contains(&self.ball_angle_max) {
            warn!(angle = self.ball_angle_max, "ball_angle_max out of range, clamping");
            self.ball_angle_max = self.ball_angle_max.clamp(0, Self::ANGLE_LIMIT);
        }
        if self.max_score == 0 {
            warn!("max_score of 0 would end every game at once, using 1");
            self.max_score = 1;
        }
        if self.idle_interval_ms == 0 {
            warn!("idle_interval_ms of 0, using default");
            self.idle_interval_ms = defaults.idle_interval_ms;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// GamePhase
// ---------------------------------------------------------------------------

/// Lifecycle phase of one match.
///
/// ```text
/// New ──(2nd join)──→ Waiting ──(both ready)──→ Playing
///                       ↑  ↑                      │
///                       │  └──────(miss)──────────┤
///                       │                         │ (max score)
///                       └──(both restart)── GameOver
///
/// any phase ──(leave)──→ End
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    /// Created, at least one seat free.
    New,
    /// Both seats taken, round not started.
    Waiting,
    /// Ball in flight.
    Playing,
    /// Someone reached the max score.
    GameOver,
    /// A player left. Terminal.
    End,
}

impl GamePhase {
    pub const ALL: [GamePhase; 5] = [
        Self::New,
        Self::Waiting,
        Self::Playing,
        Self::GameOver,
        Self::End,
    ];

    /// Whether `event` is allowed in this phase.
    pub fn accepts(self, event: GameEvent) -> bool {
        match event {
            GameEvent::Join => self == Self::New,
            GameEvent::Ready => self == Self::Waiting,
            GameEvent::Update => matches!(self, Self::Waiting | Self::Playing),
            GameEvent::BallHit | GameEvent::BallMiss => self == Self::Playing,
            GameEvent::Restart => self == Self::GameOver,
            GameEvent::Leave => self != Self::End,
        }
    }

    /// Returns `true` while a seat can still be taken.
    pub fn is_open(self) -> bool {
        self == Self::New
    }
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::New => "new",
            Self::Waiting => "waiting",
            Self::Playing => "playing",
            Self::GameOver => "game_over",
            Self::End => "end",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// GameEvent
// ---------------------------------------------------------------------------

/// Everything that can happen to a match.
///
/// `BallHit` and `BallMiss` come from the game loop; the rest come from
/// players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameEvent {
    Join,
    Ready,
    Update,
    Restart,
    Leave,
    BallHit,
    BallMiss,
}

impl GameEvent {
    pub const ALL: [GameEvent; 7] = [
        Self::Join,
        Self::Ready,
        Self::Update,
        Self::Restart,
        Self::Leave,
        Self::BallHit,
        Self::BallMiss,
    ];
}

impl fmt::Display for GameEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Join => "join",
            Self::Ready => "ready",
            Self::Update => "update",
            Self::Restart => "restart",
            Self::Leave => "leave",
            Self::BallHit => "ball hit",
            Self::BallMiss => "ball miss",
        };
        f.write_str(name)
    }
}
