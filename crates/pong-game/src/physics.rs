//! Paddle extrapolation, ball trajectory and hit testing.
//!
//! The ball is never simulated frame by frame. Each leg is solved in
//! closed form: given the bounce point it starts from, the physics returns
//! the point (and the time) at which it reaches the other side. Wall
//! bounces are handled by unfolding the trajectory into a straight line
//! and folding the end point back into the court.

use rand::Rng;

use crate::{BallState, GameConfig, PlayerState, Side, Timestamp};

// ---------------------------------------------------------------------------
// Randomness
// ---------------------------------------------------------------------------

/// Source of launch angles and speeds.
pub trait BallRng: Send {
    /// An angle in `[-max, max]` degrees.
    fn angle(&mut self, max: i32) -> i32;

    /// A speed in `[min, max]`.
    fn speed(&mut self, min: i32, max: i32) -> i32;
}

/// Draws from the thread-local generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadBallRng;

impl BallRng for ThreadBallRng {
    fn angle(&mut self, max: i32) -> i32 {
        rand::rng().random_range(-max..=max)
    }

    fn speed(&mut self, min: i32, max: i32) -> i32 {
        rand::rng().random_range(min..=max)
    }
}

/// Always returns the same angle and speed, clamped into the requested
/// ranges. For tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedBallRng {
    pub angle: i32,
    pub speed: i32,
}

impl FixedBallRng {
    pub fn new(angle: i32, speed: i32) -> Self {
        Self { angle, speed }
    }
}

impl BallRng for FixedBallRng {
    fn angle(&mut self, max: i32) -> i32 {
        self.angle.clamp(-max, max)
    }

    fn speed(&mut self, min: i32, max: i32) -> i32 {
        self.speed.clamp(min, max)
    }
}

// ---------------------------------------------------------------------------
// Paddles
// ---------------------------------------------------------------------------

/// Where a paddle should be at `timestamp`, given its last known state.
///
/// The paddle keeps moving in the last reported direction at the
/// configured speed and stops at the position bounds. The result keeps
/// the last direction.
pub fn expected_player_state(
    config: &GameConfig,
    last: &PlayerState,
    timestamp: Timestamp,
) -> PlayerState {
    let seconds = timestamp.saturating_sub(last.timestamp) as f64 / 1000.0;
    let velocity = f64::from(config.player_speed * last.direction.factor());
    let position = (f64::from(last.position) + velocity * seconds) as i64;
    let position = position.clamp(
        i64::from(config.player_position_min),
        i64::from(config.player_position_max),
    ) as i32;

    PlayerState {
        timestamp,
        position,
        direction: last.direction,
    }
}

/// Whether a paddle at `player` covers the ball at `ball`. Both edges
/// count as a hit.
pub fn can_hit(config: &GameConfig, player: &PlayerState, ball: &BallState) -> bool {
    let half = config.player_height / 2;
    ball.position >= player.position - half && ball.position <= player.position + half
}

// ---------------------------------------------------------------------------
// Ball
// ---------------------------------------------------------------------------

/// How a leg starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Launch {
    /// From the center of the court toward the given side.
    Serve(Side),
    /// From the paddle on the previous state's side back across the court.
    Rebound,
}

/// Predicts where and when the ball launched from `from` reaches the
/// next side.
///
/// The leg uses `from.angle` and `from.speed`. The returned state carries
/// fresh angle and speed from `rng` for the leg after it.
pub fn next_ball_state(
    config: &GameConfig,
    from: &BallState,
    launch: Launch,
    rng: &mut dyn BallRng,
) -> BallState {
    let movement_width = f64::from(config.game_width - 2 * config.ball_radius);
    let movement_height = i64::from(config.game_height - 2 * config.ball_radius);
    let half_height = movement_height as f64 / 2.0;

    let width = match launch {
        Launch::Serve(_) => movement_width / 2.0,
        Launch::Rebound => movement_width,
    };
    let radians = f64::from(from.angle).to_radians();

    let travel = width / radians.abs().cos();
    let duration_ms = travel / (f64::from(from.speed) / 1000.0);
    let timestamp = from.timestamp + duration_ms as i64;

    // Unfold: `y` is the distance travelled along the wall axis, measured
    // from the wall the ball is moving away from, and is never negative.
    // The rise is truncated toward zero like paddle extrapolation.
    let rise = (radians.tan() * width) as i64;
    let sign = if from.angle < 0 { -1 } else { 1 };
    let y = (sign * (rise + i64::from(from.position))) as f64 + half_height;

    let remainder = (y as i64) % movement_height;
    let folds = (y / movement_height as f64) as i64 + i64::from(from.angle < 0);
    let folded = if folds % 2 == 0 {
        remainder
    } else {
        movement_height - remainder
    };
    let position = (folded as f64 - half_height) as i32;

    let side = match launch {
        Launch::Serve(toward) => toward,
        Launch::Rebound => from.side.opposite(),
    };

    BallState {
        timestamp,
        side,
        position,
        angle: rng.angle(config.ball_angle_max),
        speed: rng.speed(config.ball_speed_min, config.ball_speed_max),
    }
}
