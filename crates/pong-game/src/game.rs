//! A single match: the phase machine, the packets it emits and the loop
//! that resolves ball arrivals.
//!
//! All state lives in one [`Match`] behind a `tokio::sync::Mutex`.
//! Player calls and the loop take that lock for their full duration, so
//! every transition is atomic and packets always describe committed
//! state. Calls that move the next deadline signal the loop's
//! [`DeadlineTimer`] before they unlock.

use std::sync::Arc;
use std::time::Duration;

use pong_protocol::{GameId, Packet, PlayerId};
use pong_timer::{DeadlineTimer, TimerConfig, Wake};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::physics::{can_hit, expected_player_state, next_ball_state, Launch};
use crate::{
    BallRng, BallState, GameConfig, GameError, GameEvent, GameHost, GamePhase, PerSide,
    PlayerState, Side, ThreadBallRng, Timestamp,
};

/// A snapshot of one game's state.
#[derive(Debug, Clone, PartialEq)]
pub struct GameInfo {
    pub game_id: GameId,
    pub phase: GamePhase,
    pub seats: PerSide<Option<PlayerId>>,
    pub scores: PerSide<u32>,
    pub ready: PerSide<bool>,
    pub players: PerSide<PlayerState>,
    /// Last realized bounce.
    pub ball: BallState,
    /// Predicted arrival of the ball in flight.
    pub future_ball: BallState,
    pub service_side: Side,
}

impl GameInfo {
    /// Number of occupied seats.
    pub fn player_count(&self) -> usize {
        self.seats.iter().filter(|(_, seat)| seat.is_some()).count()
    }
}

/// Mutable match state. Only touched with the game lock held.
struct Match {
    phase: GamePhase,
    seats: PerSide<Option<PlayerId>>,
    players: PerSide<PlayerState>,
    ready: PerSide<bool>,
    scores: PerSide<u32>,
    ball: BallState,
    future_ball: BallState,
    service_side: Side,
    rng: Box<dyn BallRng>,
}

impl Match {
    fn new(rng: Box<dyn BallRng>) -> Self {
        Self {
            phase: GamePhase::New,
            seats: PerSide::default(),
            players: PerSide::default(),
            ready: PerSide::default(),
            scores: PerSide::default(),
            ball: BallState::default(),
            future_ball: BallState::default(),
            service_side: Side::Left,
            rng,
        }
    }

    fn side_of(&self, player_id: PlayerId) -> Option<Side> {
        Side::BOTH
            .into_iter()
            .find(|&side| self.seats[side] == Some(player_id))
    }

    fn opponent(&self, side: Side) -> Option<PlayerId> {
        self.seats[side.opposite()]
    }
}

/// One two-player match.
///
/// Created by the [`GameManager`](crate::GameManager), shared behind an
/// `Arc` between the connection tasks that feed it player events and its
/// own loop task ([`Game::spawn`]).
pub struct Game<H: GameHost> {
    id: GameId,
    config: GameConfig,
    host: Arc<H>,
    state: Mutex<Match>,
    timer: DeadlineTimer,
}

impl<H: GameHost> Game<H> {
    /// Creates a game that draws launch angles from the thread RNG.
    pub fn new(id: GameId, config: GameConfig, host: Arc<H>) -> Self {
        Self::with_rng(id, config, host, Box::new(ThreadBallRng))
    }

    /// Creates a game with an explicit angle/speed source.
    pub fn with_rng(
        id: GameId,
        config: GameConfig,
        host: Arc<H>,
        rng: Box<dyn BallRng>,
    ) -> Self {
        let config = config.validated();
        let timer = DeadlineTimer::new(TimerConfig::with_idle_interval(
            Duration::from_millis(config.idle_interval_ms),
        ));
        Self {
            id,
            config,
            host,
            state: Mutex::new(Match::new(rng)),
            timer,
        }
    }

    pub fn id(&self) -> GameId {
        self.id
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Player events
    // -----------------------------------------------------------------------

    /// Seats a player on the first free side.
    ///
    /// The joiner gets `joined(side)`. When the second seat is taken both
    /// players get `opponent_joined(nickname)` and `new_round(0,0)`, and
    /// the game moves to `Waiting`.
    pub async fn player_join(&self, player_id: PlayerId) -> Result<(), GameError> {
        let mut guard = self.state.lock().await;
        let m = &mut *guard;

        if m.side_of(player_id).is_some() {
            return Err(GameError::AlreadyInGame(player_id, self.id));
        }
        let free = Side::BOTH.into_iter().find(|&side| m.seats[side].is_none());
        if !m.phase.accepts(GameEvent::Join) {
            return Err(match free {
                None => GameError::GameFull(self.id),
                Some(_) => self.wrong_phase(m, GameEvent::Join),
            });
        }
        let side = free.ok_or(GameError::GameFull(self.id))?;

        m.seats[side] = Some(player_id);
        self.host.send(player_id, Packet::new("joined").item(side));
        info!(game_id = %self.id, %player_id, %side, "player joined");

        if let Some(opponent) = m.opponent(side) {
            self.host.send(
                player_id,
                Packet::new("opponent_joined").item(self.host.nickname(opponent)),
            );
            self.host.send(
                opponent,
                Packet::new("opponent_joined").item(self.host.nickname(player_id)),
            );
            self.broadcast(m, score_packet("new_round", &m.scores));
            m.phase = GamePhase::Waiting;
            debug!(game_id = %self.id, "both seats taken");
        }
        Ok(())
    }

    /// Marks a player ready for the next round.
    ///
    /// The opponent gets `opponent_ready`. When both are ready the ball is
    /// placed at the center, the first arrival is predicted, both players
    /// get `ball_released` and the loop is woken.
    pub async fn player_ready(&self, player_id: PlayerId) -> Result<(), GameError> {
        let mut guard = self.state.lock().await;
        let m = &mut *guard;

        self.check_phase(m, GameEvent::Ready)?;
        let side = self.seat_of(m, player_id)?;

        m.ready[side] = true;
        if let Some(opponent) = m.opponent(side) {
            self.host.send(opponent, Packet::new("opponent_ready"));
        }

        if m.ready.left && m.ready.right {
            let now = self.host.now();
            m.phase = GamePhase::Playing;
            m.ball = BallState {
                timestamp: now + self.config.start_delay_ms,
                side: m.service_side.opposite(),
                position: 0,
                angle: 0,
                speed: self.config.ball_speed_min,
            };
            m.future_ball = next_ball_state(
                &self.config,
                &m.ball,
                Launch::Serve(m.service_side),
                m.rng.as_mut(),
            );

            self.broadcast(m, Packet::with_items("ball_released", m.ball.itemize()));
            info!(
                game_id = %self.id,
                serve = %m.service_side,
                arrives_at = m.future_ball.timestamp,
                "ball released"
            );
            self.timer.signal();
        }
        Ok(())
    }

    /// Applies a paddle sample reported by a player.
    ///
    /// The sample replaces the stored state only if it is not from the
    /// future and lies within `position_threshold` of the server's own
    /// extrapolation. Either way the sender gets `your_state` and the
    /// opponent gets `opponent_state` with the stored state.
    pub async fn player_update(
        &self,
        player_id: PlayerId,
        reported: PlayerState,
    ) -> Result<(), GameError> {
        let mut guard = self.state.lock().await;
        let m = &mut *guard;

        self.check_phase(m, GameEvent::Update)?;
        let side = self.seat_of(m, player_id)?;

        let now = self.host.now();
        if reported.timestamp <= now + self.config.time_threshold_ms {
            let expected =
                expected_player_state(&self.config, &m.players[side], reported.timestamp);
            let deviation = (i64::from(reported.position) - i64::from(expected.position)).abs();
            if deviation < i64::from(self.config.position_threshold) {
                m.players[side] = reported;
            } else {
                debug!(
                    game_id = %self.id,
                    %player_id,
                    reported = reported.position,
                    expected = expected.position,
                    "implausible position ignored"
                );
            }
        } else {
            debug!(
                game_id = %self.id,
                %player_id,
                timestamp = reported.timestamp,
                now,
                "position report from the future ignored"
            );
        }

        let state = m.players[side].itemize();
        self.host
            .send(player_id, Packet::with_items("your_state", state.clone()));
        if let Some(opponent) = m.opponent(side) {
            self.host
                .send(opponent, Packet::with_items("opponent_state", state));
        }
        Ok(())
    }

    /// Opts in to a new match after game over.
    ///
    /// When both players restart, scores reset and both get
    /// `new_round(0,0)`.
    pub async fn player_restart(&self, player_id: PlayerId) -> Result<(), GameError> {
        let mut guard = self.state.lock().await;
        let m = &mut *guard;

        self.check_phase(m, GameEvent::Restart)?;
        let side = self.seat_of(m, player_id)?;

        m.ready[side] = true;
        if let Some(opponent) = m.opponent(side) {
            self.host.send(opponent, Packet::new("opponent_ready"));
        }

        if m.ready.left && m.ready.right {
            m.phase = GamePhase::Waiting;
            m.ready = PerSide::default();
            m.scores = PerSide::default();
            self.broadcast(m, score_packet("new_round", &m.scores));
            info!(game_id = %self.id, "match restarted");
            self.timer.signal();
        }
        Ok(())
    }

    /// Leaves the game, ending it for both players.
    ///
    /// The opponent gets `opponent_left`, the leaver gets `left`, both
    /// seats are cleared and the loop is stopped. Leaving twice fails with
    /// [`GameError::NotInGame`] and changes nothing.
    pub async fn player_leave(&self, player_id: PlayerId) -> Result<(), GameError> {
        let mut guard = self.state.lock().await;
        let m = &mut *guard;

        let side = self.seat_of(m, player_id)?;
        self.check_phase(m, GameEvent::Leave)?;

        if let Some(opponent) = m.opponent(side) {
            self.host.send(opponent, Packet::new("opponent_left"));
        }
        self.host.send(player_id, Packet::new("left"));

        m.seats = PerSide::default();
        m.phase = GamePhase::End;
        info!(game_id = %self.id, %player_id, "player left, game over");

        self.timer.stop();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Loop
    // -----------------------------------------------------------------------

    /// Spawns the game loop on the Tokio runtime.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(Arc::clone(self).run())
    }

    /// Runs the game loop until the game is stopped.
    ///
    /// Each round resolves a due arrival, then sleeps until the next one
    /// (or for the idle interval when no ball is in flight). Player events
    /// that change the schedule cut the sleep short.
    pub async fn run(self: Arc<Self>) {
        info!(game_id = %self.id, "game loop started");

        while !self.timer.is_stopped() {
            let wait = self.advance().await;
            if self.timer.wait_for(wait).await == Wake::Stopped {
                break;
            }
        }

        self.finish().await;
        info!(game_id = %self.id, "game loop stopped");
    }

    /// Stops the loop. Idempotent; returns `true` on the first call.
    pub fn stop(&self) -> bool {
        self.timer.stop()
    }

    /// Whether the loop has been told to stop.
    pub fn is_stopped(&self) -> bool {
        self.timer.is_stopped()
    }

    /// Current state snapshot.
    pub async fn info(&self) -> GameInfo {
        let m = self.state.lock().await;
        GameInfo {
            game_id: self.id,
            phase: m.phase,
            seats: m.seats,
            scores: m.scores,
            ready: m.ready,
            players: m.players,
            ball: m.ball,
            future_ball: m.future_ball,
            service_side: m.service_side,
        }
    }

    /// Resolves a due arrival and returns how long to sleep.
    ///
    /// `None` means no ball is in flight.
    async fn advance(&self) -> Option<Duration> {
        let mut guard = self.state.lock().await;
        let m = &mut *guard;

        if m.phase != GamePhase::Playing {
            return None;
        }

        let now = self.host.now();
        if m.future_ball.timestamp - now < self.config.time_threshold_ms {
            self.resolve_arrival(m, now);
        }

        (m.phase == GamePhase::Playing).then(|| until(m.future_ball.timestamp, now))
    }

    fn resolve_arrival(&self, m: &mut Match, now: Timestamp) {
        let receiving = m.future_ball.side;
        if m.seats[receiving].is_none() {
            warn!(game_id = %self.id, side = %receiving, "no player to receive the ball, ending");
            m.phase = GamePhase::End;
            self.timer.stop();
            return;
        }

        let paddle = expected_player_state(&self.config, &m.players[receiving], now);
        let result = if can_hit(&self.config, &paddle, &m.future_ball) {
            self.ball_hit(m)
        } else {
            self.ball_miss(m, receiving.opposite())
        };
        if let Err(e) = result {
            warn!(game_id = %self.id, error = %e, "arrival not resolved");
        }
    }

    fn ball_hit(&self, m: &mut Match) -> Result<(), GameError> {
        self.check_phase(m, GameEvent::BallHit)?;

        m.ball = m.future_ball;
        m.future_ball = next_ball_state(&self.config, &m.ball, Launch::Rebound, m.rng.as_mut());
        self.broadcast(m, Packet::with_items("ball_hit", m.ball.itemize()));
        debug!(
            game_id = %self.id,
            side = %m.ball.side,
            position = m.ball.position,
            "ball hit"
        );
        Ok(())
    }

    fn ball_miss(&self, m: &mut Match, winner: Side) -> Result<(), GameError> {
        self.check_phase(m, GameEvent::BallMiss)?;

        let max = self.config.max_score;
        m.scores[winner] = (m.scores[winner] + 1).min(max);
        m.ready = PerSide::default();
        m.service_side = winner.opposite();

        if m.scores.left >= max || m.scores.right >= max {
            m.phase = GamePhase::GameOver;
            self.broadcast(m, score_packet("game_over", &m.scores));
            info!(
                game_id = %self.id,
                left = m.scores.left,
                right = m.scores.right,
                %winner,
                "game over"
            );
        } else {
            m.phase = GamePhase::Waiting;
            self.broadcast(m, score_packet("new_round", &m.scores));
            info!(
                game_id = %self.id,
                left = m.scores.left,
                right = m.scores.right,
                "point scored"
            );
        }
        Ok(())
    }

    async fn finish(&self) {
        {
            let mut m = self.state.lock().await;
            self.broadcast(&m, Packet::new("game_ended"));
            m.seats = PerSide::default();
            m.phase = GamePhase::End;
        }
        self.host.game_ended(self.id);
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn broadcast(&self, m: &Match, packet: Packet) {
        for (_, seat) in m.seats.iter() {
            if let Some(player_id) = seat {
                self.host.send(*player_id, packet.clone());
            }
        }
    }

    fn check_phase(&self, m: &Match, event: GameEvent) -> Result<(), GameError> {
        if m.phase.accepts(event) {
            Ok(())
        } else {
            Err(self.wrong_phase(m, event))
        }
    }

    fn wrong_phase(&self, m: &Match, event: GameEvent) -> GameError {
        GameError::WrongPhase {
            event,
            phase: m.phase,
        }
    }

    fn seat_of(&self, m: &Match, player_id: PlayerId) -> Result<Side, GameError> {
        m.side_of(player_id)
            .ok_or(GameError::NotInGame(player_id, self.id))
    }
}

fn score_packet(name: &str, scores: &PerSide<u32>) -> Packet {
    Packet::new(name).item(scores.left).item(scores.right)
}

fn until(deadline: Timestamp, now: Timestamp) -> Duration {
    Duration::from_millis(deadline.saturating_sub(now).max(0) as u64)
}
