//! Scenario tests for a single game.
//!
//! Time-dependent tests run with `start_paused = true`, so the host
//! clock (tokio's clock) only moves when every task is idle and ball
//! arrivals resolve at their exact predicted millisecond.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{TestHost, LEFT, RIGHT};
use pong_game::{
    ErrorKind, FixedBallRng, Game, GameConfig, GameError, GameEvent, GamePhase, PlayerDirection,
    PlayerState, Side,
};
use pong_protocol::{GameId, PlayerId};

const STRANGER: PlayerId = PlayerId(99);

fn game_with(host: &Arc<TestHost>, config: GameConfig) -> Arc<Game<TestHost>> {
    Arc::new(Game::with_rng(
        GameId(1),
        config,
        Arc::clone(host),
        Box::new(FixedBallRng::new(0, 500)),
    ))
}

/// A game with both players seated and the join packets drained.
async fn seated(host: &Arc<TestHost>, config: GameConfig) -> Arc<Game<TestHost>> {
    let game = game_with(host, config);
    game.player_join(LEFT).await.unwrap();
    game.player_join(RIGHT).await.unwrap();
    host.take();
    game
}

async fn both_ready(game: &Game<TestHost>) {
    game.player_ready(LEFT).await.unwrap();
    game.player_ready(RIGHT).await.unwrap();
}

// =========================================================================
// Join
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_join_sequence() {
    let host = TestHost::new();
    let game = game_with(&host, GameConfig::default());

    game.player_join(LEFT).await.unwrap();
    assert_eq!(host.take_for(LEFT), ["joined;left"]);
    assert_eq!(game.info().await.phase, GamePhase::New);

    game.player_join(RIGHT).await.unwrap();
    assert_eq!(
        host.take_for(RIGHT),
        ["joined;right", "opponent_joined;player1", "new_round;0;0"]
    );
    assert_eq!(
        host.take_for(LEFT),
        ["opponent_joined;player2", "new_round;0;0"]
    );

    let info = game.info().await;
    assert_eq!(info.phase, GamePhase::Waiting);
    assert_eq!(info.seats[Side::Left], Some(LEFT));
    assert_eq!(info.seats[Side::Right], Some(RIGHT));
    assert_eq!(info.player_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_join_twice_is_already_in_game() {
    let host = TestHost::new();
    let game = game_with(&host, GameConfig::default());
    game.player_join(LEFT).await.unwrap();
    host.take();

    let result = game.player_join(LEFT).await;

    assert_eq!(result, Err(GameError::AlreadyInGame(LEFT, GameId(1))));
    assert!(host.take().is_empty());
    assert_eq!(game.info().await.player_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_third_player_is_rejected() {
    let host = TestHost::new();
    let game = seated(&host, GameConfig::default()).await;

    let result = game.player_join(STRANGER).await;

    assert_eq!(result, Err(GameError::GameFull(GameId(1))));
    assert_eq!(result.unwrap_err().kind(), ErrorKind::Identity);
}

// =========================================================================
// Ready
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_ready_before_opponent_joined_is_wrong_phase() {
    let host = TestHost::new();
    let game = game_with(&host, GameConfig::default());
    game.player_join(LEFT).await.unwrap();

    let err = game.player_ready(LEFT).await.unwrap_err();

    assert_eq!(
        err,
        GameError::WrongPhase {
            event: GameEvent::Ready,
            phase: GamePhase::New
        }
    );
    assert_eq!(err.kind(), ErrorKind::Protocol);
}

#[tokio::test(start_paused = true)]
async fn test_ready_from_stranger_is_not_in_game() {
    let host = TestHost::new();
    let game = seated(&host, GameConfig::default()).await;

    assert_eq!(
        game.player_ready(STRANGER).await,
        Err(GameError::NotInGame(STRANGER, GameId(1)))
    );
    assert!(host.take().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_both_ready_releases_ball() {
    let host = TestHost::new();
    let game = seated(&host, GameConfig::default()).await;

    game.player_ready(LEFT).await.unwrap();
    assert_eq!(host.take_for(RIGHT), ["opponent_ready"]);
    assert!(host.take_for(LEFT).is_empty());
    assert_eq!(game.info().await.phase, GamePhase::Waiting);

    game.player_ready(RIGHT).await.unwrap();

    // Served toward the left: the ball "comes from" the right.
    let released = "ball_released;3000;right;0;0;300";
    assert_eq!(host.take_for(LEFT), ["opponent_ready", released]);
    assert_eq!(host.take_for(RIGHT), [released]);

    let info = game.info().await;
    assert_eq!(info.phase, GamePhase::Playing);
    // 490 units at 300 units/s after the start delay.
    assert_eq!(info.future_ball.timestamp, 3000 + 1633);
    assert_eq!(info.future_ball.side, Side::Left);
    assert_eq!(info.future_ball.position, 0);
}

// =========================================================================
// Update
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_update_within_threshold_is_accepted() {
    let host = TestHost::new();
    let game = seated(&host, GameConfig::default()).await;

    game.player_update(LEFT, PlayerState::new(0, 29, PlayerDirection::Up))
        .await
        .unwrap();

    assert_eq!(host.take_for(LEFT), ["your_state;0;29;up"]);
    assert_eq!(host.take_for(RIGHT), ["opponent_state;0;29;up"]);
}

#[tokio::test(start_paused = true)]
async fn test_update_too_far_from_expected_is_ignored() {
    let host = TestHost::new();
    let game = seated(&host, GameConfig::default()).await;

    game.player_update(LEFT, PlayerState::new(0, 30, PlayerDirection::Up))
        .await
        .unwrap();

    // Still answered, with the unchanged state.
    assert_eq!(host.take_for(LEFT), ["your_state;0;0;stop"]);
    assert_eq!(host.take_for(RIGHT), ["opponent_state;0;0;stop"]);
}

#[tokio::test(start_paused = true)]
async fn test_update_from_the_future_is_ignored() {
    let host = TestHost::new();
    let game = seated(&host, GameConfig::default()).await;

    game.player_update(RIGHT, PlayerState::new(51, 0, PlayerDirection::Down))
        .await
        .unwrap();
    assert_eq!(game.info().await.players[Side::Right], PlayerState::default());

    // Exactly at the tolerance is still "now".
    game.player_update(RIGHT, PlayerState::new(50, 0, PlayerDirection::Down))
        .await
        .unwrap();
    assert_eq!(
        game.info().await.players[Side::Right],
        PlayerState::new(50, 0, PlayerDirection::Down)
    );
}

#[tokio::test(start_paused = true)]
async fn test_update_uses_extrapolated_position() {
    let host = TestHost::new();
    let game = seated(&host, GameConfig::default()).await;
    game.player_update(LEFT, PlayerState::new(0, 0, PlayerDirection::Up))
        .await
        .unwrap();
    tokio::time::advance(Duration::from_millis(500)).await;

    // Moving up at 400/s for half a second: 200 is expected.
    game.player_update(LEFT, PlayerState::new(500, 190, PlayerDirection::Stop))
        .await
        .unwrap();

    assert_eq!(
        game.info().await.players[Side::Left],
        PlayerState::new(500, 190, PlayerDirection::Stop)
    );
}

#[tokio::test(start_paused = true)]
async fn test_update_before_both_joined_is_wrong_phase() {
    let host = TestHost::new();
    let game = game_with(&host, GameConfig::default());
    game.player_join(LEFT).await.unwrap();

    assert!(matches!(
        game.player_update(LEFT, PlayerState::default()).await,
        Err(GameError::WrongPhase { .. })
    ));
}

// =========================================================================
// Leave / stop
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_leave_notifies_both_and_ends_game() {
    let host = TestHost::new();
    let game = seated(&host, GameConfig::default()).await;

    game.player_leave(LEFT).await.unwrap();

    assert_eq!(host.take_for(RIGHT), ["opponent_left"]);
    assert_eq!(host.take_for(LEFT), ["left"]);
    let info = game.info().await;
    assert_eq!(info.phase, GamePhase::End);
    assert_eq!(info.player_count(), 0);
    assert!(game.is_stopped());
}

#[tokio::test(start_paused = true)]
async fn test_leave_twice_changes_nothing() {
    let host = TestHost::new();
    let game = seated(&host, GameConfig::default()).await;
    game.player_leave(LEFT).await.unwrap();
    host.take();

    assert_eq!(
        game.player_leave(LEFT).await,
        Err(GameError::NotInGame(LEFT, GameId(1)))
    );
    assert_eq!(
        game.player_leave(RIGHT).await,
        Err(GameError::NotInGame(RIGHT, GameId(1)))
    );
    assert!(host.take().is_empty());
    assert_eq!(game.info().await.phase, GamePhase::End);
}

#[tokio::test(start_paused = true)]
async fn test_leave_ends_loop_and_reports_to_host() {
    let host = TestHost::new();
    let game = seated(&host, GameConfig::default()).await;
    let handle = game.spawn();

    game.player_leave(RIGHT).await.unwrap();
    handle.await.unwrap();

    assert_eq!(host.ended(), [GameId(1)]);
    // Seats were cleared by the leave, so nobody gets game_ended.
    assert_eq!(host.take_for(LEFT), ["opponent_left"]);
}

#[tokio::test(start_paused = true)]
async fn test_stop_sends_game_ended_to_seated_players() {
    let host = TestHost::new();
    let game = seated(&host, GameConfig::default()).await;
    let handle = game.spawn();

    assert!(game.stop());
    assert!(!game.stop());
    handle.await.unwrap();

    assert_eq!(host.take_for(LEFT), ["game_ended"]);
    assert_eq!(host.take_for(RIGHT), ["game_ended"]);
    assert_eq!(host.ended(), [GameId(1)]);
}

// =========================================================================
// Loop: hit, miss, game over, restart
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_paddle_in_place_hits_ball() {
    let host = TestHost::new();
    let game = seated(&host, GameConfig::default()).await;
    let handle = game.spawn();
    both_ready(&game).await;
    host.take();

    tokio::time::sleep(Duration::from_secs(5)).await;

    // Arrival at 4633 on the left; the rebound gets the fixed rng values.
    let hit = "ball_hit;4633;left;0;0;500";
    assert_eq!(host.take_for(LEFT), [hit]);
    assert_eq!(host.take_for(RIGHT), [hit]);

    let info = game.info().await;
    assert_eq!(info.phase, GamePhase::Playing);
    // 980 units at 500 units/s.
    assert_eq!(info.future_ball.timestamp, 4633 + 1960);
    assert_eq!(info.future_ball.side, Side::Right);

    game.stop();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_miss_scores_for_opponent() {
    let host = TestHost::new();
    let game = seated(&host, GameConfig::default()).await;
    let handle = game.spawn();

    // The left paddle runs to the top and stays there.
    game.player_update(LEFT, PlayerState::new(0, 0, PlayerDirection::Up))
        .await
        .unwrap();
    both_ready(&game).await;
    host.take();

    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(host.take_for(LEFT), ["new_round;0;1"]);
    assert_eq!(host.take_for(RIGHT), ["new_round;0;1"]);
    let info = game.info().await;
    assert_eq!(info.phase, GamePhase::Waiting);
    assert_eq!(info.scores[Side::Right], 1);
    assert!(!info.ready[Side::Left]);
    // The player who lost the point receives the next serve.
    assert_eq!(info.service_side, Side::Left);

    game.stop();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_max_score_ends_match_and_restart_resets() {
    let host = TestHost::new();
    let config = GameConfig {
        max_score: 2,
        ..GameConfig::default()
    };
    let game = seated(&host, config).await;
    let handle = game.spawn();
    game.player_update(LEFT, PlayerState::new(0, 0, PlayerDirection::Up))
        .await
        .unwrap();
    host.take();

    both_ready(&game).await;
    tokio::time::sleep(Duration::from_secs(5)).await;
    both_ready(&game).await;
    tokio::time::sleep(Duration::from_secs(6)).await;
    host.take_for(RIGHT);

    assert_eq!(
        host.take_for(LEFT),
        [
            "opponent_ready",
            "ball_released;3000;right;0;0;300",
            "new_round;0;1",
            "opponent_ready",
            "ball_released;8000;right;0;0;300",
            "game_over;0;2",
        ]
    );
    let info = game.info().await;
    assert_eq!(info.phase, GamePhase::GameOver);
    assert!(matches!(
        game.player_ready(LEFT).await,
        Err(GameError::WrongPhase { .. })
    ));

    game.player_restart(LEFT).await.unwrap();
    assert_eq!(host.take_for(RIGHT), ["opponent_ready"]);
    assert_eq!(game.info().await.phase, GamePhase::GameOver);

    game.player_restart(RIGHT).await.unwrap();
    assert_eq!(host.take_for(LEFT), ["opponent_ready", "new_round;0;0"]);
    assert_eq!(host.take_for(RIGHT), ["new_round;0;0"]);
    let info = game.info().await;
    assert_eq!(info.phase, GamePhase::Waiting);
    assert_eq!(info.scores.left + info.scores.right, 0);

    game.stop();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_restart_outside_game_over_is_wrong_phase() {
    let host = TestHost::new();
    let game = seated(&host, GameConfig::default()).await;

    assert_eq!(
        game.player_restart(LEFT).await,
        Err(GameError::WrongPhase {
            event: GameEvent::Restart,
            phase: GamePhase::Waiting
        })
    );
}
