//! Game manager: creates games, pairs players and routes their events.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use pong_protocol::{GameId, PlayerId};
use tokio::task::JoinHandle;

use crate::{BallRng, Game, GameConfig, GameError, GameHost, GameInfo, PlayerState, ThreadBallRng};

fn thread_rng() -> Box<dyn BallRng> {
    Box::new(ThreadBallRng)
}

/// A running game and its loop task.
struct ManagedGame<H: GameHost> {
    game: Arc<Game<H>>,
    task: JoinHandle<()>,
}

/// Manages all active games and tracks which player is in which game.
///
/// This is the entry point for game operations from the server. It is
/// not thread-safe by itself; the server keeps it behind a
/// `tokio::sync::Mutex`.
pub struct GameManager<H: GameHost> {
    host: Arc<H>,
    config: GameConfig,
    rng: fn() -> Box<dyn BallRng>,

    /// Active games in creation order, so pairing is first come first
    /// served.
    games: BTreeMap<GameId, ManagedGame<H>>,

    /// Maps each player to the game they're currently in.
    /// A player can be in at most ONE game at a time.
    player_games: HashMap<PlayerId, GameId>,

    next_id: u64,
}

impl<H: GameHost> GameManager<H> {
    /// Creates a new, empty manager. Games get `config` and draw
    /// randomness from the thread RNG.
    pub fn new(config: GameConfig, host: Arc<H>) -> Self {
        Self {
            host,
            config: config.validated(),
            rng: thread_rng,
            games: BTreeMap::new(),
            player_games: HashMap::new(),
            next_id: 1,
        }
    }

    /// Replaces the randomness source used by games created from now on.
    pub fn with_rng(mut self, rng: fn() -> Box<dyn BallRng>) -> Self {
        self.rng = rng;
        self
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Creates a new game, starts its loop and returns it.
    pub fn create_game(&mut self) -> Arc<Game<H>> {
        let game_id = GameId(self.next_id);
        self.next_id += 1;

        let game = Arc::new(Game::with_rng(
            game_id,
            self.config.clone(),
            Arc::clone(&self.host),
            (self.rng)(),
        ));
        let task = game.spawn();
        self.games.insert(
            game_id,
            ManagedGame {
                game: Arc::clone(&game),
                task,
            },
        );
        tracing::info!(%game_id, "game created");
        game
    }

    /// Seats a player in a specific game.
    ///
    /// Enforces the "one game at a time" invariant.
    pub async fn join_game(
        &mut self,
        player_id: PlayerId,
        game_id: GameId,
    ) -> Result<(), GameError> {
        if let Some(current) = self.player_games.get(&player_id) {
            return Err(GameError::AlreadyInGame(player_id, *current));
        }

        let managed = self
            .games
            .get(&game_id)
            .ok_or(GameError::NotFound(game_id))?;
        managed.game.player_join(player_id).await?;
        self.player_games.insert(player_id, game_id);
        Ok(())
    }

    /// Seats a player in the oldest game with a free seat, or in a new
    /// game if there is none.
    pub async fn join_or_create(&mut self, player_id: PlayerId) -> Result<GameId, GameError> {
        if let Some(current) = self.player_games.get(&player_id) {
            return Err(GameError::AlreadyInGame(player_id, *current));
        }

        for (game_id, managed) in &self.games {
            if managed.game.is_stopped() {
                continue;
            }
            // A full or started game refuses the join; keep looking.
            if managed.game.player_join(player_id).await.is_ok() {
                self.player_games.insert(player_id, *game_id);
                return Ok(*game_id);
            }
        }

        let game = self.create_game();
        game.player_join(player_id).await?;
        self.player_games.insert(player_id, game.id());
        Ok(game.id())
    }

    /// Routes a ready event to the player's game.
    pub async fn player_ready(&self, player_id: PlayerId) -> Result<(), GameError> {
        self.game_of(player_id)?.player_ready(player_id).await
    }

    /// Routes a paddle report to the player's game.
    pub async fn player_update(
        &self,
        player_id: PlayerId,
        state: PlayerState,
    ) -> Result<(), GameError> {
        self.game_of(player_id)?.player_update(player_id, state).await
    }

    /// Routes a restart to the player's game.
    pub async fn player_restart(&self, player_id: PlayerId) -> Result<(), GameError> {
        self.game_of(player_id)?.player_restart(player_id).await
    }

    /// Removes a player from their game, which ends it for both.
    ///
    /// Returns every player that was mapped to the game, the leaver
    /// included. They are unmapped even if the game had already ended on
    /// its own.
    pub async fn player_leave(&mut self, player_id: PlayerId) -> Result<Vec<PlayerId>, GameError> {
        let game_id = self
            .player_games
            .get(&player_id)
            .copied()
            .ok_or(GameError::NoGame(player_id))?;

        let result = match self.games.get(&game_id) {
            Some(managed) => managed.game.player_leave(player_id).await,
            None => Err(GameError::NotFound(game_id)),
        };
        let players = self.unmap(game_id);
        result.map(|()| players)
    }

    /// Drops a game whose loop has ended and returns the players that
    /// were still mapped to it.
    pub fn remove_game(&mut self, game_id: GameId) -> Vec<PlayerId> {
        let Some(managed) = self.games.remove(&game_id) else {
            return Vec::new();
        };
        managed.game.stop();
        let players = self.unmap(game_id);

        tracing::info!(%game_id, players = players.len(), "game removed");
        players
    }

    /// Stops every game and waits for the loops to exit.
    pub async fn shutdown(&mut self) {
        for managed in self.games.values() {
            managed.game.stop();
        }
        for (game_id, managed) in std::mem::take(&mut self.games) {
            if let Err(e) = managed.task.await {
                tracing::warn!(%game_id, error = %e, "game task failed");
            }
        }
        self.player_games.clear();
        tracing::info!("all games stopped");
    }

    /// Returns the game a player is currently in, if any.
    pub fn player_game(&self, player_id: &PlayerId) -> Option<GameId> {
        self.player_games.get(player_id).copied()
    }

    /// Looks up a game by ID.
    pub fn game(&self, game_id: GameId) -> Option<Arc<Game<H>>> {
        self.games.get(&game_id).map(|m| Arc::clone(&m.game))
    }

    /// Snapshots of all games, oldest first.
    pub async fn games(&self) -> Vec<GameInfo> {
        let mut infos = Vec::with_capacity(self.games.len());
        for managed in self.games.values() {
            infos.push(managed.game.info().await);
        }
        infos
    }

    /// Returns the number of active games.
    pub fn len(&self) -> usize {
        self.games.len()
    }

    /// Returns `true` if there are no games.
    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    fn unmap(&mut self, game_id: GameId) -> Vec<PlayerId> {
        let players: Vec<PlayerId> = self
            .player_games
            .iter()
            .filter(|(_, g)| **g == game_id)
            .map(|(p, _)| *p)
            .collect();
        self.player_games.retain(|_, g| *g != game_id);
        players
    }

    fn game_of(&self, player_id: PlayerId) -> Result<&Arc<Game<H>>, GameError> {
        let game_id = self
            .player_games
            .get(&player_id)
            .ok_or(GameError::NoGame(player_id))?;
        self.games
            .get(game_id)
            .map(|m| &m.game)
            .ok_or(GameError::NotFound(*game_id))
    }
}
