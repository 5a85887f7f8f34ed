//! `PongServer` builder, accept loop, and the background tasks that
//! live as long as the server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use pong_game::GameManager;
use pong_protocol::{GameId, PlayerId, TextCodec};
use pong_transport::{TcpTransport, Transport};
use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;

use crate::handler::handle_connection;
use crate::host::ServerHost;
use crate::shell::Shell;
use crate::stats::Stats;
use crate::{PongError, ServerConfig};

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState {
    pub(crate) config: ServerConfig,
    pub(crate) local_addr: SocketAddr,
    pub(crate) host: Arc<ServerHost>,
    pub(crate) games: Mutex<GameManager<ServerHost>>,
    pub(crate) stats: Stats,
    pub(crate) codec: TextCodec,
    pub(crate) shutdown: ShutdownHandle,
}

impl ServerState {
    /// Puts players whose game is over back in the lobby.
    pub(crate) fn set_idle(&self, players: &[PlayerId]) {
        self.host.with_sessions(|sessions| {
            for player_id in players {
                if let Err(e) = sessions.set_busy(*player_id, false) {
                    tracing::debug!(%player_id, error = %e, "could not mark player idle");
                }
            }
        });
    }
}

// ---------------------------------------------------------------------------
// ShutdownHandle
// ---------------------------------------------------------------------------

/// Stops a running server. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Asks the server to stop. Repeated calls are harmless.
    pub fn shutdown(&self) {
        if !self.tx.send_replace(true) {
            tracing::info!("shutdown requested");
        }
    }

    pub fn is_shutdown(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`shutdown`](Self::shutdown) has been called,
    /// immediately if it already was.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|stopped| *stopped).await;
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for configuring and starting a pong server.
///
/// # Example
///
/// ```rust,no_run
/// use pong::prelude::*;
///
/// # async fn start() -> Result<(), PongError> {
/// let server = PongServer::builder()
///     .bind("0.0.0.0:4000")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct PongServerBuilder {
    config: ServerConfig,
}

impl PongServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Replaces the whole configuration, bind address included.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Validates the configuration and binds the listener.
    pub async fn build(self) -> Result<PongServer, PongError> {
        let config = self.config.validated();
        let transport = TcpTransport::bind(&config.bind_addr).await?;
        let local_addr = transport.local_addr()?;

        let (ended_tx, ended_rx) = mpsc::unbounded_channel();
        let host = Arc::new(ServerHost::new(config.session.clone(), ended_tx));
        let games = GameManager::new(config.game.clone(), Arc::clone(&host));

        let state = Arc::new(ServerState {
            config,
            local_addr,
            host,
            games: Mutex::new(games),
            stats: Stats::new(),
            codec: TextCodec,
            shutdown: ShutdownHandle::new(),
        });

        Ok(PongServer {
            transport,
            state,
            ended_rx,
        })
    }
}

impl Default for PongServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// A bound pong server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct PongServer {
    transport: TcpTransport,
    state: Arc<ServerState>,
    ended_rx: mpsc::UnboundedReceiver<GameId>,
}

impl PongServer {
    /// Creates a new builder.
    pub fn builder() -> PongServerBuilder {
        PongServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.state.local_addr
    }

    /// Returns a handle that stops [`run()`](Self::run).
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.state.shutdown.clone()
    }

    /// Creates an operator shell reading commands from `input`.
    pub fn shell<R, W>(&self, input: R, output: W) -> Shell<R, W>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        Shell::new(Arc::clone(&self.state), input, output)
    }

    /// Runs the accept loop until the shutdown handle fires.
    ///
    /// On shutdown every game is stopped, every connection is closed and
    /// the call returns once their tasks have finished.
    pub async fn run(self) -> Result<(), PongError> {
        let Self {
            mut transport,
            state,
            ended_rx,
        } = self;
        tracing::info!(addr = %state.local_addr, "pong server running");

        let reaper = tokio::spawn(reap_games(Arc::clone(&state), ended_rx));
        let flusher = state
            .config
            .stats_period()
            .map(|period| tokio::spawn(flush_stats(Arc::clone(&state), period)));

        let mut handlers = JoinSet::new();
        loop {
            tokio::select! {
                _ = state.shutdown.wait() => break,
                accepted = transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&state);
                        handlers.spawn(async move {
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => tracing::error!(error = %e, "accept failed"),
                },
                Some(joined) = handlers.join_next(), if !handlers.is_empty() => {
                    if let Err(e) = joined {
                        tracing::warn!(error = %e, "connection task failed");
                    }
                }
            }
        }

        tracing::info!("stopping server");
        if let Err(e) = transport.shutdown().await {
            tracing::warn!(error = %e, "transport shutdown failed");
        }
        drop(transport);

        state.games.lock().await.shutdown().await;
        while let Some(joined) = handlers.join_next().await {
            if let Err(e) = joined {
                tracing::warn!(error = %e, "connection task failed");
            }
        }
        reaper.abort();
        if let Some(flusher) = flusher {
            flusher.abort();
        }

        tracing::info!("server stopped");
        Ok(())
    }
}

/// Drops games whose loop has ended and frees their players.
async fn reap_games(state: Arc<ServerState>, mut ended: mpsc::UnboundedReceiver<GameId>) {
    while let Some(game_id) = ended.recv().await {
        let players = state.games.lock().await.remove_game(game_id);
        state.set_idle(&players);
    }
}

/// Logs a statistics snapshot every `period`, when anything changed.
async fn flush_stats(state: Arc<ServerState>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        if !state.stats.has_changed() {
            continue;
        }
        let snapshot = state.stats.snapshot();
        tracing::info!(
            uptime_secs = snapshot.uptime.as_secs(),
            packets_received = snapshot.packets_received,
            bytes_received = snapshot.bytes_received,
            packets_dropped = snapshot.packets_dropped,
            bytes_dropped = snapshot.bytes_dropped,
            packets_sent = snapshot.packets_sent,
            bytes_sent = snapshot.bytes_sent,
            "stats"
        );
    }
}
