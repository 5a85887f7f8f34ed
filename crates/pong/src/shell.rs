//! Operator shell: a line-oriented command interface on an async stream.

use std::fmt::Write as _;
use std::io;
use std::str::FromStr;
use std::sync::Arc;

use pong_game::{GameHost, Side};
use pong_protocol::PlayerId;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};

use crate::server::ServerState;

const HLINE: &str = "----------------------------------------";

/// Command names and their help lines, in display order.
const HELP: &[(&str, &str)] = &[
    ("help", "print help"),
    ("info", "print server info"),
    ("stats", "print server statistics"),
    ("players", "print list of players"),
    ("games", "print list of games"),
    ("exit", "stop the server and exit"),
];

/// A shell command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Help,
    Info,
    Stats,
    Players,
    Games,
    Exit,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown command {0:?}, try help")]
pub struct UnknownCommand(String);

impl FromStr for Command {
    type Err = UnknownCommand;

    /// Parses the first word of a line. Extra words are ignored.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let name = line.split_whitespace().next().unwrap_or_default();
        match name {
            "help" => Ok(Self::Help),
            "info" => Ok(Self::Info),
            "stats" => Ok(Self::Stats),
            "players" => Ok(Self::Players),
            "games" => Ok(Self::Games),
            "exit" => Ok(Self::Exit),
            other => Err(UnknownCommand(other.to_string())),
        }
    }
}

/// Reads commands from `R` and writes reports to `W`.
///
/// Runs until `exit`, the end of input, or server shutdown. Only `exit`
/// stops the server.
pub struct Shell<R, W> {
    state: Arc<ServerState>,
    lines: Lines<R>,
    output: W,
}

impl<R, W> Shell<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub(crate) fn new(state: Arc<ServerState>, input: R, output: W) -> Self {
        Self {
            state,
            lines: input.lines(),
            output,
        }
    }

    pub async fn run(&mut self) -> io::Result<()> {
        loop {
            let line = tokio::select! {
                _ = self.state.shutdown.wait() => break,
                line = self.lines.next_line() => line?,
            };
            let Some(line) = line else {
                tracing::debug!("shell input closed");
                break;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match line.parse::<Command>() {
                Ok(command) => {
                    self.execute(command).await?;
                    if command == Command::Exit {
                        break;
                    }
                }
                Err(e) => self.write(&format!("error: {e}\n")).await?,
            }
        }
        tracing::debug!("shell stopped");
        Ok(())
    }

    /// Runs one command and writes its report.
    pub async fn execute(&mut self, command: Command) -> io::Result<()> {
        let report = match command {
            Command::Help => section("Help", &help()),
            Command::Info => section("Info", &self.info().await),
            Command::Stats => section(
                "Statistics",
                &format!("{}\n", self.state.stats.snapshot()),
            ),
            Command::Players => section("Players", &self.players()),
            Command::Games => section("Games", &self.games().await),
            Command::Exit => {
                self.state.shutdown.shutdown();
                "stopping server\n".to_string()
            }
        };
        self.write(&report).await
    }

    /// Returns the output stream.
    pub fn into_output(self) -> W {
        self.output
    }

    async fn write(&mut self, text: &str) -> io::Result<()> {
        self.output.write_all(text.as_bytes()).await?;
        self.output.flush().await
    }

    async fn info(&self) -> String {
        let players = self.state.host.with_sessions(|sessions| sessions.len());
        let games = self.state.games.lock().await.len();
        format!(
            "listening on {}\nplayers: {players}\ngames:   {games}\n",
            self.state.local_addr
        )
    }

    fn players(&self) -> String {
        let mut players = self.state.host.with_sessions(|sessions| {
            sessions
                .sessions()
                .into_iter()
                .map(|session| (session.player_id, session.nickname.clone()))
                .collect::<Vec<_>>()
        });
        if players.is_empty() {
            return "- no players active -\n".to_string();
        }
        players.sort_by_key(|(player_id, _)| *player_id);

        let mut out = String::new();
        for (player_id, nickname) in players {
            let nickname = nickname.as_deref().unwrap_or("[not logged]");
            let _ = writeln!(out, "{player_id}: {nickname}");
        }
        out
    }

    async fn games(&self) -> String {
        let infos = self.state.games.lock().await.games().await;
        if infos.is_empty() {
            return "- no games active -\n".to_string();
        }

        let mut out = String::new();
        for info in infos {
            let _ = writeln!(
                out,
                "{:>16} vs. {:<16} {} {} {}:{}",
                self.seat_name(info.seats[Side::Left]),
                self.seat_name(info.seats[Side::Right]),
                info.game_id,
                info.phase,
                info.scores[Side::Left],
                info.scores[Side::Right],
            );
        }
        out
    }

    fn seat_name(&self, seat: Option<PlayerId>) -> String {
        seat.map_or_else(|| "-".to_string(), |player_id| self.state.host.nickname(player_id))
    }
}

fn help() -> String {
    HELP.iter()
        .map(|(name, description)| format!("{name:<10}- {description}\n"))
        .collect()
}

fn section(title: &str, body: &str) -> String {
    format!("\n{HLINE}\n{title}:\n\n{body}{HLINE}\n\n")
}
