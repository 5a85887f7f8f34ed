//! Integration tests for the pong server: real TCP clients against a
//! server bound to a random port.

use std::time::Duration;

use pong::prelude::*;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::task::JoinHandle;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

// =========================================================================
// Helpers
// =========================================================================

struct Client {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl Client {
    async fn connect(addr: &str) -> Self {
        let stream = TcpStream::connect(addr).await.expect("should connect");
        let (read, writer) = stream.into_split();
        Self {
            lines: BufReader::new(read).lines(),
            writer,
        }
    }

    async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\n").as_bytes())
            .await
            .expect("send");
    }

    /// Next line from the server. Panics on close or timeout.
    async fn recv(&mut self) -> String {
        tokio::time::timeout(RECV_TIMEOUT, self.lines.next_line())
            .await
            .expect("timed out waiting for a packet")
            .expect("read failed")
            .expect("connection closed")
    }

    /// Reads until the server closes the connection.
    async fn closed(&mut self) -> bool {
        loop {
            match tokio::time::timeout(RECV_TIMEOUT, self.lines.next_line()).await {
                Ok(Ok(Some(_))) => continue,
                Ok(Ok(None)) | Ok(Err(_)) => return true,
                Err(_) => return false,
            }
        }
    }

    async fn login(&mut self, nickname: &str) {
        self.send(&format!("login;{nickname}")).await;
        assert_eq!(self.recv().await, format!("logged_in;{nickname}"));
    }
}

struct Running {
    addr: String,
    shutdown: ShutdownHandle,
    task: JoinHandle<Result<(), PongError>>,
}

async fn start_with(config: ServerConfig) -> Running {
    let server = PongServer::builder()
        .config(config)
        .bind("127.0.0.1:0")
        .build()
        .await
        .expect("server should build");

    let addr = server.local_addr().to_string();
    let shutdown = server.shutdown_handle();
    let task = tokio::spawn(server.run());
    Running {
        addr,
        shutdown,
        task,
    }
}

async fn start_server() -> Running {
    start_with(ServerConfig::default()).await
}

/// Logs in two clients and seats them in the same game.
async fn paired(addr: &str) -> (Client, Client) {
    let mut alice = Client::connect(addr).await;
    let mut bob = Client::connect(addr).await;
    alice.login("alice").await;
    bob.login("bob").await;

    alice.send("join_game").await;
    assert_eq!(alice.recv().await, "joined;left");
    bob.send("join_game").await;
    assert_eq!(bob.recv().await, "joined;right");
    assert_eq!(bob.recv().await, "opponent_joined;alice");
    assert_eq!(bob.recv().await, "new_round;0;0");
    assert_eq!(alice.recv().await, "opponent_joined;bob");
    assert_eq!(alice.recv().await, "new_round;0;0");

    (alice, bob)
}

// =========================================================================
// Lobby
// =========================================================================

#[tokio::test]
async fn test_ping_before_login() {
    let server = start_server().await;
    let mut client = Client::connect(&server.addr).await;

    client.send("ping").await;

    assert_eq!(client.recv().await, "pong");
}

#[tokio::test]
async fn test_join_before_login_is_rejected() {
    let server = start_server().await;
    let mut client = Client::connect(&server.addr).await;

    client.send("join_game").await;

    let reply = client.recv().await;
    assert!(reply.starts_with("error;"), "got {reply}");
    assert!(reply.contains("not logged in"));
}

#[tokio::test]
async fn test_nickname_must_be_unique() {
    let server = start_server().await;
    let mut alice = Client::connect(&server.addr).await;
    let mut impostor = Client::connect(&server.addr).await;
    alice.login("alice").await;

    impostor.send("login;alice").await;

    let reply = impostor.recv().await;
    assert!(reply.starts_with("error;"));
    assert!(reply.contains("already taken"));
}

#[tokio::test]
async fn test_second_login_is_rejected() {
    let server = start_server().await;
    let mut client = Client::connect(&server.addr).await;
    client.login("alice").await;

    client.send("login;alicia").await;

    assert!(client.recv().await.contains("already logged in"));
}

#[tokio::test]
async fn test_nickname_freed_on_disconnect() {
    let server = start_server().await;
    let mut first = Client::connect(&server.addr).await;
    first.login("alice").await;
    first.send("logout").await;
    assert!(first.closed().await);

    let mut second = Client::connect(&server.addr).await;
    second.login("alice").await;
}

#[tokio::test]
async fn test_unknown_packet_gets_error() {
    let server = start_server().await;
    let mut client = Client::connect(&server.addr).await;

    client.send("dance;now").await;

    assert!(client.recv().await.contains("unknown packet dance"));
}

#[tokio::test]
async fn test_corrupted_packets_close_connection() {
    let server = start_server().await;
    let mut client = Client::connect(&server.addr).await;

    for _ in 0..5 {
        client.send("update_state;not;a;state").await;
    }

    assert!(client.closed().await);
}

#[tokio::test]
async fn test_inactive_connection_is_closed() {
    let mut config = ServerConfig::default();
    config.session.idle_timeout_secs = 1;
    let server = start_with(config).await;
    let mut client = Client::connect(&server.addr).await;

    assert!(client.closed().await);
}

// =========================================================================
// Games
// =========================================================================

#[tokio::test]
async fn test_two_players_reach_ball_released() {
    let server = start_server().await;
    let (mut alice, mut bob) = paired(&server.addr).await;

    alice.send("ready").await;
    assert_eq!(bob.recv().await, "opponent_ready");
    bob.send("ready").await;
    assert_eq!(alice.recv().await, "opponent_ready");

    for client in [&mut alice, &mut bob] {
        let released = client.recv().await;
        let items: Vec<&str> = released.split(';').collect();
        assert_eq!(items[0], "ball_released");
        // Served from the center toward the left player.
        assert_eq!(&items[2..], ["right", "0", "0", "300"]);
    }
}

#[tokio::test]
async fn test_update_is_echoed() {
    let server = start_server().await;
    let (mut alice, mut bob) = paired(&server.addr).await;
    alice.send("ready").await;
    bob.send("ready").await;
    assert_eq!(bob.recv().await, "opponent_ready");
    assert_eq!(alice.recv().await, "opponent_ready");
    assert!(alice.recv().await.starts_with("ball_released;"));
    assert!(bob.recv().await.starts_with("ball_released;"));

    alice.send("update_state;0;0;up").await;

    let own = alice.recv().await;
    assert!(own.starts_with("your_state;"), "got {own}");
    assert!(bob.recv().await.starts_with("opponent_state;"));
}

#[tokio::test]
async fn test_ready_outside_game_is_error() {
    let server = start_server().await;
    let mut client = Client::connect(&server.addr).await;
    client.login("alice").await;

    client.send("ready").await;

    assert!(client.recv().await.contains("not in any game"));
}

#[tokio::test]
async fn test_leave_game_notifies_both() {
    let server = start_server().await;
    let (mut alice, mut bob) = paired(&server.addr).await;

    alice.send("leave_game").await;

    assert_eq!(alice.recv().await, "left");
    assert_eq!(bob.recv().await, "opponent_left");

    // Both are back in the lobby and can start over.
    bob.send("join_game").await;
    assert_eq!(bob.recv().await, "joined;left");
}

#[tokio::test]
async fn test_disconnect_ends_game_for_opponent() {
    let server = start_server().await;
    let (alice, mut bob) = paired(&server.addr).await;

    drop(alice);

    assert_eq!(bob.recv().await, "opponent_left");
}

// =========================================================================
// Shutdown and shell
// =========================================================================

#[tokio::test]
async fn test_shutdown_closes_connections() {
    let server = start_server().await;
    let (mut alice, mut bob) = paired(&server.addr).await;

    server.shutdown.shutdown();

    assert!(alice.closed().await);
    assert!(bob.closed().await);
    let result = tokio::time::timeout(RECV_TIMEOUT, server.task)
        .await
        .expect("server should stop")
        .expect("server task should not panic");
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_shell_reports_and_exits() {
    let server = PongServer::builder()
        .bind("127.0.0.1:0")
        .build()
        .await
        .expect("server should build");
    let addr = server.local_addr().to_string();
    let input: &[u8] = b"players\n\nlaunch\ngames\nexit\nhelp\n";
    let mut shell = server.shell(input, Vec::new());
    let task = tokio::spawn(server.run());

    let mut client = Client::connect(&addr).await;
    client.login("alice").await;
    shell.run().await.expect("shell should run");

    let output = String::from_utf8(shell.into_output()).unwrap();
    assert!(output.contains("Players:\n\n"));
    assert!(output.contains(": alice\n"));
    assert!(output.contains("error: unknown command \"launch\""));
    assert!(output.contains("- no games active -"));
    assert!(output.contains("stopping server"));
    // Nothing after exit is executed.
    assert!(!output.contains("Help:"));

    tokio::time::timeout(RECV_TIMEOUT, task)
        .await
        .expect("server should stop")
        .expect("server task should not panic")
        .expect("server should stop cleanly");
}
