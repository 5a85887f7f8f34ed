//! In-memory host shared by the game tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use pong_game::{GameHost, Timestamp};
use pong_protocol::{GameId, Packet, PlayerId};
use tokio::time::Instant;

/// Records every packet and reads time from tokio's (pausable) clock.
pub struct TestHost {
    start: Instant,
    sent: Mutex<Vec<(PlayerId, Packet)>>,
    ended: Mutex<Vec<GameId>>,
}

impl TestHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            start: Instant::now(),
            sent: Mutex::new(Vec::new()),
            ended: Mutex::new(Vec::new()),
        })
    }

    /// Drains and returns everything sent so far.
    pub fn take(&self) -> Vec<(PlayerId, Packet)> {
        std::mem::take(&mut *self.sent.lock().unwrap())
    }

    /// Drains and returns the packets sent to one player, as text.
    pub fn take_for(&self, player_id: PlayerId) -> Vec<String> {
        let mut sent = self.sent.lock().unwrap();
        let (mine, rest): (Vec<_>, Vec<_>) =
            sent.drain(..).partition(|(p, _)| *p == player_id);
        *sent = rest;
        mine.into_iter().map(|(_, packet)| packet.to_string()).collect()
    }

    pub fn ended(&self) -> Vec<GameId> {
        self.ended.lock().unwrap().clone()
    }
}

impl GameHost for TestHost {
    fn now(&self) -> Timestamp {
        self.start.elapsed().as_millis() as Timestamp
    }

    fn send(&self, player_id: PlayerId, packet: Packet) {
        self.sent.lock().unwrap().push((player_id, packet));
    }

    fn nickname(&self, player_id: PlayerId) -> String {
        format!("player{}", player_id.0)
    }

    fn game_ended(&self, game_id: GameId) {
        self.ended.lock().unwrap().push(game_id);
    }
}

pub const LEFT: PlayerId = PlayerId(1);
pub const RIGHT: PlayerId = PlayerId(2);
