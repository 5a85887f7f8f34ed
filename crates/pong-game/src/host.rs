//! The `GameHost` trait: everything a game needs from the server.
//!
//! A [`Game`](crate::Game) never touches sockets, sessions or the
//! registry directly. It reads the clock, sends packets and reports its
//! own end through this trait, which keeps the game testable with an
//! in-memory host.

use pong_protocol::{GameId, Packet, PlayerId};

use crate::Timestamp;

/// The server side of a running game.
///
/// All methods are synchronous and must not block: they are called while
/// the game holds its lock.
pub trait GameHost: Send + Sync + 'static {
    /// Current server time in milliseconds.
    ///
    /// Must be monotonic. Ball timestamps and player reports are compared
    /// against it.
    fn now(&self) -> Timestamp;

    /// Queues a packet for a player.
    ///
    /// Fire-and-forget: a player that disconnected in the meantime simply
    /// misses the packet.
    fn send(&self, player_id: PlayerId, packet: Packet);

    /// The player's display name, shown to the opponent on join.
    fn nickname(&self, player_id: PlayerId) -> String;

    /// Called once when the game loop has exited, so the registry can
    /// drop the game.
    fn game_ended(&self, game_id: GameId);
}
