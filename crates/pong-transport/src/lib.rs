//! Line-framed connections for the pong server.
//!
//! Clients speak plain TCP. Each protocol packet travels as one line of at
//! most [`MAX_LINE_LEN`] bytes followed by `\n`; the transport strips and
//! adds that terminator and never looks inside the line. Decoding the
//! `;`-separated fields is left to `pong-protocol`.
//!
//! [`Transport`] and [`Connection`] are the seams the server is written
//! against, and [`TcpTransport`] is the implementation it runs on.

#![allow(async_fn_in_trait)]

mod error;
mod tcp;

pub use error::TransportError;
pub use tcp::{TcpConnection, TcpTransport, MAX_LINE_LEN};

use std::fmt;
use std::net::SocketAddr;

/// Process-unique number assigned to each accepted socket. Session and
/// game tables are keyed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Source of client connections; the server's accept loop owns one.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for the next client to connect.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;

    /// Stops handing out connections. Already accepted ones stay open.
    async fn shutdown(&self) -> Result<(), Self::Error>;
}

/// One client socket carrying a stream of packet lines.
///
/// Sending and receiving take `&self`, so the handler can block in
/// [`recv`](Connection::recv) while game tasks push state updates.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Writes `data` as one line, appending the `\n` terminator.
    ///
    /// `data` must not contain `\n` itself.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Reads the next line with its terminator removed.
    ///
    /// Returns `Ok(None)` once the peer has closed the socket. A line
    /// longer than [`MAX_LINE_LEN`] is skipped and reported as an error;
    /// the following call starts on the next line.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Shuts down the write side so the client sees end of stream.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Returns the identifier assigned at accept time.
    fn id(&self) -> ConnectionId;

    /// Returns the client's socket address, used in logs.
    fn peer_addr(&self) -> SocketAddr;
}
