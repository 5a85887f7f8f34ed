//! Wire protocol for the pong server.
//!
//! This crate defines the "language" that clients and the server speak:
//!
//! - **Types** ([`Packet`], [`PlayerId`], [`GameId`]): a packet is a name
//!   followed by an ordered list of text items.
//! - **Codec** ([`Codec`] trait, [`TextCodec`]): how packets are
//!   converted to/from the bytes of a single frame.
//! - **Errors** ([`ProtocolError`]): what can go wrong during
//!   encoding/decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (framed bytes) and the
//! server (player requests). It doesn't know about connections or games,
//! it only knows how packets look on the wire.
//!
//! ```text
//! Transport (lines) → Protocol (Packet) → Server (requests) → Game
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Codec, TextCodec, ITEM_SEPARATOR};
pub use error::ProtocolError;
pub use types::{GameId, Packet, PlayerId};
