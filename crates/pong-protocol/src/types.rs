//! Core protocol types for the pong wire format.
//!
//! Everything that travels on the wire is a [`Packet`]: a name followed
//! by an ordered list of text items. The order of the items is part of
//! the protocol, so clients read them by position, not by key.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{ProtocolError, ITEM_SEPARATOR};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a player.
///
/// This is a "newtype wrapper" around `u64`, so a `GameId` can never be
/// passed where a `PlayerId` is expected. The server assigns one per
/// accepted connection.
///
/// `#[serde(transparent)]` serializes `PlayerId(42)` as plain `42`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// A unique identifier for a game (one match between two players).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(pub u64);

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "G-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Packet
// ---------------------------------------------------------------------------

/// A named packet with ordered text items.
///
/// ```text
/// ball_hit;15230;left;-42;30;450
/// ^^^^^^^^ ^^^^^^^^^^^^^^^^^^^^^
///   name        items (in order)
/// ```
///
/// Packets are built with [`Packet::new`] and [`Packet::item`], or from
/// an itemized value with [`Packet::with_items`]:
///
/// ```rust
/// use pong_protocol::Packet;
///
/// let packet = Packet::new("new_round").item(3).item(1);
/// assert_eq!(packet.name(), "new_round");
/// assert_eq!(packet.items(), ["3", "1"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    name: String,
    items: Vec<String>,
}

impl Packet {
    /// Creates a packet with no items.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: Vec::new(),
        }
    }

    /// Creates a packet from a name and an already itemized payload.
    pub fn with_items<I>(name: impl Into<String>, items: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            name: name.into(),
            items: items.into_iter().collect(),
        }
    }

    /// Appends an item and returns the packet (builder style).
    pub fn item(mut self, item: impl ToString) -> Self {
        self.push(item);
        self
    }

    /// Appends an item.
    pub fn push(&mut self, item: impl ToString) {
        self.items.push(item.to_string());
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    /// Returns the item at `index`, if present.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.items.get(index).map(String::as_str)
    }

    /// Parses the item at `index` into `T`.
    ///
    /// # Errors
    /// [`ProtocolError::InvalidMessage`] if the item is missing or does
    /// not parse.
    pub fn parse<T: FromStr>(&self, index: usize) -> Result<T, ProtocolError> {
        let raw = self.get(index).ok_or_else(|| {
            ProtocolError::InvalidMessage(format!(
                "packet {} is missing item {index}",
                self.name
            ))
        })?;
        raw.parse().map_err(|_| {
            ProtocolError::InvalidMessage(format!(
                "packet {} has malformed item {index}: {raw:?}",
                self.name
            ))
        })
    }

    /// Fails unless the packet carries exactly `count` items.
    pub fn expect_items(&self, count: usize) -> Result<(), ProtocolError> {
        if self.items.len() == count {
            Ok(())
        } else {
            Err(ProtocolError::InvalidMessage(format!(
                "packet {} expects {count} items, got {}",
                self.name,
                self.items.len()
            )))
        }
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for item in &self.items {
            write!(f, "{ITEM_SEPARATOR}{item}")?;
        }
        Ok(())
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&PlayerId(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn test_player_id_display() {
        assert_eq!(PlayerId(7).to_string(), "P-7");
    }

    #[test]
    fn test_game_id_display() {
        assert_eq!(GameId(3).to_string(), "G-3");
    }

    #[test]
    fn test_packet_builder_keeps_item_order() {
        let packet = Packet::new("ball_hit").item(100).item("left").item(-5);
        assert_eq!(packet.items(), ["100", "left", "-5"]);
    }

    #[test]
    fn test_packet_display_joins_with_separator() {
        let packet = Packet::new("new_round").item(0).item(0);
        assert_eq!(packet.to_string(), "new_round;0;0");
        assert_eq!(Packet::new("left").to_string(), "left");
    }

    #[test]
    fn test_packet_parse_item() {
        let packet = Packet::new("update_state").item(1500).item(-20);
        assert_eq!(packet.parse::<i64>(0).unwrap(), 1500);
        assert_eq!(packet.parse::<i32>(1).unwrap(), -20);
    }

    #[test]
    fn test_packet_parse_missing_item_is_error() {
        let packet = Packet::new("login");
        let err = packet.parse::<String>(0).unwrap_err();
        assert!(err.to_string().contains("missing item 0"));
    }

    #[test]
    fn test_packet_parse_malformed_item_is_error() {
        let packet = Packet::new("update_state").item("soon");
        assert!(packet.parse::<i64>(0).is_err());
    }

    #[test]
    fn test_expect_items() {
        let packet = Packet::new("ready");
        assert!(packet.expect_items(0).is_ok());
        assert!(packet.expect_items(1).is_err());
    }
}
