//! Error types for the protocol layer.
//!
//! Each crate in the workspace defines its own error enum. When you see a
//! `ProtocolError`, you know the problem is in framing or parsing a
//! packet, not in networking or in game rules.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The frame was not valid UTF-8 text.
    #[error("decode failed: {0}")]
    Decode(#[from] std::str::Utf8Error),

    /// The packet is invalid at the protocol level.
    ///
    /// Used for frames that decode as text but break the packet rules:
    /// an empty name, an item containing the separator, a missing or
    /// unparsable field.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
