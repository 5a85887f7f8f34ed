//! Codec trait and the text codec used on the wire.
//!
//! A "codec" (coder/decoder) converts between [`Packet`]s and the raw
//! bytes of one frame. Framing itself (where one frame ends and the next
//! begins) is the transport's job; the codec only sees a single frame.
//!
//! The server is generic over [`Codec`], so a binary codec can be added
//! later without touching the connection handler.

use crate::{Packet, ProtocolError};

/// Separator between the packet name and its items.
pub const ITEM_SEPARATOR: char = ';';

/// A codec that turns packets into frame bytes and back.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection task for the lifetime of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a packet into the bytes of one frame.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidMessage`] if the packet cannot be
    /// represented (e.g. an item contains the separator).
    fn encode(&self, packet: &Packet) -> Result<Vec<u8>, ProtocolError>;

    /// Parses the bytes of one frame into a packet.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] for non-UTF-8 input and
    /// [`ProtocolError::InvalidMessage`] for frames without a name.
    fn decode(&self, data: &[u8]) -> Result<Packet, ProtocolError>;
}

// ---------------------------------------------------------------------------
// TextCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] for the human-readable `name;item;item` format.
///
/// ```rust
/// use pong_protocol::{Codec, Packet, TextCodec};
///
/// let codec = TextCodec;
/// let bytes = codec.encode(&Packet::new("joined").item("left")).unwrap();
/// assert_eq!(bytes, b"joined;left");
///
/// let packet = codec.decode(b"login;alice").unwrap();
/// assert_eq!(packet.name(), "login");
/// assert_eq!(packet.get(0), Some("alice"));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TextCodec;

impl Codec for TextCodec {
    fn encode(&self, packet: &Packet) -> Result<Vec<u8>, ProtocolError> {
        if packet.name().is_empty() || !is_plain(packet.name()) {
            return Err(ProtocolError::InvalidMessage(format!(
                "invalid packet name {:?}",
                packet.name()
            )));
        }
        if let Some(item) = packet.items().iter().find(|item| !is_plain(item)) {
            return Err(ProtocolError::InvalidMessage(format!(
                "item {item:?} of packet {} contains a reserved character",
                packet.name()
            )));
        }
        Ok(packet.to_string().into_bytes())
    }

    fn decode(&self, data: &[u8]) -> Result<Packet, ProtocolError> {
        let text = std::str::from_utf8(data)?;
        let text = text.strip_suffix('\r').unwrap_or(text);

        let mut parts = text.split(ITEM_SEPARATOR);
        let name = parts.next().unwrap_or_default().trim();
        if name.is_empty() {
            return Err(ProtocolError::InvalidMessage(
                "packet without a name".into(),
            ));
        }

        Ok(Packet::with_items(name, parts.map(str::to_owned)))
    }
}

/// `true` if the text can travel inside a frame unescaped.
fn is_plain(text: &str) -> bool {
    !text.contains([ITEM_SEPARATOR, '\r', '\n'])
}
