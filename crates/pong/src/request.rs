//! Inbound requests: the packets a client may send.

use pong_game::PlayerState;
use pong_protocol::{Packet, ProtocolError};

/// A parsed client request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// `login;nickname`
    Login(String),
    /// `join_game`
    JoinGame,
    /// `ready`
    Ready,
    /// `update_state;timestamp;position;direction`
    UpdateState(PlayerState),
    /// `restart`
    Restart,
    /// `leave_game`
    LeaveGame,
    /// `ping`
    Ping,
    /// `logout`
    Logout,
}

impl Request {
    /// Interprets a decoded packet.
    ///
    /// # Errors
    /// [`ProtocolError::InvalidMessage`] for unknown names, a wrong item
    /// count, or items that do not parse.
    pub fn parse(packet: &Packet) -> Result<Self, ProtocolError> {
        let request = match packet.name() {
            "login" => {
                packet.expect_items(1)?;
                Self::Login(packet.parse(0)?)
            }
            "update_state" => {
                packet.expect_items(3)?;
                Self::UpdateState(PlayerState::new(
                    packet.parse(0)?,
                    packet.parse(1)?,
                    packet.parse(2)?,
                ))
            }
            name => {
                let request = match name {
                    "join_game" => Self::JoinGame,
                    "ready" => Self::Ready,
                    "restart" => Self::Restart,
                    "leave_game" => Self::LeaveGame,
                    "ping" => Self::Ping,
                    "logout" => Self::Logout,
                    _ => {
                        return Err(ProtocolError::InvalidMessage(format!(
                            "unknown packet {name}"
                        )));
                    }
                };
                packet.expect_items(0)?;
                request
            }
        };
        Ok(request)
    }

    /// Requests an anonymous connection may send.
    pub fn allowed_anonymous(&self) -> bool {
        matches!(self, Self::Login(_) | Self::Ping | Self::Logout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pong_game::PlayerDirection;
    use pong_protocol::{Codec, TextCodec};

    fn parse(line: &str) -> Result<Request, ProtocolError> {
        Request::parse(&TextCodec.decode(line.as_bytes()).unwrap())
    }

    #[test]
    fn test_parse_login() {
        assert_eq!(parse("login;alice").unwrap(), Request::Login("alice".into()));
    }

    #[test]
    fn test_parse_update_state() {
        assert_eq!(
            parse("update_state;1500;-120;down").unwrap(),
            Request::UpdateState(PlayerState::new(1500, -120, PlayerDirection::Down))
        );
    }

    #[test]
    fn test_parse_bare_requests() {
        assert_eq!(parse("join_game").unwrap(), Request::JoinGame);
        assert_eq!(parse("ready").unwrap(), Request::Ready);
        assert_eq!(parse("restart").unwrap(), Request::Restart);
        assert_eq!(parse("leave_game").unwrap(), Request::LeaveGame);
        assert_eq!(parse("ping").unwrap(), Request::Ping);
        assert_eq!(parse("logout").unwrap(), Request::Logout);
    }

    #[test]
    fn test_parse_rejects_wrong_item_count() {
        assert!(parse("login").is_err());
        assert!(parse("login;a;b").is_err());
        assert!(parse("ready;now").is_err());
        assert!(parse("update_state;1;2").is_err());
    }

    #[test]
    fn test_parse_rejects_malformed_items() {
        assert!(parse("update_state;soon;0;up").is_err());
        assert!(parse("update_state;0;0;sideways").is_err());
    }

    #[test]
    fn test_parse_unknown_packet() {
        let err = parse("dance").unwrap_err();
        assert!(err.to_string().contains("unknown packet dance"));
    }

    #[test]
    fn test_allowed_anonymous() {
        assert!(Request::Login("x".into()).allowed_anonymous());
        assert!(Request::Ping.allowed_anonymous());
        assert!(!Request::JoinGame.allowed_anonymous());
        assert!(!Request::Ready.allowed_anonymous());
    }
}
