//! Nickname rules.
//!
//! The nickname is the only identity a player has: it is shown to the
//! opponent and in the operator shell. It also travels inside packets, so
//! it must never contain protocol separators.

use crate::SessionError;

/// Checks a nickname against the server rules.
///
/// A valid nickname is 1 to `max_len` characters long and consists of
/// ASCII letters, digits, `_` and `-`.
///
/// ```rust
/// use pong_session::validate_nickname;
///
/// assert!(validate_nickname("alice_99", 16).is_ok());
/// assert!(validate_nickname("", 16).is_err());
/// assert!(validate_nickname("bob;joined", 16).is_err());
/// ```
pub fn validate_nickname(nickname: &str, max_len: usize) -> Result<(), SessionError> {
    if nickname.is_empty() {
        return Err(SessionError::InvalidNickname("nickname is empty".into()));
    }
    if nickname.chars().count() > max_len {
        return Err(SessionError::InvalidNickname(format!(
            "nickname is longer than {max_len} characters"
        )));
    }
    if let Some(c) = nickname
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
    {
        return Err(SessionError::InvalidNickname(format!(
            "nickname contains {c:?}"
        )));
    }
    Ok(())
}
