//! Player session management for the pong server.
//!
//! This crate handles the lifecycle of a connected player:
//!
//! 1. **Identification**: a connection logs in with a nickname
//!    ([`validate_nickname`], [`SessionManager::login`])
//! 2. **Session tracking**: knowing who's connected and whether they
//!    are in a game ([`SessionManager`], [`SessionState`])
//! 3. **Inactivity rules**: how long a quiet connection may live
//!    ([`SessionConfig`], [`Session::inactive_timeout`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Game layer (above)      ← asks sessions for nicknames
//!     ↕
//! Session layer (this crate)
//!     ↕
//! Protocol layer (below)  ← provides PlayerId
//! ```

mod error;
mod manager;
mod nickname;
mod session;

pub use error::SessionError;
pub use manager::SessionManager;
pub use nickname::validate_nickname;
pub use session::{Session, SessionConfig, SessionState};
