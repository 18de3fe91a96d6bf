//! Conversation sessions
//!
//! `SessionManager` owns the sessionstore and processes commands via channels.
//! `IdentityLocks` serializes the load/compute/save cycle per identity.

mod locks;
mod manager;
mod messages;
mod model;

pub use locks::IdentityLocks;
pub use manager::SessionManager;
pub use messages::{SessionCommand, SessionError, SessionResponse};
pub use model::{ConversationState, Session, SessionData, SessionMode};
