//! Session manager messages
//!
//! Commands and responses for the actor pattern.

use sessionstore::{ItineraryRecord, Profile, ProfileField, Traveller};
use thiserror::Error;
use tokio::sync::oneshot;

use super::Session;

/// Errors from session operations
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Invalid profile field: {0}")]
    InvalidField(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Channel error")]
    ChannelError,
}

impl From<sessionstore::StoreError> for SessionError {
    fn from(e: sessionstore::StoreError) -> Self {
        match e {
            sessionstore::StoreError::InvalidField(name) => Self::InvalidField(name),
            other => Self::Store(other.to_string()),
        }
    }
}

/// Response from session operations
pub type SessionResponse<T> = Result<T, SessionError>;

/// Commands sent to the SessionManager actor
#[derive(Debug)]
pub enum SessionCommand {
    Load {
        identity: String,
        reply: oneshot::Sender<SessionResponse<Session>>,
    },
    Save {
        session: Session,
        reply: oneshot::Sender<SessionResponse<()>>,
    },
    Clear {
        identity: String,
        reply: oneshot::Sender<SessionResponse<bool>>,
    },
    List {
        reply: oneshot::Sender<SessionResponse<Vec<Session>>>,
    },

    // Profile operations
    GetProfile {
        identity: String,
        reply: oneshot::Sender<SessionResponse<Profile>>,
    },
    SetProfile {
        identity: String,
        field: ProfileField,
        value: String,
        reply: oneshot::Sender<SessionResponse<()>>,
    },
    SetProfileNamed {
        identity: String,
        field: String,
        value: String,
        reply: oneshot::Sender<SessionResponse<()>>,
    },

    // Itinerary history
    RecordItinerary {
        record: ItineraryRecord,
        reply: oneshot::Sender<SessionResponse<i64>>,
    },
    Itineraries {
        identity: String,
        reply: oneshot::Sender<SessionResponse<Vec<ItineraryRecord>>>,
    },
    Travellers {
        reply: oneshot::Sender<SessionResponse<Vec<Traveller>>>,
    },

    // Shutdown
    Shutdown,
}
