//! SessionManager - actor that owns the sessionstore

use std::path::Path;

use sessionstore::{ItineraryRecord, Profile, ProfileField, Store, Traveller};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::messages::{SessionCommand, SessionError, SessionResponse};
use super::Session;

/// Handle to send commands to the SessionManager
#[derive(Clone)]
pub struct SessionManager {
    tx: mpsc::Sender<SessionCommand>,
}

impl SessionManager {
    /// Spawn a new SessionManager actor over the store in `dir`
    pub fn spawn(dir: impl AsRef<Path>) -> eyre::Result<Self> {
        debug!(dir = %dir.as_ref().display(), "spawn: called");
        let store = Store::open(dir.as_ref())?;
        Ok(Self::spawn_with(store))
    }

    /// Spawn over an already opened store
    pub fn spawn_with(store: Store) -> Self {
        debug!(path = %store.path().display(), "spawn_with: called");
        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(actor_loop(store, rx));
        info!("SessionManager spawned");
        Self { tx }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<SessionResponse<T>>) -> SessionCommand,
    ) -> SessionResponse<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(build(reply_tx))
            .await
            .map_err(|_| SessionError::ChannelError)?;
        reply_rx.await.map_err(|_| SessionError::ChannelError)?
    }

    /// Load the session for an identity, fresh idle when none is stored
    pub async fn load(&self, identity: &str) -> SessionResponse<Session> {
        debug!(%identity, "load: called");
        self.request(|reply| SessionCommand::Load {
            identity: identity.to_string(),
            reply,
        })
        .await
    }

    /// Overwrite the stored session
    pub async fn save(&self, session: Session) -> SessionResponse<()> {
        debug!(identity = %session.identity, state = %session.state, "save: called");
        self.request(|reply| SessionCommand::Save { session, reply }).await
    }

    /// Remove the stored session; returns whether one existed
    pub async fn clear(&self, identity: &str) -> SessionResponse<bool> {
        debug!(%identity, "clear: called");
        self.request(|reply| SessionCommand::Clear {
            identity: identity.to_string(),
            reply,
        })
        .await
    }

    pub async fn list(&self) -> SessionResponse<Vec<Session>> {
        debug!("list: called");
        self.request(|reply| SessionCommand::List { reply }).await
    }

    pub async fn get_profile(&self, identity: &str) -> SessionResponse<Profile> {
        debug!(%identity, "get_profile: called");
        self.request(|reply| SessionCommand::GetProfile {
            identity: identity.to_string(),
            reply,
        })
        .await
    }

    pub async fn set_profile(&self, identity: &str, field: ProfileField, value: &str) -> SessionResponse<()> {
        debug!(%identity, %field, "set_profile: called");
        self.request(|reply| SessionCommand::SetProfile {
            identity: identity.to_string(),
            field,
            value: value.to_string(),
            reply,
        })
        .await
    }

    /// Set a profile field by column name
    ///
    /// Names outside the allow-list fail with `SessionError::InvalidField`.
    pub async fn set_profile_named(&self, identity: &str, field: &str, value: &str) -> SessionResponse<()> {
        debug!(%identity, %field, "set_profile_named: called");
        self.request(|reply| SessionCommand::SetProfileNamed {
            identity: identity.to_string(),
            field: field.to_string(),
            value: value.to_string(),
            reply,
        })
        .await
    }

    /// Append a generated itinerary to the history; returns its id
    pub async fn record_itinerary(&self, record: ItineraryRecord) -> SessionResponse<i64> {
        debug!(identity = %record.identity, "record_itinerary: called");
        self.request(|reply| SessionCommand::RecordItinerary { record, reply }).await
    }

    /// Itinerary history of an identity, newest first
    pub async fn itineraries(&self, identity: &str) -> SessionResponse<Vec<ItineraryRecord>> {
        debug!(%identity, "itineraries: called");
        self.request(|reply| SessionCommand::Itineraries {
            identity: identity.to_string(),
            reply,
        })
        .await
    }

    pub async fn travellers(&self) -> SessionResponse<Vec<Traveller>> {
        debug!("travellers: called");
        self.request(|reply| SessionCommand::Travellers { reply }).await
    }

    /// Shutdown the SessionManager
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        debug!("shutdown: called");
        self.tx
            .send(SessionCommand::Shutdown)
            .await
            .map_err(|_| SessionError::ChannelError)
    }
}

fn load_session(store: &Store, identity: &str) -> SessionResponse<Session> {
    let session = match store.get_session(identity)? {
        Some(record) => Session::from_record(&record),
        None => {
            debug!(%identity, "load_session: no stored session");
            Session::new(identity)
        }
    };
    Ok(session)
}

fn save_session(store: &mut Store, session: &Session) -> SessionResponse<()> {
    let record = session.to_record().map_err(|e| SessionError::Encoding(e.to_string()))?;
    store.put_session(&record)?;
    Ok(())
}

fn list_sessions(store: &Store) -> SessionResponse<Vec<Session>> {
    Ok(store.list_sessions()?.iter().map(Session::from_record).collect())
}

/// The actor loop that owns the Store and processes commands
async fn actor_loop(mut store: Store, mut rx: mpsc::Receiver<SessionCommand>) {
    debug!("SessionManager actor started");

    while let Some(cmd) = rx.recv().await {
        match cmd {
            SessionCommand::Load { identity, reply } => {
                debug!(%identity, "actor_loop: Load command");
                let _ = reply.send(load_session(&store, &identity));
            }

            SessionCommand::Save { session, reply } => {
                debug!(identity = %session.identity, "actor_loop: Save command");
                let _ = reply.send(save_session(&mut store, &session));
            }

            SessionCommand::Clear { identity, reply } => {
                debug!(%identity, "actor_loop: Clear command");
                let _ = reply.send(store.delete_session(&identity).map_err(SessionError::from));
            }

            SessionCommand::List { reply } => {
                debug!("actor_loop: List command");
                let _ = reply.send(list_sessions(&store));
            }

            SessionCommand::GetProfile { identity, reply } => {
                debug!(%identity, "actor_loop: GetProfile command");
                let _ = reply.send(store.get_profile(&identity).map_err(SessionError::from));
            }

            SessionCommand::SetProfile {
                identity,
                field,
                value,
                reply,
            } => {
                debug!(%identity, %field, "actor_loop: SetProfile command");
                let _ = reply.send(
                    store
                        .set_profile(&identity, field, &value)
                        .map_err(SessionError::from),
                );
            }

            SessionCommand::SetProfileNamed {
                identity,
                field,
                value,
                reply,
            } => {
                debug!(%identity, %field, "actor_loop: SetProfileNamed command");
                let result = store
                    .set_profile_field(&identity, &field, &value)
                    .map_err(SessionError::from);
                if let Err(SessionError::InvalidField(name)) = &result {
                    warn!(%identity, field = %name, "Rejected write to unknown profile field");
                }
                let _ = reply.send(result);
            }

            SessionCommand::RecordItinerary { record, reply } => {
                debug!(identity = %record.identity, "actor_loop: RecordItinerary command");
                let _ = reply.send(store.add_itinerary(&record).map_err(SessionError::from));
            }

            SessionCommand::Itineraries { identity, reply } => {
                debug!(%identity, "actor_loop: Itineraries command");
                let _ = reply.send(store.list_itineraries(&identity).map_err(SessionError::from));
            }

            SessionCommand::Travellers { reply } => {
                debug!("actor_loop: Travellers command");
                let _ = reply.send(store.travellers().map_err(SessionError::from));
            }

            SessionCommand::Shutdown => {
                info!("SessionManager shutting down");
                break;
            }
        }
    }

    debug!("SessionManager actor stopped");
}
