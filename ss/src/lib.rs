//! SessionStore - SQLite persistence for conversation sessions and traveller profiles
//!
//! Three tables live in a single database file:
//!
//! ```text
//! sessions(identity PK, state, data, mode, updated_at)
//! profiles(identity PK, name, age, companions, travel_style, food_type, interests)
//! itineraries(id PK, identity, destination, dates, budget, itinerary, created_at)
//! ```
//!
//! Session rows are stored opaquely: the state tag and the JSON data blob are
//! decoded by the caller, which decides how to treat malformed rows. Profile
//! writes go through a fixed allow-list of columns. Itineraries are append-only
//! history and outlive the session that produced them.
//!
//! # Example
//!
//! ```ignore
//! use sessionstore::{ProfileField, SessionRecord, Store};
//!
//! let mut store = Store::open(".vexusbot")?;
//! store.put_session(&SessionRecord::new("5511999", Some("AWAITING_DATES".into()), "{}".into(), None))?;
//! store.set_profile("5511999", ProfileField::Name, "Ana")?;
//! ```

pub mod cli;
mod error;
mod profile;
mod store;

pub use error::StoreError;
pub use profile::{Profile, ProfileField};
pub use store::{ItineraryRecord, SessionRecord, Store, Traveller};

/// Database file name inside the store directory
pub const DB_FILE: &str = "vexusbot.db";
