//! Conversation core
//!
//! `machine` maps (session, event) to a `Transition`: the next session, the
//! replies to deliver and at most one side effect. Effects are executed by the
//! engine and their `Outcome` is fed back through `machine::resume`. Neither
//! function performs I/O.

pub mod machine;
pub mod reducer;
pub mod replies;
mod types;

pub use machine::{handle, resume};
pub use types::{
    DEFAULT_DISPLAY_NAME, DateReplyKind, Effect, GenerationError, InboundEvent, ItineraryRequest, Menu,
    MenuOption, Outcome, Reply, Transition,
};
