//! VexusBot - conversational travel planner for chat platforms
//!
//! Users talk to the bot over WhatsApp or Telegram. It collects a destination,
//! a date range and a budget, asks a completion service for an itinerary, and
//! can export the result as a PDF or spreadsheet. Free-form travel questions
//! are answered from a fixed travel guide.
//!
//! # Core Concepts
//!
//! - **Pure state machine**: `bot::handle` and `bot::resume` compute the next
//!   session, the replies and at most one side effect; they never do I/O
//! - **Typed outcomes**: collaborator failures come back as
//!   `Result<T, GenerationError>` and become transitions, never crashes
//! - **Serialized identities**: every event runs load, compute and save under
//!   an identity-scoped lock
//!
//! # Modules
//!
//! - [`text`] - date parsing, JSON recovery, Markdown tables, chunking, intents
//! - [`session`] - session model, store actor and identity locks
//! - [`bot`] - conversation state machine, interest reducer, menus and copy
//! - [`engine`] - runs effects against collaborators and delivers replies
//! - [`llm`] - completion client trait and OpenAI-compatible implementation
//! - [`qa`] - retrieval-augmented answers over the guidestore
//! - [`render`] - PDF and CSV itinerary documents
//! - [`transport`] - WhatsApp, Telegram and console transports
//! - [`server`] - webhook server
//! - [`repl`] - local chat in the terminal
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod bot;
pub mod cli;
pub mod config;
pub mod engine;
pub mod llm;
pub mod prompts;
pub mod qa;
pub mod render;
pub mod repl;
pub mod server;
pub mod session;
pub mod text;
pub mod transport;

// Re-export commonly used types
pub use bot::{Effect, GenerationError, InboundEvent, Outcome, Reply, Transition};
pub use config::Config;
pub use engine::Engine;
pub use llm::{LlmClient, LlmError, create_client};
pub use session::{ConversationState, Session, SessionManager};
