//! Prompt Template System
//!
//! Loads and renders `.pmt` (prompt template) files sent to the completion service.
//!
//! Template loading chain:
//! 1. `.vexusbot/prompts/{name}.pmt` (user override)
//! 2. `prompts/{name}.pmt` (repo default)
//! 3. Embedded fallback in code
//!
//! Templates use Handlebars syntax for variable substitution.

pub mod embedded;
mod loader;

pub use loader::{DateClassifyContext, DateQuestionContext, GuideAnswerContext, ItineraryContext, PromptLoader};
