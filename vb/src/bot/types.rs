//! Events, replies and effects exchanged with the state machine

use sessionstore::ProfileField;
use thiserror::Error;

use crate::render::{Document, DocumentFormat, RenderRequest};
use crate::session::Session;

/// Display name used when the transport does not provide one
pub const DEFAULT_DISPLAY_NAME: &str = "Viajante";

/// One normalized inbound event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Text {
        identity: String,
        body: String,
        display_name: Option<String>,
    },
    Selection {
        identity: String,
        option_id: String,
        display_name: Option<String>,
    },
}

impl InboundEvent {
    pub fn text(identity: impl Into<String>, body: impl Into<String>) -> Self {
        Self::Text {
            identity: identity.into(),
            body: body.into(),
            display_name: None,
        }
    }

    pub fn selection(identity: impl Into<String>, option_id: impl Into<String>) -> Self {
        Self::Selection {
            identity: identity.into(),
            option_id: option_id.into(),
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        let name = Some(name.into());
        match &mut self {
            Self::Text { display_name, .. } | Self::Selection { display_name, .. } => *display_name = name,
        }
        self
    }

    pub fn identity(&self) -> &str {
        match self {
            Self::Text { identity, .. } | Self::Selection { identity, .. } => identity,
        }
    }

    /// Non-blank name provided by the transport
    pub fn known_name(&self) -> Option<&str> {
        let name = match self {
            Self::Text { display_name, .. } | Self::Selection { display_name, .. } => display_name.as_deref(),
        };
        name.map(str::trim).filter(|n| !n.is_empty())
    }

    /// Transport-provided name, or `Viajante`
    pub fn display_name(&self) -> &str {
        self.known_name().unwrap_or(DEFAULT_DISPLAY_NAME)
    }
}

/// One selectable option of a menu
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuOption {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
}

impl MenuOption {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Prompt with selectable options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Menu {
    pub body: String,
    /// Label of the button that opens a list menu
    pub button: String,
    pub options: Vec<MenuOption>,
}

/// Outbound item in presentation order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Markdown-flavoured text (`*bold*`, ``` blocks); the transport adapts it
    Text(String),
    Menu(Menu),
    Document(Document),
}

impl Reply {
    pub fn text(body: impl Into<String>) -> Self {
        Self::Text(body.into())
    }
}

/// Everything the completion service needs for an itinerary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItineraryRequest {
    pub destination: String,
    pub dates: String,
    pub budget: String,
    pub interests: Option<String>,
    pub travel_style: Option<String>,
}

/// Side effect requested by a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Ask the completion service what a non-parsing date reply means
    ClassifyDateReply { destination: String, reply: String },
    /// Answer a question about when to travel
    AnswerTimingQuestion { destination: String, question: String },
    GenerateItinerary(ItineraryRequest),
    /// Retrieval-QA over the travel guide
    AnswerQuestion { question: String },
    Render {
        format: DocumentFormat,
        request: RenderRequest,
    },
}

impl Effect {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ClassifyDateReply { .. } => "classify-date-reply",
            Self::AnswerTimingQuestion { .. } => "answer-timing-question",
            Self::GenerateItinerary(_) => "generate-itinerary",
            Self::AnswerQuestion { .. } => "answer-question",
            Self::Render { .. } => "render",
        }
    }
}

/// Classification of a date reply that did not parse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateReplyKind {
    DateProvided,
    TimingQuestion,
    Undefined,
}

impl DateReplyKind {
    /// Map a `classificacao` label; anything unknown is `Undefined`
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "data_fornecida" => Self::DateProvided,
            "pergunta_sobre_data" => Self::TimingQuestion,
            _ => Self::Undefined,
        }
    }
}

/// Collaborator failure as seen by the state machine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("render failed: {0}")]
    Render(String),
}

/// Result of an executed effect
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    DateReplyClassified { kind: DateReplyKind, reply: String },
    TimingAnswered(Result<String, GenerationError>),
    ItineraryGenerated(Result<String, GenerationError>),
    QuestionAnswered(Result<String, GenerationError>),
    Rendered(Result<Document, GenerationError>),
}

/// Output of one state machine step
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub session: Session,
    pub replies: Vec<Reply>,
    /// Profile writes to apply before persisting the session
    pub profile_updates: Vec<(ProfileField, String)>,
    pub effect: Option<Effect>,
}

impl Transition {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            replies: Vec::new(),
            profile_updates: Vec::new(),
            effect: None,
        }
    }

    pub fn say(mut self, text: impl Into<String>) -> Self {
        self.replies.push(Reply::Text(text.into()));
        self
    }

    pub fn menu(mut self, menu: Menu) -> Self {
        self.replies.push(Reply::Menu(menu));
        self
    }

    pub fn reply(mut self, reply: Reply) -> Self {
        self.replies.push(reply);
        self
    }

    pub fn update_profile(mut self, field: ProfileField, value: impl Into<String>) -> Self {
        self.profile_updates.push((field, value.into()));
        self
    }

    pub fn effect(mut self, effect: Effect) -> Self {
        self.effect = Some(effect);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_defaults() {
        let event = InboundEvent::text("1", "oi");
        assert_eq!(event.display_name(), "Viajante");

        let event = InboundEvent::text("1", "oi").with_display_name("  ");
        assert_eq!(event.display_name(), "Viajante");
        assert!(event.known_name().is_none());

        let event = InboundEvent::selection("1", "menu_planejar").with_display_name("Ana");
        assert_eq!(event.display_name(), "Ana");
        assert_eq!(event.identity(), "1");
    }

    #[test]
    fn test_date_reply_labels() {
        assert_eq!(DateReplyKind::from_label("data_fornecida"), DateReplyKind::DateProvided);
        assert_eq!(DateReplyKind::from_label("pergunta_sobre_data"), DateReplyKind::TimingQuestion);
        assert_eq!(DateReplyKind::from_label("indefinido"), DateReplyKind::Undefined);
        assert_eq!(DateReplyKind::from_label("???"), DateReplyKind::Undefined);
    }
}
