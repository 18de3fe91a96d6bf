//! Chat transports
//!
//! A transport delivers replies to one chat platform. Replies leave the state
//! machine as Markdown-flavoured text; `prepare` adapts the markup for the
//! platform and splits it under the platform's message size limit.

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

mod console;
mod telegram;
mod whatsapp;

pub use console::ConsoleTransport;
pub use telegram::{TelegramTransport, format_html, parse_update};
pub use whatsapp::{WhatsAppTransport, parse_webhook};

use crate::bot::{Menu, Reply};
use crate::render::Document;
use crate::text::{RichFormat, split_for_transport};

/// Delivery failures
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected API response: {0}")]
    InvalidResponse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One platform message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Text already in platform markup and within the size limit
    Text { body: String, markup: RichFormat },
    Menu(Menu),
    Document(Document),
}

/// A chat platform that can deliver outbound messages
#[async_trait]
pub trait Transport: Send + Sync {
    fn name(&self) -> &'static str;

    /// Maximum characters per text message
    fn text_limit(&self) -> usize;

    /// Markup the platform renders
    fn rich_format(&self) -> RichFormat;

    /// Adapt Markdown-flavoured text to the platform markup
    fn format_text(&self, text: &str) -> String {
        text.to_string()
    }

    async fn send(&self, recipient: &str, message: Outbound) -> Result<(), TransportError>;
}

/// Turn one reply into the platform messages that carry it
pub fn prepare(transport: &dyn Transport, reply: Reply) -> Vec<Outbound> {
    match reply {
        Reply::Text(text) => {
            let markup = transport.rich_format();
            let formatted = transport.format_text(&text);
            let chunks = split_for_transport(&formatted, transport.text_limit(), markup);
            debug!(transport = transport.name(), chunks = chunks.len(), "prepare: text");
            chunks
                .into_iter()
                .map(|body| Outbound::Text { body, markup })
                .collect()
        }
        Reply::Menu(menu) => vec![Outbound::Menu(menu)],
        Reply::Document(document) => vec![Outbound::Document(document)],
    }
}

/// Truncate to at most `max` characters
pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
