//! Telegram Bot API transport and update parsing

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::{Outbound, Transport, TransportError};
use crate::bot::{InboundEvent, Menu};
use crate::config::TelegramConfig;
use crate::render::Document;
use crate::text::RichFormat;

/// Telegram chat ids are namespaced so they never collide with phone numbers
const IDENTITY_PREFIX: &str = "tg:";

static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```\n?(.*?)\n?```").expect("valid fence regex"));
static BOLD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*([^*\n]+)\*").expect("valid bold regex"));

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Convert Markdown-flavoured text to Telegram HTML
///
/// Fenced blocks become `<pre>`, `*bold*` becomes `<b>` outside them, and
/// everything else is escaped.
pub fn format_html(text: &str) -> String {
    let escaped = escape_html(text);
    let bold = |s: &str| BOLD_RE.replace_all(s, "<b>$1</b>").into_owned();

    let mut out = String::with_capacity(escaped.len());
    let mut last = 0;
    for caps in FENCE_RE.captures_iter(&escaped) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        out.push_str(&bold(&escaped[last..whole.start()]));
        out.push_str("<pre>");
        out.push_str(inner.as_str());
        out.push_str("</pre>");
        last = whole.end();
    }
    out.push_str(&bold(&escaped[last..]));
    out
}

pub struct TelegramTransport {
    http: Client,
    api_url: String,
    token: String,
    limit: usize,
}

impl TelegramTransport {
    pub fn new(config: &TelegramConfig, token: String) -> Self {
        debug!(api_url = %config.api_url, "TelegramTransport::new: called");
        Self {
            http: Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token,
            limit: config.message_limit,
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, self.token, method)
    }

    async fn check(response: reqwest::Response) -> Result<(), TransportError> {
        let status = response.status().as_u16();
        let body: Value = response.json().await?;
        if body.get("ok").and_then(Value::as_bool) != Some(true) {
            let message = body
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            debug!(%status, %message, "check: API error");
            return Err(TransportError::Api { status, message });
        }
        Ok(())
    }

    async fn call(&self, method: &str, payload: Value) -> Result<(), TransportError> {
        debug!(%method, "call: called");
        let response = self.http.post(self.method_url(method)).json(&payload).send().await?;
        Self::check(response).await
    }

    async fn send_document(&self, chat_id: &str, document: Document) -> Result<(), TransportError> {
        debug!(%chat_id, file = %document.file_name, "send_document: called");
        let part = Part::bytes(document.bytes)
            .file_name(document.file_name)
            .mime_str(&document.mime_type)?;
        let mut form = Form::new().text("chat_id", chat_id.to_string()).part("document", part);
        if let Some(caption) = document.caption {
            form = form.text("caption", caption);
        }

        let response = self
            .http
            .post(self.method_url("sendDocument"))
            .multipart(form)
            .send()
            .await?;
        Self::check(response).await
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    fn name(&self) -> &'static str {
        "telegram"
    }

    fn text_limit(&self) -> usize {
        self.limit
    }

    fn rich_format(&self) -> RichFormat {
        RichFormat::Html
    }

    fn format_text(&self, text: &str) -> String {
        format_html(text)
    }

    async fn send(&self, recipient: &str, message: Outbound) -> Result<(), TransportError> {
        let chat_id = recipient.strip_prefix(IDENTITY_PREFIX).unwrap_or(recipient);
        debug!(%chat_id, "TelegramTransport::send: called");
        match message {
            Outbound::Text { body, .. } => self.call("sendMessage", text_payload(chat_id, &body)).await,
            Outbound::Menu(menu) => self.call("sendMessage", menu_payload(chat_id, &menu)).await,
            Outbound::Document(document) => self.send_document(chat_id, document).await,
        }
    }
}

pub(crate) fn text_payload(chat_id: &str, html: &str) -> Value {
    json!({
        "chat_id": chat_id,
        "text": html,
        "parse_mode": "HTML",
    })
}

/// One inline keyboard row per option
pub(crate) fn menu_payload(chat_id: &str, menu: &Menu) -> Value {
    let keyboard: Vec<Value> = menu
        .options
        .iter()
        .map(|o| json!([{ "text": o.title, "callback_data": o.id }]))
        .collect();
    json!({
        "chat_id": chat_id,
        "text": format_html(&menu.body),
        "parse_mode": "HTML",
        "reply_markup": { "inline_keyboard": keyboard },
    })
}

// Update payload types

#[derive(Debug, Deserialize)]
struct Update {
    message: Option<TgMessage>,
    callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Deserialize)]
struct TgMessage {
    chat: Chat,
    from: Option<User>,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct User {
    first_name: String,
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    from: User,
    message: Option<TgMessage>,
    data: Option<String>,
}

fn identity(chat: &Chat) -> String {
    format!("{IDENTITY_PREFIX}{}", chat.id)
}

/// Extract the inbound event from a Telegram update, if it carries one
pub fn parse_update(payload: &Value) -> Option<InboundEvent> {
    let update: Update = match serde_json::from_value(payload.clone()) {
        Ok(u) => u,
        Err(e) => {
            warn!(error = %e, "Unreadable Telegram update");
            return None;
        }
    };

    if let Some(query) = update.callback_query {
        let message = query.message?;
        let data = query.data?;
        debug!(chat_id = message.chat.id, %data, "parse_update: callback query");
        return Some(InboundEvent::selection(identity(&message.chat), data).with_display_name(query.from.first_name));
    }

    let message = update.message?;
    let text = message.text?;
    debug!(chat_id = message.chat.id, "parse_update: text message");
    let event = InboundEvent::text(identity(&message.chat), text);
    Some(match message.from {
        Some(user) => event.with_display_name(user.first_name),
        None => event,
    })
}
