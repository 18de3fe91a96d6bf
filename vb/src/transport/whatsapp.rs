//! WhatsApp Cloud API transport and webhook parsing

use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::{Outbound, Transport, TransportError, truncate_chars};
use crate::bot::{InboundEvent, Menu};
use crate::config::WhatsAppConfig;
use crate::render::Document;
use crate::text::RichFormat;

/// Menus with at most this many options are sent as reply buttons
const MAX_BUTTONS: usize = 3;
const BUTTON_TITLE_CHARS: usize = 20;
const ROW_TITLE_CHARS: usize = 24;
const ROW_DESCRIPTION_CHARS: usize = 72;
const LIST_BUTTON_CHARS: usize = 20;

pub struct WhatsAppTransport {
    http: Client,
    graph_url: String,
    phone_number_id: String,
    token: String,
    limit: usize,
}

impl WhatsAppTransport {
    pub fn new(config: &WhatsAppConfig, token: String) -> Self {
        debug!(phone_number_id = %config.phone_number_id, "WhatsAppTransport::new: called");
        Self {
            http: Client::new(),
            graph_url: config.graph_url.trim_end_matches('/').to_string(),
            phone_number_id: config.phone_number_id.clone(),
            token,
            limit: config.message_limit,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}/{}", self.graph_url, self.phone_number_id, path)
    }

    async fn check(response: reqwest::Response) -> Result<Value, TransportError> {
        let status = response.status().as_u16();
        if !response.status().is_success() {
            let message = response.text().await.unwrap_or_default();
            debug!(%status, "check: API error");
            return Err(TransportError::Api { status, message });
        }
        Ok(response.json().await?)
    }

    async fn post_message(&self, payload: Value) -> Result<(), TransportError> {
        debug!("post_message: called");
        let response = self
            .http
            .post(self.endpoint("messages"))
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// Upload a document to the media endpoint and return its media id
    async fn upload_media(&self, document: &Document) -> Result<String, TransportError> {
        debug!(file = %document.file_name, bytes = document.bytes.len(), "upload_media: called");
        let part = Part::bytes(document.bytes.clone())
            .file_name(document.file_name.clone())
            .mime_str(&document.mime_type)?;
        let form = Form::new()
            .text("messaging_product", "whatsapp")
            .text("type", document.mime_type.clone())
            .part("file", part);

        let response = self
            .http
            .post(self.endpoint("media"))
            .bearer_auth(&self.token)
            .multipart(form)
            .send()
            .await?;
        let body = Self::check(response).await?;

        body.get("id")
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| TransportError::InvalidResponse(format!("media upload without id: {body}")))
    }
}

#[async_trait]
impl Transport for WhatsAppTransport {
    fn name(&self) -> &'static str {
        "whatsapp"
    }

    fn text_limit(&self) -> usize {
        self.limit
    }

    fn rich_format(&self) -> RichFormat {
        RichFormat::Markdown
    }

    async fn send(&self, recipient: &str, message: Outbound) -> Result<(), TransportError> {
        debug!(%recipient, "WhatsAppTransport::send: called");
        match message {
            Outbound::Text { body, .. } => self.post_message(text_payload(recipient, &body)).await,
            Outbound::Menu(menu) => self.post_message(menu_payload(recipient, &menu)).await,
            Outbound::Document(document) => {
                let media_id = self.upload_media(&document).await?;
                self.post_message(document_payload(recipient, &media_id, &document))
                    .await
            }
        }
    }
}

pub(crate) fn text_payload(to: &str, body: &str) -> Value {
    json!({
        "messaging_product": "whatsapp",
        "to": to,
        "type": "text",
        "text": { "body": body },
    })
}

/// Reply buttons for short menus, a list otherwise
pub(crate) fn menu_payload(to: &str, menu: &Menu) -> Value {
    let interactive = if menu.options.len() <= MAX_BUTTONS {
        let buttons: Vec<Value> = menu
            .options
            .iter()
            .map(|o| {
                json!({
                    "type": "reply",
                    "reply": { "id": o.id, "title": truncate_chars(&o.title, BUTTON_TITLE_CHARS) },
                })
            })
            .collect();
        json!({
            "type": "button",
            "body": { "text": menu.body },
            "action": { "buttons": buttons },
        })
    } else {
        let rows: Vec<Value> = menu
            .options
            .iter()
            .map(|o| {
                let mut row = json!({ "id": o.id, "title": truncate_chars(&o.title, ROW_TITLE_CHARS) });
                if let Some(description) = &o.description {
                    row["description"] = json!(truncate_chars(description, ROW_DESCRIPTION_CHARS));
                }
                row
            })
            .collect();
        json!({
            "type": "list",
            "body": { "text": menu.body },
            "action": {
                "button": truncate_chars(&menu.button, LIST_BUTTON_CHARS),
                "sections": [{ "title": "Opções", "rows": rows }],
            },
        })
    };

    json!({
        "messaging_product": "whatsapp",
        "to": to,
        "type": "interactive",
        "interactive": interactive,
    })
}

pub(crate) fn document_payload(to: &str, media_id: &str, document: &Document) -> Value {
    let mut doc = json!({ "id": media_id, "filename": document.file_name });
    if let Some(caption) = &document.caption {
        doc["caption"] = json!(caption);
    }
    json!({
        "messaging_product": "whatsapp",
        "to": to,
        "type": "document",
        "document": doc,
    })
}

// Webhook payload types

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WebhookPayload {
    entry: Vec<WebhookEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WebhookEntry {
    changes: Vec<WebhookChange>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WebhookChange {
    value: ChangeValue,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChangeValue {
    contacts: Vec<Contact>,
    messages: Vec<WebhookMessage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Contact {
    wa_id: Option<String>,
    profile: Option<ContactProfile>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ContactProfile {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WebhookMessage {
    from: String,
    #[serde(rename = "type")]
    kind: String,
    text: Option<TextBody>,
    interactive: Option<Interactive>,
    button: Option<ButtonBody>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TextBody {
    body: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Interactive {
    button_reply: Option<ReplyId>,
    list_reply: Option<ReplyId>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ReplyId {
    id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ButtonBody {
    payload: String,
}

/// Extract inbound events from a WhatsApp webhook body
///
/// Status updates and unsupported message types are skipped.
pub fn parse_webhook(payload: &Value) -> Vec<InboundEvent> {
    let parsed: WebhookPayload = match serde_json::from_value(payload.clone()) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "Unreadable WhatsApp webhook payload");
            return Vec::new();
        }
    };

    let mut events = Vec::new();
    for value in parsed.entry.into_iter().flat_map(|e| e.changes).map(|c| c.value) {
        for message in value.messages {
            if message.from.is_empty() {
                continue;
            }
            let name = value
                .contacts
                .iter()
                .find(|c| c.wa_id.as_deref().is_none_or(|id| id == message.from))
                .and_then(|c| c.profile.as_ref())
                .and_then(|p| p.name.clone());

            let event = match message.kind.as_str() {
                "text" => message.text.map(|t| InboundEvent::text(&message.from, t.body)),
                "interactive" => message
                    .interactive
                    .and_then(|i| i.button_reply.or(i.list_reply))
                    .map(|r| InboundEvent::selection(&message.from, r.id)),
                "button" => message
                    .button
                    .map(|b| InboundEvent::selection(&message.from, b.payload)),
                other => {
                    debug!(kind = %other, "parse_webhook: unsupported message type");
                    None
                }
            };

            if let Some(event) = event {
                events.push(match &name {
                    Some(n) => event.with_display_name(n.clone()),
                    None => event,
                });
            }
        }
    }

    debug!(event_count = events.len(), "parse_webhook: done");
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::MenuOption;
    use crate::bot::replies::{main_menu, post_itinerary_menu};

    #[test]
    fn test_text_payload() {
        let payload = text_payload("5511999", "Olá");
        assert_eq!(payload["to"], "5511999");
        assert_eq!(payload["type"], "text");
        assert_eq!(payload["text"]["body"], "Olá");
    }

    #[test]
    fn test_short_menu_uses_buttons() {
        let payload = menu_payload("5511999", &post_itinerary_menu());
        let interactive = &payload["interactive"];
        assert_eq!(interactive["type"], "button");
        let buttons = interactive["action"]["buttons"].as_array().unwrap();
        assert_eq!(buttons.len(), 3);
        assert_eq!(buttons[0]["reply"]["id"], "gerar_pdf");
    }

    #[test]
    fn test_long_menu_uses_list() {
        let payload = menu_payload("5511999", &main_menu());
        let interactive = &payload["interactive"];
        assert_eq!(interactive["type"], "list");
        let rows = interactive["action"]["sections"][0]["rows"].as_array().unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0]["id"], "menu_planejar");
        assert_eq!(rows[0]["description"], "Criar roteiro personalizado");
        assert_eq!(interactive["action"]["button"], "Ver Opções");
    }

    #[test]
    fn test_titles_truncated() {
        let menu = Menu {
            body: "b".to_string(),
            button: "Opções".to_string(),
            options: vec![MenuOption::new("x", "Um título bem comprido demais para botão")],
        };
        let payload = menu_payload("1", &menu);
        let title = payload["interactive"]["action"]["buttons"][0]["reply"]["title"]
            .as_str()
            .unwrap();
        assert_eq!(title.chars().count(), 20);
    }

    #[test]
    fn test_document_payload() {
        let document = Document {
            file_name: "roteiro_viagem.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
            bytes: Vec::new(),
            caption: Some("Roteiro de Viagem: Roma".to_string()),
        };
        let payload = document_payload("5511999", "media-1", &document);
        assert_eq!(payload["document"]["id"], "media-1");
        assert_eq!(payload["document"]["filename"], "roteiro_viagem.pdf");
        assert_eq!(payload["document"]["caption"], "Roteiro de Viagem: Roma");
    }

    fn webhook(messages: Value) -> Value {
        json!({
            "object": "whatsapp_business_account",
            "entry": [{
                "changes": [{
                    "value": {
                        "contacts": [{ "wa_id": "5511999", "profile": { "name": "Ana" } }],
                        "messages": messages,
                    }
                }]
            }]
        })
    }

    #[test]
    fn test_parse_text_message() {
        let events = parse_webhook(&webhook(json!([
            { "from": "5511999", "type": "text", "text": { "body": "oi" } }
        ])));
        assert_eq!(
            events,
            vec![InboundEvent::text("5511999", "oi").with_display_name("Ana")]
        );
    }

    #[test]
    fn test_parse_interactive_replies() {
        let events = parse_webhook(&webhook(json!([
            { "from": "5511999", "type": "interactive", "interactive": { "type": "button_reply", "button_reply": { "id": "gerar_pdf", "title": "PDF" } } },
            { "from": "5511999", "type": "interactive", "interactive": { "type": "list_reply", "list_reply": { "id": "menu_planejar", "title": "Planejar" } } },
            { "from": "5511999", "type": "button", "button": { "payload": "voltar_menu", "text": "Voltar" } },
        ])));
        let ids: Vec<_> = events
            .iter()
            .map(|e| match e {
                InboundEvent::Selection { option_id, .. } => option_id.as_str(),
                other => panic!("expected selection, got {other:?}"),
            })
            .collect();
        assert_eq!(ids, vec!["gerar_pdf", "menu_planejar", "voltar_menu"]);
    }

    #[test]
    fn test_parse_skips_statuses_and_media() {
        let statuses = json!({
            "entry": [{ "changes": [{ "value": { "statuses": [{ "id": "wamid", "status": "read" }] } }] }]
        });
        assert!(parse_webhook(&statuses).is_empty());

        let image = webhook(json!([{ "from": "5511999", "type": "image", "image": { "id": "1" } }]));
        assert!(parse_webhook(&image).is_empty());

        assert!(parse_webhook(&json!("garbage")).is_empty());
    }

    #[test]
    fn test_parse_without_contact_name() {
        let payload = json!({
            "entry": [{ "changes": [{ "value": {
                "messages": [{ "from": "5511888", "type": "text", "text": { "body": "menu" } }]
            } }] }]
        });
        let events = parse_webhook(&payload);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].display_name(), "Viajante");
    }
}
