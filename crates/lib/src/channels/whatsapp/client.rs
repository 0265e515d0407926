//! WhatsApp Cloud API client: media lookup, read receipts and message sends.
//!
//! All sends POST to `{api_base}/{phone_number_id}/messages` with bearer auth.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::normalize::MediaResolver;

/// Outbound send operations the formatter and handoff gate rely on.
#[async_trait]
pub trait WhatsAppSender: Send + Sync {
    /// Plain text message.
    async fn send_text(&self, to: &str, text: &str) -> Result<(), WhatsAppError>;
    /// Image by public URL.
    async fn send_image(&self, to: &str, url: &str) -> Result<(), WhatsAppError>;
    /// Interactive reply-button message; `interactive` is sent verbatim.
    async fn send_reply_button(&self, to: &str, interactive: &Value) -> Result<(), WhatsAppError>;
    /// Interactive list message built from `{body, action, header?, footer?}`.
    async fn send_list(&self, to: &str, list: &Value) -> Result<(), WhatsAppError>;
    /// Pre-approved template message.
    async fn send_template(&self, to: &str, template: &TemplateMessage) -> Result<(), WhatsAppError>;
    /// Read receipt for an inbound message.
    async fn mark_read(&self, message_id: &str) -> Result<(), WhatsAppError>;
}

#[derive(Debug, thiserror::Error)]
pub enum WhatsAppError {
    #[error("whatsapp request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("whatsapp api error: {0}")]
    Api(String),
}

/// Named template with its parameter groups, ready to send.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateMessage {
    pub name: String,
    pub header_params: Option<Vec<Value>>,
    pub body_params: Option<Vec<Value>>,
    pub button_params: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct MediaInfo {
    #[serde(default)]
    url: String,
}

#[derive(Clone)]
pub struct WhatsAppClient {
    api_base: String,
    token: String,
    phone_number_id: String,
    template_language: String,
    client: reqwest::Client,
}

impl WhatsAppClient {
    pub fn new(
        api_base: impl Into<String>,
        token: impl Into<String>,
        phone_number_id: impl Into<String>,
    ) -> Self {
        Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
            phone_number_id: phone_number_id.into(),
            template_language: "en_US".to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_template_language(mut self, language: impl Into<String>) -> Self {
        self.template_language = language.into();
        self
    }

    fn messages_url(&self) -> String {
        format!("{}/{}/messages", self.api_base, self.phone_number_id)
    }

    /// GET `{api_base}/{media_id}`: temporary download URL for a media object.
    pub async fn media_url(&self, media_id: &str) -> Result<String, WhatsAppError> {
        let url = format!("{}/{}", self.api_base, media_id);
        let res = self.client.get(&url).bearer_auth(&self.token).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(WhatsAppError::Api(format!("{} {}", status, body)));
        }
        let info: MediaInfo = res.json().await?;
        Ok(info.url)
    }

    async fn post_message(&self, body: &Value) -> Result<(), WhatsAppError> {
        let res = self
            .client
            .post(self.messages_url())
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(WhatsAppError::Api(format!("{} {}", status, body)));
        }
        Ok(())
    }
}

#[async_trait]
impl WhatsAppSender for WhatsAppClient {
    async fn send_text(&self, to: &str, text: &str) -> Result<(), WhatsAppError> {
        self.post_message(&text_message_body(to, text)).await
    }

    async fn send_image(&self, to: &str, url: &str) -> Result<(), WhatsAppError> {
        self.post_message(&image_message_body(to, url)).await
    }

    async fn send_reply_button(&self, to: &str, interactive: &Value) -> Result<(), WhatsAppError> {
        self.post_message(&interactive_message_body(to, interactive.clone()))
            .await
    }

    async fn send_list(&self, to: &str, list: &Value) -> Result<(), WhatsAppError> {
        self.post_message(&interactive_message_body(to, list_interactive(list)))
            .await
    }

    async fn send_template(&self, to: &str, template: &TemplateMessage) -> Result<(), WhatsAppError> {
        self.post_message(&template_message_body(to, template, &self.template_language))
            .await
    }

    async fn mark_read(&self, message_id: &str) -> Result<(), WhatsAppError> {
        self.post_message(&read_receipt_body(message_id)).await
    }
}

#[async_trait]
impl MediaResolver for WhatsAppClient {
    async fn resolve_media_url(&self, media_id: &str) -> String {
        match self.media_url(media_id).await {
            Ok(url) => url,
            Err(e) => {
                log::warn!("whatsapp media lookup for {} failed: {}", media_id, e);
                String::new()
            }
        }
    }
}

fn envelope(to: &str, kind: &str) -> Value {
    json!({
        "messaging_product": "whatsapp",
        "recipient_type": "individual",
        "to": to,
        "type": kind,
    })
}

pub(crate) fn read_receipt_body(message_id: &str) -> Value {
    json!({
        "messaging_product": "whatsapp",
        "message_id": message_id,
        "status": "read",
    })
}

pub(crate) fn text_message_body(to: &str, text: &str) -> Value {
    let mut body = envelope(to, "text");
    body["text"] = json!({ "preview_url": true, "body": text });
    body
}

pub(crate) fn image_message_body(to: &str, url: &str) -> Value {
    let mut body = envelope(to, "image");
    body["image"] = json!({ "link": url });
    body
}

pub(crate) fn interactive_message_body(to: &str, interactive: Value) -> Value {
    let mut body = envelope(to, "interactive");
    body["interactive"] = interactive;
    body
}

/// Wrap `{body, action, header?, footer?}` into the list interactive object.
pub(crate) fn list_interactive(list: &Value) -> Value {
    let mut interactive = json!({
        "type": "list",
        "body": { "text": list.get("body").cloned().unwrap_or_else(|| json!("")) },
        "action": list.get("action").cloned().unwrap_or_else(|| json!({})),
    });
    if let Some(header) = list.get("header").and_then(|h| h.as_str()) {
        interactive["header"] = json!({ "type": "text", "text": header });
    }
    if let Some(footer) = list.get("footer").and_then(|f| f.as_str()) {
        interactive["footer"] = json!({ "text": footer });
    }
    interactive
}

/// Bare strings become text parameters; objects are already parameters.
fn template_parameter(param: &Value) -> Value {
    match param {
        Value::String(s) => json!({ "type": "text", "text": s }),
        Value::Number(_) | Value::Bool(_) => json!({ "type": "text", "text": param.to_string() }),
        other => other.clone(),
    }
}

pub(crate) fn template_message_body(to: &str, template: &TemplateMessage, language: &str) -> Value {
    let mut components = Vec::new();
    if let Some(ref params) = template.header_params {
        components.push(json!({
            "type": "header",
            "parameters": params.iter().map(template_parameter).collect::<Vec<_>>(),
        }));
    }
    if let Some(ref params) = template.body_params {
        components.push(json!({
            "type": "body",
            "parameters": params.iter().map(template_parameter).collect::<Vec<_>>(),
        }));
    }
    if let Some(ref buttons) = template.button_params {
        components.extend(buttons.iter().cloned());
    }
    let mut body = envelope(to, "template");
    body["template"] = json!({
        "name": template.name,
        "language": { "code": language },
        "components": components,
    });
    body
}
