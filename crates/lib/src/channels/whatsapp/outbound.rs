//! Outbound formatter: turns structured bot replies into WhatsApp messages.
//!
//! Long text is split into several messages, interactive fields are trimmed to the Cloud API
//! limits, and a triple-newline preamble in front of an interactive body is sent as plain text
//! first. Sends happen sequentially so the user sees them in order; a failed send is logged and
//! the remaining sends still go out.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::client::{TemplateMessage, WhatsAppSender};
use super::schema::{safely_trim, safely_trim_opt};
use super::split::{split_preamble, split_text_message, DEFAULT_LINE_THRESHOLD};

/// Text reply: one string to split, or messages already split upstream (sent verbatim).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TextBody {
    Parts(Vec<String>),
    Single(String),
}

impl From<&str> for TextBody {
    fn from(s: &str) -> Self {
        TextBody::Single(s.to_string())
    }
}

impl TextBody {
    /// Outbound message texts, in send order.
    pub fn messages(&self) -> Vec<String> {
        match self {
            TextBody::Parts(parts) => parts.clone(),
            TextBody::Single(text) => split_text_message(text, DEFAULT_LINE_THRESHOLD),
        }
    }

    /// Single string; pre-split parts are rejoined with paragraph breaks.
    pub fn into_text(self) -> String {
        match self {
            TextBody::Parts(parts) => parts.join("\n\n\n"),
            TextBody::Single(text) => text,
        }
    }
}

/// Reply button as produced by the engine: `payload` becomes the WhatsApp reply `id`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Button {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub payload: Option<String>,
}

impl Button {
    fn reply(&self, title: String) -> Value {
        json!({
            "type": "reply",
            "reply": { "id": self.payload.clone().unwrap_or_default(), "title": title },
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ListRow {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub payload: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ListSection {
    #[serde(default)]
    pub section_title: Option<String>,
    #[serde(default, alias = "rows")]
    pub buttons: Vec<ListRow>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InteractiveList {
    #[serde(default)]
    pub header_text: Option<String>,
    #[serde(default)]
    pub body_text: Option<String>,
    #[serde(default)]
    pub footer_text: Option<String>,
    #[serde(default)]
    pub button_cta: Option<String>,
    #[serde(default)]
    pub sections: Vec<ListSection>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct QuickReply {
    #[serde(default)]
    pub header_text: Option<String>,
    #[serde(default)]
    pub body_text: Option<String>,
    #[serde(default)]
    pub footer_text: Option<String>,
    #[serde(default)]
    pub buttons: Vec<Button>,
}

/// Template body parameters: a JSON array, or the same list serialized into a string.
///
/// Serialized lists come either as JSON (`["Asha", 2]`) or as the literal form older engines
/// emit (`['Asha', '12:30']`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum BodyParams {
    Structured(Vec<Value>),
    Serialized(String),
}

impl BodyParams {
    /// Structured parameter list; `None` when a serialized string is not a flat list.
    pub fn resolve(&self) -> Option<Vec<Value>> {
        match self {
            BodyParams::Structured(params) => Some(params.clone()),
            BodyParams::Serialized(s) if s.trim().is_empty() => None,
            BodyParams::Serialized(s) => match serde_json::from_str::<Vec<Value>>(s) {
                Ok(params) => Some(params),
                Err(e) => {
                    let params = parse_literal_list(s);
                    if params.is_none() {
                        log::warn!(
                            "template body_params is neither a JSON array nor a flat literal list ({}), sending without",
                            e
                        );
                    }
                    params
                }
            },
        }
    }
}

/// Flat list literal: `[...]` or `(...)` of quoted strings (either quote), numbers,
/// `True`, `False` or `None`. Nested containers are rejected.
fn parse_literal_list(s: &str) -> Option<Vec<Value>> {
    let s = s.trim();
    let inner = s
        .strip_prefix('[')
        .and_then(|r| r.strip_suffix(']'))
        .or_else(|| s.strip_prefix('(').and_then(|r| r.strip_suffix(')')))?;
    let mut chars = inner.chars().peekable();
    let mut items = Vec::new();
    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        match chars.peek().copied() {
            None => break,
            Some(quote @ ('\'' | '"')) => {
                chars.next();
                let mut text = String::new();
                loop {
                    match chars.next()? {
                        '\\' => match chars.next()? {
                            'n' => text.push('\n'),
                            't' => text.push('\t'),
                            other => text.push(other),
                        },
                        c if c == quote => break,
                        c => text.push(c),
                    }
                }
                items.push(Value::String(text));
            }
            Some(_) => {
                let mut token = String::new();
                while let Some(c) = chars.next_if(|c| *c != ',') {
                    token.push(c);
                }
                items.push(literal_scalar(token.trim())?);
            }
        }
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        match chars.next() {
            None => break,
            Some(',') => continue,
            Some(_) => return None,
        }
    }
    Some(items)
}

fn literal_scalar(token: &str) -> Option<Value> {
    match token {
        "True" => Some(Value::Bool(true)),
        "False" => Some(Value::Bool(false)),
        "None" => Some(Value::Null),
        _ => serde_json::from_str::<serde_json::Number>(token)
            .ok()
            .map(Value::Number),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TemplateReply {
    #[serde(default)]
    pub template_name: String,
    #[serde(default)]
    pub header_params: Option<Vec<Value>>,
    #[serde(default)]
    pub body_params: Option<BodyParams>,
    #[serde(default)]
    pub button_params: Option<Vec<Value>>,
}

impl TemplateReply {
    pub fn to_message(&self) -> TemplateMessage {
        TemplateMessage {
            name: self.template_name.clone(),
            header_params: self.header_params.clone(),
            body_params: self.body_params.as_ref().and_then(BodyParams::resolve),
            button_params: self.button_params.clone(),
        }
    }
}

/// Custom JSON reply: any combination of the three structured kinds, one element each.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CustomPayload {
    #[serde(default)]
    pub interactive_list: Vec<InteractiveList>,
    #[serde(default)]
    pub quick_reply: Vec<QuickReply>,
    #[serde(default)]
    pub template: Vec<TemplateReply>,
}

impl CustomPayload {
    /// Replies in processing order: interactive list, then quick reply, then template.
    pub fn into_replies(self) -> Vec<OutboundReply> {
        let mut replies = Vec::new();
        if let Some(list) = self.interactive_list.into_iter().next() {
            replies.push(OutboundReply::InteractiveList(list));
        }
        if let Some(quick_reply) = self.quick_reply.into_iter().next() {
            replies.push(OutboundReply::QuickReply(quick_reply));
        }
        if let Some(template) = self.template.into_iter().next() {
            replies.push(OutboundReply::Template(template));
        }
        replies
    }
}

/// One structured reply from the dialogue engine.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundReply {
    PlainText(TextBody),
    TextWithButtons { text: String, buttons: Vec<Button> },
    InteractiveList(InteractiveList),
    QuickReply(QuickReply),
    Template(TemplateReply),
    Image(String),
}

/// Reply-button interactive payload. Returns the preamble to send first, if any.
pub fn build_button_message(text: &str, buttons: &[Button]) -> (Option<String>, Value) {
    let (preamble, body) = split_preamble(text);
    let buttons: Vec<Value> = buttons.iter().map(|b| b.reply(b.title.clone())).collect();
    let payload = json!({
        "type": "button",
        "body": { "text": body },
        "action": { "buttons": buttons },
    });
    (preamble.map(str::to_string), payload)
}

/// List payload (`{body, action, header?, footer?}`). Returns the preamble to send first, if any.
pub fn build_list_message(list: &InteractiveList) -> (Option<String>, Value) {
    let sections: Vec<Value> = list
        .sections
        .iter()
        .map(|section| {
            let rows: Vec<Value> = section
                .buttons
                .iter()
                .map(|row| {
                    let mut out = Map::new();
                    out.insert("id".into(), json!(row.payload.clone().unwrap_or_default()));
                    out.insert(
                        "title".into(),
                        json!(safely_trim(
                            row.title.as_deref().unwrap_or(""),
                            "interactive_list.sections.rows.title"
                        )),
                    );
                    if let Some(desc) = safely_trim_opt(
                        row.description.as_deref(),
                        "interactive_list.sections.rows.description",
                    ) {
                        out.insert("description".into(), json!(desc));
                    }
                    Value::Object(out)
                })
                .collect();
            json!({
                "title": safely_trim(
                    section.section_title.as_deref().unwrap_or(""),
                    "interactive_list.sections.title"
                ),
                "rows": rows,
            })
        })
        .collect();

    let (preamble, body) = match list.body_text.as_deref() {
        Some(text) if !text.is_empty() => {
            let (preamble, body) = split_preamble(text);
            (
                preamble.map(str::to_string),
                safely_trim(body, "interactive_list.body_text"),
            )
        }
        _ => {
            log::debug!("interactive list has no body_text; the provider rejects an empty body");
            (None, String::new())
        }
    };
    let cta = safely_trim(
        list.button_cta.as_deref().unwrap_or(""),
        "interactive_list.button_cta",
    );

    let mut payload = json!({
        "body": body,
        "action": { "button": cta, "sections": sections },
    });
    if let Some(header) = non_empty(list.header_text.as_deref()) {
        payload["header"] = json!(safely_trim(header, "interactive_list.header_text"));
    }
    if let Some(footer) = non_empty(list.footer_text.as_deref()) {
        payload["footer"] = json!(safely_trim(footer, "interactive_list.footer_text"));
    }
    (preamble, payload)
}

/// Quick-reply button payload. Returns the leading text messages to send before it.
pub fn build_quick_reply(quick_reply: &QuickReply) -> (Vec<String>, Value) {
    let mut leading = Vec::new();
    let mut payload = json!({
        "type": "button",
        "body": { "text": "" },
        "action": { "buttons": [] },
    });

    if let Some(header) = non_empty(quick_reply.header_text.as_deref()) {
        payload["header"] = json!({
            "type": "text",
            "text": safely_trim(header, "quick_reply.header_text"),
        });
    }
    if let Some(body) = non_empty(quick_reply.body_text.as_deref()) {
        let mut chunks = split_text_message(body, DEFAULT_LINE_THRESHOLD);
        let last = chunks.pop().unwrap_or_default();
        leading = chunks;
        payload["body"] = json!({ "text": safely_trim(&last, "quick_reply.body_text") });
    }
    if let Some(footer) = non_empty(quick_reply.footer_text.as_deref()) {
        payload["footer"] = json!({ "text": safely_trim(footer, "quick_reply.footer_text") });
    }
    let buttons: Vec<Value> = quick_reply
        .buttons
        .iter()
        .map(|b| b.reply(safely_trim(&b.title, "quick_reply.buttons.title")))
        .collect();
    payload["action"]["buttons"] = Value::Array(buttons);
    (leading, payload)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

/// Output channel delivering formatted replies through a [`WhatsAppSender`].
#[derive(Clone)]
pub struct WhatsAppOutput {
    sender: Arc<dyn WhatsAppSender>,
}

impl WhatsAppOutput {
    pub fn new(sender: Arc<dyn WhatsAppSender>) -> Self {
        Self { sender }
    }

    pub async fn send_reply(&self, recipient: &str, reply: &OutboundReply) {
        match reply {
            OutboundReply::PlainText(body) => self.send_text_message(recipient, body).await,
            OutboundReply::TextWithButtons { text, buttons } => {
                self.send_text_with_buttons(recipient, text, buttons).await
            }
            OutboundReply::InteractiveList(list) => self.send_interactive_list(recipient, list).await,
            OutboundReply::QuickReply(quick_reply) => {
                self.send_quick_reply(recipient, quick_reply).await
            }
            OutboundReply::Template(template) => self.send_template(recipient, template).await,
            OutboundReply::Image(url) => self.send_image_url(recipient, url).await,
        }
    }

    pub async fn send_text_message(&self, recipient: &str, body: &TextBody) {
        for part in body.messages() {
            if let Err(e) = self.sender.send_text(recipient, &part).await {
                log::warn!("whatsapp send_text to {} failed: {}", recipient, e);
            }
        }
    }

    pub async fn send_image_url(&self, recipient: &str, url: &str) {
        if let Err(e) = self.sender.send_image(recipient, url).await {
            log::warn!("whatsapp send_image to {} failed: {}", recipient, e);
        }
    }

    pub async fn send_text_with_buttons(&self, recipient: &str, text: &str, buttons: &[Button]) {
        let (preamble, payload) = build_button_message(text, buttons);
        if let Some(preamble) = preamble {
            self.send_text_message(recipient, &TextBody::Single(preamble))
                .await;
        }
        if let Err(e) = self.sender.send_reply_button(recipient, &payload).await {
            log::warn!("whatsapp send_reply_button to {} failed: {}", recipient, e);
        }
    }

    pub async fn send_interactive_list(&self, recipient: &str, list: &InteractiveList) {
        let (preamble, payload) = build_list_message(list);
        if let Some(preamble) = preamble {
            self.send_text_message(recipient, &TextBody::Single(preamble))
                .await;
        }
        if let Err(e) = self.sender.send_list(recipient, &payload).await {
            log::warn!("whatsapp send_list to {} failed: {}", recipient, e);
        }
    }

    pub async fn send_quick_reply(&self, recipient: &str, quick_reply: &QuickReply) {
        let (leading, payload) = build_quick_reply(quick_reply);
        if !leading.is_empty() {
            self.send_text_message(recipient, &TextBody::Parts(leading))
                .await;
        }
        if let Err(e) = self.sender.send_reply_button(recipient, &payload).await {
            log::warn!("whatsapp quick reply to {} failed: {}", recipient, e);
        }
    }

    pub async fn send_template(&self, recipient: &str, template: &TemplateReply) {
        let message = template.to_message();
        if let Err(e) = self.sender.send_template(recipient, &message).await {
            log::warn!(
                "whatsapp template {} to {} failed: {}",
                message.name,
                recipient,
                e
            );
        }
    }

    /// Process every structured kind present in a custom JSON reply, in fixed order.
    pub async fn send_custom_json(&self, recipient: &str, custom: CustomPayload) {
        for reply in custom.into_replies() {
            self.send_reply(recipient, &reply).await;
        }
    }
}
