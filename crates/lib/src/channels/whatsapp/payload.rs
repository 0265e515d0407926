//! WhatsApp Cloud API webhook payload (POST /webhook body).
//!
//! Shape: `{ entry: [{ changes: [{ value: { contacts: [...], messages: [...] } }] }] }`.
//! Message fields vary by kind; everything beyond the envelope is optional so that any
//! message deserializes and classification stays total.

use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookEntry {
    #[serde(default)]
    pub changes: Vec<WebhookChange>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookChange {
    #[serde(default)]
    pub value: WebhookValue,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookValue {
    #[serde(default)]
    pub contacts: Vec<WebhookContact>,
    #[serde(default)]
    pub messages: Vec<InboundMessage>,
}

/// Sender profile attached to a change.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookContact {
    #[serde(default)]
    pub profile: Option<WebhookProfile>,
    #[serde(default)]
    pub wa_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookProfile {
    #[serde(default)]
    pub name: Option<String>,
}

impl WebhookValue {
    /// Display name of the first contact, or "" when absent.
    pub fn sender_name(&self) -> &str {
        self.contacts
            .first()
            .and_then(|c| c.profile.as_ref())
            .and_then(|p| p.name.as_deref())
            .unwrap_or("")
    }
}

/// One inbound message as delivered by the provider. Immutable once received.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboundMessage {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub is_echo: Option<bool>,
    #[serde(default)]
    pub text: Option<TextContent>,
    #[serde(default)]
    pub image: Option<MediaContent>,
    #[serde(default)]
    pub sticker: Option<MediaContent>,
    #[serde(default)]
    pub video: Option<MediaContent>,
    #[serde(default)]
    pub document: Option<MediaContent>,
    #[serde(default)]
    pub audio: Option<MediaContent>,
    /// Shared contact cards; forwarded to the engine verbatim, so kept as raw JSON.
    #[serde(default)]
    pub contacts: Option<Vec<Value>>,
    #[serde(default)]
    pub location: Option<LocationContent>,
    #[serde(default)]
    pub interactive: Option<InteractiveContent>,
    #[serde(default)]
    pub errors: Option<Vec<Map<String, Value>>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TextContent {
    #[serde(default)]
    pub body: Option<String>,
}

/// Media reference (image, sticker, video, document, audio).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MediaContent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

/// Coordinates are kept as raw JSON numbers so they print exactly as received.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LocationContent {
    #[serde(default)]
    pub latitude: Option<Value>,
    #[serde(default)]
    pub longitude: Option<Value>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InteractiveContent {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub button_reply: Option<InteractiveReply>,
    #[serde(default)]
    pub list_reply: Option<InteractiveReply>,
}

/// Button or list selection; `id` is the payload negotiated when the options were sent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InteractiveReply {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}
