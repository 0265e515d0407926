//! Message normalizer: turns any inbound message into the single text the dialogue engine sees.
//!
//! Media messages are resolved to a download URL through [`MediaResolver`]; a failed lookup
//! degrades to an empty URL instead of failing the message.

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::classify::{classify, MessageKind};
use super::metadata::Metadata;
use super::payload::{InboundMessage, LocationContent, MediaContent};

/// Text sent to the engine when a message cannot be represented.
pub const UNSUPPORTED_MESSAGE: &str = "unsupported_message_received";

/// Intent prefix for structured payloads embedded in text (e.g. shared contacts).
const CONTACT_INTENT: &str = "/inform";
const CONTACT_PAYLOAD_KEY: &str = "contact_payload";

/// Resolves a media id to a download URL. Never fails: empty string when unavailable.
#[async_trait]
pub trait MediaResolver: Send + Sync {
    async fn resolve_media_url(&self, media_id: &str) -> String;
}

/// Canonical text for `message`. Error details of unsupported messages are merged into `metadata`.
pub async fn normalize(
    message: &InboundMessage,
    metadata: &mut Metadata,
    media: &dyn MediaResolver,
) -> String {
    let kind = classify(message);
    log::debug!("whatsapp inbound message classified as {}", kind.name());
    let text = match kind {
        MessageKind::UserText(body) => body.to_string(),
        MessageKind::Image(content) | MessageKind::Video(content) => {
            let url = resolve(content, media).await;
            format!("{}\n{}", content.caption.as_deref().unwrap_or(""), url)
        }
        MessageKind::Sticker(content)
        | MessageKind::Document(content)
        | MessageKind::Audio(content) => resolve(content, media).await,
        MessageKind::Contact(contact) => contact_intent(contact),
        MessageKind::Location(location) => location_text(location),
        MessageKind::QuickReplyButton(id) | MessageKind::ListReply(id) => id.to_string(),
        MessageKind::Unsupported => {
            log::warn!(
                "received a whatsapp message that cannot be handled (type {:?})",
                message.kind
            );
            if let Some(first) = message.errors.as_ref().and_then(|e| e.first()) {
                metadata.merge(first);
            }
            UNSUPPORTED_MESSAGE.to_string()
        }
    };
    if text.is_empty() {
        UNSUPPORTED_MESSAGE.to_string()
    } else {
        text
    }
}

async fn resolve(content: &MediaContent, media: &dyn MediaResolver) -> String {
    match content.id.as_deref() {
        Some(id) if !id.is_empty() => media.resolve_media_url(id).await,
        _ => String::new(),
    }
}

fn contact_intent(contact: &Value) -> String {
    let mut payload = Map::new();
    payload.insert(CONTACT_PAYLOAD_KEY.to_string(), contact.clone());
    format!("{}{}", CONTACT_INTENT, Value::Object(payload))
}

fn location_text(location: &LocationContent) -> String {
    let text = format!(
        "{} , {}\n{}\n{}",
        coordinate(location.latitude.as_ref()),
        coordinate(location.longitude.as_ref()),
        location.name.as_deref().unwrap_or(""),
        location.address.as_deref().unwrap_or(""),
    );
    text.trim_end().to_string()
}

fn coordinate(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(v) => v.to_string(),
        None => String::new(),
    }
}
