//! Dialogue engine contract and a REST client for it.
//!
//! The engine receives one canonical text per inbound message. `RestEngine` posts it to an
//! HTTP endpoint that answers with a list of bot replies, and delivers those replies through
//! the WhatsApp outbound formatter.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::channels::whatsapp::{Button, CustomPayload, Metadata, OutboundReply, TextBody, WhatsAppOutput};

/// Message handed to the dialogue engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserMessage {
    #[serde(rename = "message")]
    pub text: String,
    #[serde(rename = "sender")]
    pub sender_id: String,
    pub input_channel: String,
    pub metadata: Metadata,
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("engine request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("engine api error: {0}")]
    Api(String),
}

/// Entry point of the dialogue engine. Replies, if any, are delivered by the implementation.
#[async_trait]
pub trait DialogueEngine: Send + Sync {
    async fn handle_message(&self, message: UserMessage) -> Result<(), EngineError>;
}

/// One bot reply in the engine's REST answer.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BotReply {
    #[serde(default)]
    pub recipient_id: Option<String>,
    #[serde(default)]
    pub text: Option<TextBody>,
    #[serde(default)]
    pub buttons: Vec<Button>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub custom: Option<CustomPayload>,
}

impl BotReply {
    /// Outbound replies in delivery order: text (with buttons), image, then custom payloads.
    pub fn into_replies(self) -> Vec<OutboundReply> {
        let mut replies = Vec::new();
        if let Some(text) = self.text {
            if self.buttons.is_empty() {
                replies.push(OutboundReply::PlainText(text));
            } else {
                replies.push(OutboundReply::TextWithButtons {
                    text: text.into_text(),
                    buttons: self.buttons,
                });
            }
        }
        if let Some(url) = self.image {
            replies.push(OutboundReply::Image(url));
        }
        if let Some(custom) = self.custom {
            replies.extend(custom.into_replies());
        }
        replies
    }
}

/// Decode each reply on its own; a reply with an unexpected shape is logged and skipped.
fn decode_replies(raw: Vec<Value>) -> Vec<BotReply> {
    raw.into_iter()
        .enumerate()
        .filter_map(|(i, value)| match serde_json::from_value(value) {
            Ok(reply) => Some(reply),
            Err(e) => {
                log::warn!("engine reply #{} skipped, unexpected shape: {}", i, e);
                None
            }
        })
        .collect()
}

/// Dialogue engine reached over HTTP (`POST {sender, message, input_channel, metadata}`).
pub struct RestEngine {
    url: String,
    client: reqwest::Client,
    output: WhatsAppOutput,
}

impl RestEngine {
    pub fn new(url: impl Into<String>, output: WhatsAppOutput) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
            output,
        }
    }
}

#[async_trait]
impl DialogueEngine for RestEngine {
    async fn handle_message(&self, message: UserMessage) -> Result<(), EngineError> {
        let res = self.client.post(&self.url).json(&message).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(EngineError::Api(format!("{} {}", status, body)));
        }
        let raw: Vec<Value> = res.json().await?;
        log::debug!("engine returned {} reply(ies) for {}", raw.len(), message.sender_id);
        for reply in decode_replies(raw) {
            let recipient = reply
                .recipient_id
                .clone()
                .unwrap_or_else(|| message.sender_id.clone());
            for outbound in reply.into_replies() {
                self.output.send_reply(&recipient, &outbound).await;
            }
        }
        Ok(())
    }
}
