//! Channel adapter: one webhook event in, one outcome out (dialogue engine or human agent).

use std::sync::Arc;

use serde_json::Value;

use super::client::WhatsAppSender;
use super::handoff::HandoffGate;
use super::metadata::{Metadata, MESSAGE_ID_KEY, RAW_PAYLOAD_KEY, SENDER_NAME_KEY};
use super::normalize::{normalize, MediaResolver};
use super::payload::{InboundMessage, WebhookPayload};
use crate::engine::{DialogueEngine, UserMessage};

/// Input channel name reported to the engine and the handoff service.
pub const CHANNEL_NAME: &str = "whatsapp";

pub struct WhatsAppBridge {
    sender: Arc<dyn WhatsAppSender>,
    media: Arc<dyn MediaResolver>,
    engine: Arc<dyn DialogueEngine>,
    handoff: Option<HandoffGate>,
    mark_read: bool,
}

impl WhatsAppBridge {
    pub fn new(
        sender: Arc<dyn WhatsAppSender>,
        media: Arc<dyn MediaResolver>,
        engine: Arc<dyn DialogueEngine>,
    ) -> Self {
        Self {
            sender,
            media,
            engine,
            handoff: None,
            mark_read: true,
        }
    }

    pub fn with_handoff(mut self, gate: HandoffGate) -> Self {
        self.handoff = Some(gate);
        self
    }

    pub fn with_mark_read(mut self, mark_read: bool) -> Self {
        self.mark_read = mark_read;
        self
    }

    /// Process one webhook body. Only the first message found is handled. Never fails: problems are logged.
    pub async fn handle(&self, payload: &Value, mut metadata: Metadata) {
        metadata.insert(RAW_PAYLOAD_KEY, payload.clone());
        let parsed: WebhookPayload = match serde_json::from_value(payload.clone()) {
            Ok(p) => p,
            Err(e) => {
                log::warn!("whatsapp webhook body has unexpected shape: {}", e);
                return;
            }
        };
        for entry in &parsed.entry {
            for change in &entry.changes {
                metadata.insert(SENDER_NAME_KEY, change.value.sender_name());
                let Some(message) = change.value.messages.first() else {
                    continue;
                };
                if change.value.messages.len() > 1 {
                    log::debug!(
                        "whatsapp change carries {} messages, handling the first",
                        change.value.messages.len()
                    );
                }
                self.handle_message(message, metadata).await;
                return;
            }
        }
        log::debug!("whatsapp webhook without messages (status update?), nothing to do");
    }

    async fn handle_message(&self, message: &InboundMessage, mut metadata: Metadata) {
        metadata.insert(
            MESSAGE_ID_KEY,
            message.id.clone().map(Value::String).unwrap_or(Value::Null),
        );
        let text = normalize(message, &mut metadata, self.media.as_ref()).await;
        let sender_id = message.from.clone().unwrap_or_default();

        if self.mark_read {
            if let Some(ref id) = message.id {
                if let Err(e) = self.sender.mark_read(id).await {
                    log::debug!("whatsapp read receipt for {} failed: {}", id, e);
                }
            }
        }

        if let Some(ref gate) = self.handoff {
            if gate
                .human_handoff(CHANNEL_NAME, &sender_id, &text, &metadata, self.sender.as_ref())
                .await
            {
                log::debug!("whatsapp message from {} routed to human agent", sender_id);
                return;
            }
        }

        let user_message = UserMessage {
            text,
            sender_id,
            input_channel: CHANNEL_NAME.to_string(),
            metadata,
        };
        if let Err(e) = self.engine.handle_message(user_message).await {
            log::warn!("exception when trying to handle whatsapp message: {}", e);
        }
    }
}
