//! WhatsApp Cloud API channel.
//!
//! Inbound: webhook payload → classification → canonical text plus metadata → handoff gate →
//! dialogue engine. Outbound: structured bot replies → text, media, interactive and template
//! messages on the Cloud API.

pub mod bridge;
pub mod classify;
pub mod client;
pub mod handoff;
pub mod metadata;
pub mod normalize;
pub mod outbound;
pub mod payload;
pub mod schema;
pub mod split;

#[cfg(test)]
pub(crate) mod testing;

pub use bridge::{WhatsAppBridge, CHANNEL_NAME};
pub use classify::{classify, MessageKind};
pub use client::{TemplateMessage, WhatsAppClient, WhatsAppError, WhatsAppSender};
pub use handoff::{HandoffError, HandoffGate, RetryPolicy};
pub use metadata::Metadata;
pub use normalize::{normalize, MediaResolver, UNSUPPORTED_MESSAGE};
pub use outbound::{
    BodyParams, Button, CustomPayload, InteractiveList, ListRow, ListSection, OutboundReply,
    QuickReply, TemplateReply, TextBody, WhatsAppOutput,
};
pub use payload::{InboundMessage, WebhookPayload};
