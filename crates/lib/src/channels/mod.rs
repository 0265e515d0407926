//! Messaging channels. WhatsApp Cloud API is the only one wired into the gateway.

pub mod whatsapp;

pub use whatsapp::{WhatsAppBridge, WhatsAppClient};
