//! wabridge core library: WhatsApp Cloud API channel adapter, dialogue-engine client,
//! configuration and the webhook gateway used by the CLI.

pub mod channels;
pub mod config;
pub mod engine;
pub mod gateway;
