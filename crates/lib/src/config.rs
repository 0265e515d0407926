//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.wabridge/config.json`) and environment.
//! Secrets (access token, phone number id, verify token) are usually supplied via env.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Webhook gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// WhatsApp Cloud API credentials and endpoints.
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,

    /// Human-agent handoff service.
    #[serde(default)]
    pub handoff: HandoffConfig,

    /// Dialogue engine endpoint.
    #[serde(default)]
    pub engine: EngineConfig,
}

/// Gateway bind, port and per-event processing limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port for the webhook HTTP server (default 5005).
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1").
    #[serde(default = "default_gateway_bind")]
    pub bind: String,

    /// Upper bound on processing one webhook event, in seconds (default 60).
    #[serde(default = "default_event_timeout_secs")]
    pub event_timeout_secs: u64,
}

fn default_gateway_port() -> u16 {
    5005
}

fn default_gateway_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_event_timeout_secs() -> u64 {
    60
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
            event_timeout_secs: default_event_timeout_secs(),
        }
    }
}

/// WhatsApp Cloud API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhatsAppConfig {
    /// Graph API bearer token. Overridden by WHATSAPP_TOKEN env when set.
    pub token: Option<String>,
    /// Phone number id of the WhatsApp-enabled number. Overridden by WHATSAPP_PHONE_NUMBER_ID.
    pub phone_number_id: Option<String>,
    /// Graph API base, including the version segment.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// When set, GET /webhook only echoes the challenge if `hub.verify_token` matches.
    pub verify_token: Option<String>,
    /// Language code sent with template messages.
    #[serde(default = "default_template_language")]
    pub template_language: String,
    /// Send a read receipt for every inbound message before routing it.
    #[serde(default = "default_true")]
    pub mark_read: bool,
}

fn default_api_base() -> String {
    "https://graph.facebook.com/v13.0".to_string()
}

fn default_template_language() -> String {
    "en_US".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            token: None,
            phone_number_id: None,
            api_base: default_api_base(),
            verify_token: None,
            template_language: default_template_language(),
            mark_read: true,
        }
    }
}

/// Handoff status service and human-routing webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandoffConfig {
    /// When false, every message goes to the dialogue engine without polling.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Base of the status endpoint; `/{channel}/{sender_id}/` is appended.
    #[serde(default = "default_status_base_url")]
    pub status_base_url: String,
    /// Endpoint receiving `{message_text, sender_id}` while a conversation is handed off.
    #[serde(default = "default_router_url")]
    pub router_url: String,
    /// Status polls per inbound message (default 3).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay between polls in milliseconds (default 0, immediate retry).
    #[serde(default)]
    pub backoff_ms: u64,
}

fn default_status_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_router_url() -> String {
    "http://127.0.0.1:8000/bot".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

impl Default for HandoffConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            status_base_url: default_status_base_url(),
            router_url: default_router_url(),
            max_attempts: default_max_attempts(),
            backoff_ms: 0,
        }
    }
}

/// Dialogue engine REST endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    #[serde(default = "default_engine_url")]
    pub url: String,
}

fn default_engine_url() -> String {
    "http://127.0.0.1:5055/webhooks/rest/webhook".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            url: default_engine_url(),
        }
    }
}

/// Non-blank env value, trimmed.
fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|s| {
        let t = s.trim();
        if t.is_empty() {
            None
        } else {
            Some(t.to_string())
        }
    })
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Resolve the Graph API token: env WHATSAPP_TOKEN overrides config.
pub fn resolve_whatsapp_token(config: &Config) -> Option<String> {
    env_value("WHATSAPP_TOKEN").or_else(|| non_blank(config.whatsapp.token.as_ref()))
}

/// Resolve the phone number id: env WHATSAPP_PHONE_NUMBER_ID overrides config.
pub fn resolve_phone_number_id(config: &Config) -> Option<String> {
    env_value("WHATSAPP_PHONE_NUMBER_ID")
        .or_else(|| non_blank(config.whatsapp.phone_number_id.as_ref()))
}

/// Resolve the webhook verify token: env WHATSAPP_VERIFY_TOKEN overrides config.
pub fn resolve_verify_token(config: &Config) -> Option<String> {
    env_value("WHATSAPP_VERIFY_TOKEN").or_else(|| non_blank(config.whatsapp.verify_token.as_ref()))
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("WABRIDGE_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".wabridge").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the given path, WABRIDGE_CONFIG_PATH, or the default. Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}
