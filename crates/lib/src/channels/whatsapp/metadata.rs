//! Per-event metadata sidecar handed to the dialogue engine.
//!
//! Write-only accumulation: keys can be set or overwritten, never removed.

use serde::Serialize;
use serde_json::{Map, Value};

pub const RAW_PAYLOAD_KEY: &str = "whatsapp_raw_payload";
pub const SENDER_NAME_KEY: &str = "whatsapp_sender_name";
pub const MESSAGE_ID_KEY: &str = "whatsapp_msg_id";
/// Set by the human-agent backend when it echoes an agent's own reply back through us.
pub const AGENT_ACCOUNT_KEY: &str = "acc_id";
pub const AGENT_CONVERSATION_KEY: &str = "convo";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Metadata(Map<String, Value>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from the optional `metadata` object of a webhook body. Non-objects are ignored.
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            Some(Value::Object(map)) => Self(map.clone()),
            _ => Self::default(),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Copy every entry of `other` in, overwriting existing keys.
    pub fn merge(&mut self, other: &Map<String, Value>) {
        for (k, v) in other {
            self.0.insert(k.clone(), v.clone());
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// True when the message is a human agent's reply echoed back (both markers truthy).
    pub fn is_agent_echo(&self) -> bool {
        truthy(self.get(AGENT_ACCOUNT_KEY)) && truthy(self.get(AGENT_CONVERSATION_KEY))
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn seeds_from_object_only() {
        let seeded = Metadata::from_value(Some(&json!({"acc_id": 7})));
        assert_eq!(seeded.get("acc_id"), Some(&json!(7)));
        assert_eq!(Metadata::from_value(Some(&json!("nope"))), Metadata::new());
        assert_eq!(Metadata::from_value(None), Metadata::new());
    }

    #[test]
    fn merge_overwrites_but_keeps_other_keys() {
        let mut meta = Metadata::new();
        meta.insert("code", 1);
        meta.insert(MESSAGE_ID_KEY, "wamid.1");
        let errors = json!({"code": 131051, "title": "Message type unknown"});
        meta.merge(errors.as_object().unwrap());
        assert_eq!(meta.get("code"), Some(&json!(131051)));
        assert_eq!(meta.get(MESSAGE_ID_KEY), Some(&json!("wamid.1")));
    }

    #[test]
    fn agent_echo_needs_both_markers() {
        let mut meta = Metadata::new();
        meta.insert(AGENT_ACCOUNT_KEY, 3);
        assert!(!meta.is_agent_echo());
        meta.insert(AGENT_CONVERSATION_KEY, "");
        assert!(!meta.is_agent_echo());
        meta.insert(AGENT_CONVERSATION_KEY, 42);
        assert!(meta.is_agent_echo());
    }

    #[test]
    fn serializes_as_plain_object() {
        let mut meta = Metadata::new();
        meta.insert(SENDER_NAME_KEY, "Asha");
        assert_eq!(serde_json::to_value(&meta).unwrap(), json!({"whatsapp_sender_name": "Asha"}));
    }
}
