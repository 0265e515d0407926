//! Recording fakes for unit tests.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::client::{TemplateMessage, WhatsAppError, WhatsAppSender};

#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Text { to: String, text: String },
    Image { to: String, url: String },
    ReplyButton { to: String, interactive: Value },
    List { to: String, list: Value },
    Template { to: String, template: TemplateMessage },
    Read { message_id: String },
}

/// Sender that records every call; with `failing` set, every call errors after recording.
#[derive(Default)]
pub struct RecordingSender {
    pub sent: Mutex<Vec<Sent>>,
    pub failing: bool,
}

impl RecordingSender {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    /// Texts sent so far, in order.
    pub fn texts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Text { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    fn record(&self, sent: Sent) -> Result<(), WhatsAppError> {
        self.sent.lock().unwrap().push(sent);
        if self.failing {
            Err(WhatsAppError::Api("500 test failure".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl WhatsAppSender for RecordingSender {
    async fn send_text(&self, to: &str, text: &str) -> Result<(), WhatsAppError> {
        self.record(Sent::Text {
            to: to.to_string(),
            text: text.to_string(),
        })
    }

    async fn send_image(&self, to: &str, url: &str) -> Result<(), WhatsAppError> {
        self.record(Sent::Image {
            to: to.to_string(),
            url: url.to_string(),
        })
    }

    async fn send_reply_button(&self, to: &str, interactive: &Value) -> Result<(), WhatsAppError> {
        self.record(Sent::ReplyButton {
            to: to.to_string(),
            interactive: interactive.clone(),
        })
    }

    async fn send_list(&self, to: &str, list: &Value) -> Result<(), WhatsAppError> {
        self.record(Sent::List {
            to: to.to_string(),
            list: list.clone(),
        })
    }

    async fn send_template(&self, to: &str, template: &TemplateMessage) -> Result<(), WhatsAppError> {
        self.record(Sent::Template {
            to: to.to_string(),
            template: template.clone(),
        })
    }

    async fn mark_read(&self, message_id: &str) -> Result<(), WhatsAppError> {
        self.record(Sent::Read {
            message_id: message_id.to_string(),
        })
    }
}
