//! Human handoff gate: decides per message whether the bot or a human agent owns the conversation.
//!
//! The status service is polled at most `max_attempts` times per message and the result is
//! never cached. When every poll fails the gate fails open: the bot answers.

use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use super::client::WhatsAppSender;
use super::metadata::Metadata;

/// Bounded retry: at most `max_attempts` calls, `backoff` between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::ZERO,
        }
    }
}

/// Call `attempt` (with the 1-based attempt number) until it yields `Some` or attempts run out.
pub async fn poll_bounded<T, F, Fut>(policy: RetryPolicy, mut attempt: F) -> Option<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Option<T>>,
{
    for n in 1..=policy.max_attempts {
        if let Some(value) = attempt(n).await {
            return Some(value);
        }
        if n < policy.max_attempts && !policy.backoff.is_zero() {
            tokio::time::sleep(policy.backoff).await;
        }
    }
    None
}

#[derive(Debug, thiserror::Error)]
pub enum HandoffError {
    #[error("handoff request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("handoff service error: {0}")]
    Api(String),
}

#[derive(Debug, Deserialize)]
struct HandoffStatus {
    #[serde(default)]
    handoff: Option<bool>,
}

/// Client for the handoff status service and the human-routing webhook.
#[derive(Clone)]
pub struct HandoffGate {
    status_base_url: String,
    router_url: String,
    policy: RetryPolicy,
    client: reqwest::Client,
}

impl HandoffGate {
    pub fn new(
        status_base_url: impl Into<String>,
        router_url: impl Into<String>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            status_base_url: status_base_url.into().trim_end_matches('/').to_string(),
            router_url: router_url.into(),
            policy,
            client: reqwest::Client::new(),
        }
    }

    fn status_url(&self, channel: &str, sender_id: &str) -> String {
        format!("{}/{}/{}/", self.status_base_url, channel, sender_id)
    }

    /// Poll the status service. Non-200 answers and network errors are retried; `false` when exhausted.
    pub async fn should_handoff(&self, channel: &str, sender_id: &str) -> bool {
        let url = self.status_url(channel, sender_id);
        let decision = poll_bounded(self.policy, |n| {
            let url = url.clone();
            async move { self.poll_status(&url, n).await }
        })
        .await;
        decision.unwrap_or_else(|| {
            log::warn!(
                "handoff status for {}/{} unavailable after {} attempt(s), routing to bot",
                channel,
                sender_id,
                self.policy.max_attempts
            );
            false
        })
    }

    /// One status call. `None` means "try again".
    async fn poll_status(&self, url: &str, attempt: u32) -> Option<bool> {
        let res = match self.client.get(url).send().await {
            Ok(res) => res,
            Err(e) => {
                log::debug!("handoff status attempt {} failed: {}", attempt, e);
                return None;
            }
        };
        if res.status() != reqwest::StatusCode::OK {
            log::debug!("handoff status attempt {} returned {}", attempt, res.status());
            return None;
        }
        match res.json::<HandoffStatus>().await {
            Ok(status) => Some(status.handoff.unwrap_or(false)),
            Err(e) => {
                log::warn!("handoff status body could not be decoded: {}", e);
                Some(false)
            }
        }
    }

    /// Check handoff and, when a human owns the conversation, route `text` away from the bot.
    /// Returns true when the message was consumed here and the dialogue engine must not run.
    pub async fn human_handoff(
        &self,
        channel: &str,
        sender_id: &str,
        text: &str,
        metadata: &Metadata,
        sender: &dyn WhatsAppSender,
    ) -> bool {
        if !self.should_handoff(channel, sender_id).await {
            return false;
        }
        if metadata.is_agent_echo() {
            // Agent-authored reply echoed back by the agent backend: deliver it to the user as is.
            forward_agent_reply(sender_id, text, sender).await;
        } else if let Err(e) = self.post_to_router(text, sender_id).await {
            log::warn!("handoff routing for {} failed: {}", sender_id, e);
        }
        true
    }

    /// POST `{message_text, sender_id}` to the human-routing webhook.
    pub async fn post_to_router(&self, text: &str, sender_id: &str) -> Result<(), HandoffError> {
        let body = json!({ "message_text": text, "sender_id": sender_id });
        let res = self.client.post(&self.router_url).json(&body).send().await?;
        let status = res.status();
        let reply = res.text().await.unwrap_or_default();
        log::debug!("handoff router answered {} {}", status, reply);
        if !status.is_success() {
            return Err(HandoffError::Api(format!("{} {}", status, reply)));
        }
        Ok(())
    }
}

/// Send an agent's reply straight to the user, one message per double-newline paragraph.
/// Blank paragraphs (runs of three or more newlines) are skipped.
async fn forward_agent_reply(sender_id: &str, text: &str, sender: &dyn WhatsAppSender) {
    for part in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        if let Err(e) = sender.send_text(sender_id, part).await {
            log::warn!("handoff: forwarding agent reply to {} failed: {}", sender_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::whatsapp::testing::RecordingSender;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn exhausted_attempts_yield_none() {
        let calls = AtomicU32::new(0);
        let result: Option<bool> = poll_bounded(RetryPolicy::default(), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { None }
        })
        .await;
        assert_eq!(result, None);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn first_success_stops_polling() {
        let calls = AtomicU32::new(0);
        let result = poll_bounded(RetryPolicy::default(), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Some(true) }
        })
        .await;
        assert_eq!(result, Some(true));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn success_on_last_attempt() {
        let result = poll_bounded(
            RetryPolicy {
                max_attempts: 3,
                backoff: Duration::from_millis(1),
            },
            |n| async move { (n == 3).then_some(n) },
        )
        .await;
        assert_eq!(result, Some(3));
    }

    #[tokio::test]
    async fn zero_attempts_never_calls() {
        let calls = AtomicU32::new(0);
        let result: Option<()> = poll_bounded(
            RetryPolicy {
                max_attempts: 0,
                backoff: Duration::ZERO,
            },
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Some(()) }
            },
        )
        .await;
        assert_eq!(result, None);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn status_url_shape() {
        let gate = HandoffGate::new("http://handoff:5000/", "http://router/bot", RetryPolicy::default());
        assert_eq!(
            gate.status_url("whatsapp", "15550001"),
            "http://handoff:5000/whatsapp/15550001/"
        );
    }

    #[tokio::test]
    async fn agent_reply_is_sent_per_paragraph() {
        let sender = RecordingSender::default();
        forward_agent_reply("15550001", "  First line\n\nSecond line\n", &sender).await;
        assert_eq!(sender.texts(), vec!["First line", "Second line"]);
    }

    #[tokio::test]
    async fn agent_reply_send_failure_does_not_stop_remaining_parts() {
        let sender = RecordingSender::failing();
        forward_agent_reply("1", "a\n\nb", &sender).await;
        assert_eq!(sender.texts(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn agent_reply_skips_blank_paragraphs() {
        let sender = RecordingSender::default();
        forward_agent_reply("1", "Hi\n\n\n\nThere\n\n\nBye\n\n", &sender).await;
        assert_eq!(sender.texts(), vec!["Hi", "There", "Bye"]);
    }
}
