//! Gateway HTTP server (single port).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};

use crate::channels::whatsapp::{
    HandoffGate, Metadata, RetryPolicy, WhatsAppBridge, WhatsAppClient, WhatsAppOutput,
};
use crate::config::{self, Config};
use crate::engine::RestEngine;

/// Acknowledgement body for every webhook POST.
const ACK_BODY: &str = "success";

#[derive(Clone)]
pub struct GatewayState {
    pub bridge: Arc<WhatsAppBridge>,
    /// When Some, the subscription handshake must present this token.
    pub verify_token: Option<String>,
    /// Upper bound on processing one webhook event.
    pub event_timeout: Duration,
}

impl GatewayState {
    /// Wire the provider client, dialogue engine and handoff gate from config.
    /// Fails when the access token or phone number id is missing.
    pub fn from_config(config: &Config) -> Result<Self> {
        let token = config::resolve_whatsapp_token(config)
            .context("whatsapp token missing (set whatsapp.token or WHATSAPP_TOKEN)")?;
        let phone_number_id = config::resolve_phone_number_id(config).context(
            "whatsapp phone number id missing (set whatsapp.phoneNumberId or WHATSAPP_PHONE_NUMBER_ID)",
        )?;

        let client = Arc::new(
            WhatsAppClient::new(&config.whatsapp.api_base, token, phone_number_id)
                .with_template_language(&config.whatsapp.template_language),
        );
        let engine = Arc::new(RestEngine::new(
            &config.engine.url,
            WhatsAppOutput::new(client.clone()),
        ));
        let mut bridge = WhatsAppBridge::new(client.clone(), client, engine)
            .with_mark_read(config.whatsapp.mark_read);
        if config.handoff.enabled {
            let policy = RetryPolicy {
                max_attempts: config.handoff.max_attempts,
                backoff: Duration::from_millis(config.handoff.backoff_ms),
            };
            bridge = bridge.with_handoff(HandoffGate::new(
                &config.handoff.status_base_url,
                &config.handoff.router_url,
                policy,
            ));
        } else {
            log::info!("handoff disabled, every message goes to the dialogue engine");
        }

        Ok(Self {
            bridge: Arc::new(bridge),
            verify_token: config::resolve_verify_token(config),
            event_timeout: Duration::from_secs(config.gateway.event_timeout_secs),
        })
    }
}

pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(health_http))
        .route("/webhook", get(verify_webhook).post(webhook))
        .with_state(state)
}

pub async fn run_gateway(config: Config) -> Result<()> {
    let state = GatewayState::from_config(&config)?;
    let app = router(state);

    let bind_addr = format!("{}:{}", config.gateway.bind.trim(), config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("gateway server exited")?;
    log::info!("gateway stopped");
    Ok(())
}

/// Completes on SIGINT or SIGTERM. In-flight event tasks are not awaited.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log::warn!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining connections");
}

/// GET / returns a simple health JSON (for probes).
async fn health_http() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// GET /webhook: subscription handshake, echoes `hub.challenge`.
async fn verify_webhook(
    State(state): State<GatewayState>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, String) {
    let Some(challenge) = params.get("hub.challenge") else {
        return (StatusCode::BAD_REQUEST, "missing hub.challenge".to_string());
    };
    if let Some(ref expected) = state.verify_token {
        let mode_ok = params.get("hub.mode").map(String::as_str) == Some("subscribe");
        let token_ok = params.get("hub.verify_token") == Some(expected);
        if !mode_ok || !token_ok {
            log::warn!("whatsapp webhook verification rejected");
            return (StatusCode::FORBIDDEN, "verification failed".to_string());
        }
    }
    (StatusCode::OK, challenge.clone())
}

/// POST /webhook: always acknowledged; the event runs on its own task under the timeout.
async fn webhook(State(state): State<GatewayState>, body: Bytes) -> (StatusCode, &'static str) {
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            log::warn!("whatsapp webhook body is not JSON: {}", e);
            return (StatusCode::OK, ACK_BODY);
        }
    };
    let metadata = Metadata::from_value(payload.get("metadata"));
    let bridge = state.bridge.clone();
    let timeout = state.event_timeout;
    tokio::spawn(async move {
        if tokio::time::timeout(timeout, bridge.handle(&payload, metadata))
            .await
            .is_err()
        {
            log::warn!("whatsapp event processing exceeded {:?}, abandoned", timeout);
        }
    });
    (StatusCode::OK, ACK_BODY)
}
