//! Helpers shared by the integration tests: throwaway servers on loopback ports.
#![allow(dead_code)]

use std::time::Duration;

use axum::Router;
use wabridge::config::Config;

pub fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind free port");
    listener.local_addr().expect("local_addr").port()
}

/// Serve `app` on an ephemeral port; returns its base URL. The task runs until the test ends.
pub async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock server");
    let addr = listener.local_addr().expect("local_addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{}", addr)
}

/// Config with credentials set and every upstream pointed at `upstream`.
pub fn test_config(upstream: &str) -> Config {
    let mut config = Config::default();
    config.gateway.port = free_port();
    config.gateway.bind = "127.0.0.1".to_string();
    config.whatsapp.token = Some("test-token".to_string());
    config.whatsapp.phone_number_id = Some("PHONE1".to_string());
    config.whatsapp.api_base = format!("{}/graph", upstream);
    config.handoff.status_base_url = format!("{}/status", upstream);
    config.handoff.router_url = format!("{}/router", upstream);
    config.engine.url = format!("{}/engine", upstream);
    config
}

/// Start the gateway and wait until GET / answers. Returns its base URL.
pub async fn start_gateway(config: Config) -> String {
    let base = format!("http://127.0.0.1:{}", config.gateway.port);
    tokio::spawn(async move {
        let _ = wabridge::gateway::run_gateway(config).await;
    });
    let client = reqwest::Client::new();
    let mut last_err = None;
    for _ in 0..100 {
        match client.get(format!("{}/", base)).send().await {
            Ok(resp) if resp.status().is_success() => return base,
            Ok(_) => {}
            Err(e) => last_err = Some(e),
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("gateway at {} did not come up within 5s; last error: {:?}", base, last_err);
}

/// Poll `cond` for up to 5s.
pub async fn wait_for<F: Fn() -> bool>(cond: F) -> bool {
    for _ in 0..100 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    cond()
}
