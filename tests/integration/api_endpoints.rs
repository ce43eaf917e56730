//! Integration tests for API endpoints
//!
//! These tests verify that:
//! - The stats and history routes return the documented JSON
//! - The event stream uses SSE framing with heartbeats
//! - The access key is enforced when configured
//! - Disconnected stream clients are unsubscribed

use std::net::SocketAddr;
use std::time::Duration;

use live_monitor::{
    actors::MonitorHandle,
    api::{ApiState, spawn_api_server},
    config::{ApiSettings, MonitorConfig},
};
use reqwest::StatusCode;
use serde_json::Value;

use crate::helpers::*;

// Helper to create test API server
async fn spawn_test_api(config: MonitorConfig, access_key: Option<&str>) -> (SocketAddr, MonitorHandle) {
    let monitor = spawn_monitor(config, ScriptedSource::healthy()).await;

    let settings = ApiSettings {
        bind_addr: "127.0.0.1:0".parse().unwrap(), // Random port
        access_key: access_key.map(str::to_string),
        enable_cors: true,
    };

    let addr = spawn_api_server(settings, ApiState::new(monitor.clone()))
        .await
        .unwrap();

    (addr, monitor)
}

/// Read the response body until `needle` shows up
async fn read_until(response: &mut reqwest::Response, buffer: &mut String, needle: &str) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !buffer.contains(needle) {
            let chunk = response.chunk().await.unwrap().expect("stream closed");
            buffer.push_str(&String::from_utf8_lossy(&chunk));
        }
    })
    .await
    .unwrap_or_else(|_| panic!("did not see {needle:?} in {buffer:?}"));
}

#[tokio::test]
async fn test_stats_returns_latest_sample() {
    let (addr, monitor) = spawn_test_api(create_test_config(60_000), None).await;

    let response = reqwest::get(format!("http://{addr}/api/stats")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["cache-control"], "no-store");

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "queueing");
    assert!(body["timestamp"].as_i64().unwrap() > 0);
    for field in ["active_count", "queued_count", "max_wait_minutes"] {
        assert!(body[field].is_number(), "missing {field}");
    }

    monitor.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_history_shape() {
    let (addr, monitor) = spawn_test_api(create_test_config(60_000), None).await;

    let response = reqwest::get(format!("http://{addr}/api/history")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["cache-control"], "no-store");

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["poll_interval_ms"], 60_000);
    assert_eq!(body["history_minutes"], 10);
    assert_eq!(body["history"].as_array().unwrap().len(), 1);
    assert_eq!(body["history"][0], body["latest"]);

    monitor.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_health_check() {
    let (addr, monitor) = spawn_test_api(create_test_config(60_000), None).await;

    let response = reqwest::get(format!("http://{addr}/api/v1/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["storage"]["healthy"], true);
    assert_eq!(body["subscribers"], 0);
    assert_eq!(body["history_len"], 0);
    assert!(body["timestamp"].is_string());

    monitor.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_unknown_route_returns_json_404() {
    let (addr, monitor) = spawn_test_api(create_test_config(60_000), None).await;

    let response = reqwest::get(format!("http://{addr}/api/nope")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("/api/nope"));

    monitor.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_sse_framing_and_heartbeat() {
    let mut config = create_test_config(60_000);
    config.heartbeat_secs = 1;
    let (addr, monitor) = spawn_test_api(config, None).await;

    let mut response = reqwest::get(format!("http://{addr}/sse")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/event-stream")
    );
    assert_eq!(
        response.headers()["cache-control"],
        "no-cache, no-store, must-revalidate"
    );

    let mut buffer = String::new();
    read_until(&mut response, &mut buffer, "\n\n").await;

    let data = buffer
        .lines()
        .find_map(|line| line.strip_prefix("data: "))
        .expect("first event should carry data");
    let sample: Value = serde_json::from_str(data).unwrap();
    assert_eq!(sample["status"], "unknown");
    assert_eq!(sample["timestamp"], 0);

    read_until(&mut response, &mut buffer, ": ping").await;

    monitor.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_sse_streams_polled_samples() {
    let (addr, monitor) = spawn_test_api(create_test_config(100), None).await;

    let mut response = reqwest::get(format!("http://{addr}/sse")).await.unwrap();

    let mut buffer = String::new();
    read_until(&mut response, &mut buffer, "\"status\":\"queueing\"").await;

    assert_eq!(monitor.diagnostics().await.unwrap().subscribers, 1);

    monitor.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_sse_disconnect_unsubscribes() {
    let (addr, monitor) = spawn_test_api(create_test_config(100), None).await;

    let mut response = reqwest::get(format!("http://{addr}/sse")).await.unwrap();
    let mut buffer = String::new();
    read_until(&mut response, &mut buffer, "\n\n").await;
    drop(response);

    let unsubscribed = eventually(Duration::from_secs(3), || async {
        monitor.diagnostics().await.unwrap().subscribers == 0
    })
    .await;
    assert!(unsubscribed, "subscriber should be removed after disconnect");

    monitor.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_health_check_open_without_key() {
    let (addr, monitor) = spawn_test_api(create_test_config(60_000), Some("secret")).await;

    let response = reqwest::get(format!("http://{addr}/api/v1/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    monitor.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_access_key_required() {
    let (addr, monitor) = spawn_test_api(create_test_config(60_000), Some("secret")).await;
    let client = reqwest::Client::new();

    let missing = client.get(format!("http://{addr}/api/stats")).send().await.unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let wrong = client
        .get(format!("http://{addr}/api/stats?k=nope"))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status(), StatusCode::FORBIDDEN);

    let via_query = client
        .get(format!("http://{addr}/api/history?k=secret"))
        .send()
        .await
        .unwrap();
    assert_eq!(via_query.status(), StatusCode::OK);

    let via_header = client
        .get(format!("http://{addr}/api/stats"))
        .bearer_auth("secret")
        .send()
        .await
        .unwrap();
    assert_eq!(via_header.status(), StatusCode::OK);

    let stream = client.get(format!("http://{addr}/sse")).send().await.unwrap();
    assert_eq!(stream.status(), StatusCode::UNAUTHORIZED);

    monitor.shutdown().await.unwrap();
}
