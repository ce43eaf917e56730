//! Monitor driven by the Cloudflare source against a mock upstream

use std::sync::Arc;

use live_monitor::{
    STATUS_MISSING_ENV,
    actors::MonitorHandle,
    config::UpstreamConfig,
    source::CloudflareSource,
    storage::MemoryStore,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::create_test_config;

const STATUS_PATH: &str = "/zones/zone-1/waiting_rooms/room-1/status";

fn upstream_config(base_url: String) -> UpstreamConfig {
    UpstreamConfig {
        base_url,
        api_token: Some("test-token".to_string()),
        zone_id: Some("zone-1".to_string()),
        waiting_room_id: Some("room-1".to_string()),
        timeout_secs: 5,
    }
}

async fn spawn_with_upstream(config: UpstreamConfig) -> MonitorHandle {
    let source = Arc::new(CloudflareSource::new(&config).unwrap());
    MonitorHandle::spawn(create_test_config(60_000), source, Box::new(MemoryStore::new())).await
}

#[tokio::test]
async fn test_upstream_values_reach_latest() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(STATUS_PATH))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "result": {
                "status": "queueing",
                "estimated_total_active_users": 250,
                "estimated_queued_users": 40,
                "max_estimated_time_minutes": 6
            }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let monitor = spawn_with_upstream(upstream_config(mock_server.uri())).await;

    let sample = monitor.latest().await.unwrap();

    assert_eq!(sample.status, "queueing");
    assert_eq!(sample.active_count, 250);
    assert_eq!(sample.queued_count, 40);
    assert_eq!(sample.max_wait_minutes, 6.0);

    monitor.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_upstream_outage_keeps_last_values() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(STATUS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "result": {
                "status": "not_queueing",
                "estimated_total_active_users": 12,
                "estimated_queued_users": 0,
                "max_estimated_time_minutes": 0
            }
        })))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(STATUS_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&mock_server)
        .await;

    let monitor = spawn_with_upstream(upstream_config(mock_server.uri())).await;

    let first = monitor.latest().await.unwrap();
    let second = monitor.refresh().await.unwrap();

    assert_eq!(first.active_count, 12);
    assert_eq!(second.status, "not_queueing");
    assert_eq!(second.active_count, 12);
    assert!(second.timestamp > first.timestamp);

    monitor.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_missing_credentials_reported_as_status() {
    let mut config = upstream_config("http://127.0.0.1:9".to_string());
    config.api_token = None;

    let monitor = spawn_with_upstream(config).await;

    let sample = monitor.latest().await.unwrap();

    assert_eq!(sample.status, STATUS_MISSING_ENV);
    assert_eq!(sample.active_count, 0);
    assert!(sample.timestamp > 0);

    monitor.shutdown().await.unwrap();
}
