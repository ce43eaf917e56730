use std::net::SocketAddr;

use chrono::Utc;

const CF_API_TOKEN: &str = "CF_API_TOKEN";

pub fn get_api_token() -> Option<String> {
    non_empty_env(CF_API_TOKEN)
}

const ZONE_ID: &str = "ZONE_ID";

pub fn get_zone_id() -> Option<String> {
    non_empty_env(ZONE_ID)
}

const WR_ID: &str = "WR_ID";

pub fn get_waiting_room_id() -> Option<String> {
    non_empty_env(WR_ID)
}

const DASH_KEY: &str = "DASH_KEY";

pub fn get_access_key() -> Option<String> {
    non_empty_env(DASH_KEY)
}

const MONITOR_ADDR: &str = "MONITOR_ADDR";

pub fn get_bind_addr() -> Option<SocketAddr> {
    std::env::var(MONITOR_ADDR).ok()?.parse().ok()
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
