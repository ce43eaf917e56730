use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use tracing::trace;

use crate::util;

/// Storage backend configuration
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    /// In-memory storage (state is lost on restart)
    #[serde(rename = "none")]
    None,

    /// SQLite database file holding the `last` and `history` records
    Sqlite {
        #[serde(default = "default_sqlite_path")]
        path: PathBuf,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Sqlite {
            path: default_sqlite_path(),
        }
    }
}

fn default_sqlite_path() -> PathBuf {
    PathBuf::from("./monitor.db")
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub monitor: MonitorConfig,

    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Storage configuration (defaults to SQLite when omitted)
    pub storage: Option<StorageConfig>,

    #[serde(default)]
    pub api: ApiSettings,
}

/// Poll cadence and retention of the monitor actor
#[derive(Debug, Clone, serde::Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_history_minutes")]
    pub history_minutes: u64,

    /// Keep-alive interval for streaming subscribers
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,

    /// Samples queued per subscriber before it is considered dead
    #[serde(default = "default_subscriber_buffer")]
    pub subscriber_buffer: usize,
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs)
    }

    /// Maximum number of samples kept in the rolling history.
    pub fn window_capacity(&self) -> usize {
        window_capacity(self.history_minutes, self.poll_interval_ms)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            history_minutes: default_history_minutes(),
            heartbeat_secs: default_heartbeat_secs(),
            subscriber_buffer: default_subscriber_buffer(),
        }
    }
}

/// `⌈history_minutes · 60000 / poll_interval_ms⌉`, never below one entry.
pub fn window_capacity(history_minutes: u64, poll_interval_ms: u64) -> usize {
    let window_ms = history_minutes.saturating_mul(60_000);
    let points = window_ms.div_ceil(poll_interval_ms.max(1));
    points.max(1) as usize
}

fn default_poll_interval_ms() -> u64 {
    5_000
}

fn default_history_minutes() -> u64 {
    30
}

fn default_heartbeat_secs() -> u64 {
    15
}

fn default_subscriber_buffer() -> usize {
    16
}

/// Credentials and location of the waiting room status API
#[derive(Debug, Clone, serde::Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub api_token: Option<String>,
    pub zone_id: Option<String>,
    pub waiting_room_id: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl UpstreamConfig {
    /// Fill credentials that are not set in the file from the environment.
    pub fn with_env_fallback(mut self) -> Self {
        self.api_token = self.api_token.or_else(util::get_api_token);
        self.zone_id = self.zone_id.or_else(util::get_zone_id);
        self.waiting_room_id = self.waiting_room_id.or_else(util::get_waiting_room_id);
        self
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_token: None,
            zone_id: None,
            waiting_room_id: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    String::from("https://api.cloudflare.com/client/v4")
}

fn default_timeout_secs() -> u64 {
    30
}

/// HTTP surface configuration
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ApiSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,

    /// Shared key required as `?k=` or bearer token (disabled when unset)
    pub access_key: Option<String>,

    #[serde(default = "default_enable_cors")]
    pub enable_cors: bool,
}

impl ApiSettings {
    pub fn with_env_fallback(mut self) -> Self {
        if let Some(addr) = util::get_bind_addr() {
            self.bind_addr = addr;
        }
        self.access_key = self.access_key.or_else(util::get_access_key);
        self
    }
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            access_key: None,
            enable_cors: default_enable_cors(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_enable_cors() -> bool {
    true
}

impl Config {
    pub fn with_env_fallback(mut self) -> Self {
        self.upstream = self.upstream.with_env_fallback();
        self.api = self.api.with_env_fallback();
        self
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.monitor.poll_interval_ms == 0 {
            anyhow::bail!("monitor.poll_interval_ms must be greater than zero");
        }
        if self.monitor.history_minutes == 0 {
            anyhow::bail!("monitor.history_minutes must be greater than zero");
        }
        if self.monitor.heartbeat_secs == 0 {
            anyhow::bail!("monitor.heartbeat_secs must be greater than zero");
        }
        if self.monitor.subscriber_buffer == 0 {
            anyhow::bail!("monitor.subscriber_buffer must be greater than zero");
        }
        Ok(())
    }
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    serde_json::from_str(&file_content)
        .map_err(|e| anyhow::anyhow!("Invalid configuration file provided: {e}"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}
