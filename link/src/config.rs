//! File and environment configuration.
//!
//! # Configuration Format
//!
//! ```toml
//! [server]
//! base_url = "http://localhost:8080/api"  # party service API root
//! user_id = "user_k3j9x2a7q"              # optional fixed identity
//! username = "Bard"
//!
//! [connection]
//! transport = "sse"            # sse | stomp
//! auto_reconnect = true
//! reconnect_delay_ms = 1000
//! max_reconnect_attempts = 5   # 0 disables reconnection
//! exponential_backoff = false
//!
//! [timeouts]
//! connection_timeout_ms = 10000
//! receive_timeout_ms = 60000   # 0 disables stale-stream detection
//! send_timeout_ms = 10000
//! ```
//!
//! Environment variables override the file:
//! `PARTY_LINK_BASE_URL`, `PARTY_LINK_TRANSPORT`,
//! `PARTY_LINK_MAX_RECONNECT_ATTEMPTS`, `PARTY_LINK_RECONNECT_DELAY_MS`.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::{RealtimeClient, RealtimeClientBuilder};
use crate::error::{PartyLinkError, Result};
use crate::models::{ConnectionOptions, TransportKind};
use crate::timeouts::LinkTimeouts;

pub const ENV_BASE_URL: &str = "PARTY_LINK_BASE_URL";
pub const ENV_TRANSPORT: &str = "PARTY_LINK_TRANSPORT";
pub const ENV_MAX_RECONNECT_ATTEMPTS: &str = "PARTY_LINK_MAX_RECONNECT_ATTEMPTS";
pub const ENV_RECONNECT_DELAY_MS: &str = "PARTY_LINK_RECONNECT_DELAY_MS";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkConfig {
    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub connection: ConnectionOptions,

    #[serde(default)]
    pub timeouts: TimeoutSection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSection {
    /// API root of the party service. Required before building a client.
    pub base_url: Option<String>,
    pub user_id: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutSection {
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,

    #[serde(default = "default_receive_timeout_ms")]
    pub receive_timeout_ms: u64,

    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,
}

fn default_connection_timeout_ms() -> u64 {
    10_000
}

fn default_receive_timeout_ms() -> u64 {
    60_000
}

fn default_send_timeout_ms() -> u64 {
    10_000
}

impl Default for TimeoutSection {
    fn default() -> Self {
        Self {
            connection_timeout_ms: default_connection_timeout_ms(),
            receive_timeout_ms: default_receive_timeout_ms(),
            send_timeout_ms: default_send_timeout_ms(),
        }
    }
}

impl LinkConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Load from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("[party-link] No config file at {}; using defaults", path.display());
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|e| {
            PartyLinkError::ConfigurationError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides()
    }

    pub fn with_env_overrides(self) -> Result<Self> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Overlay values from `lookup` (an environment-like source).
    pub fn apply_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
            self.server.base_url = Some(url.trim().to_string());
        }
        if let Some(transport) = lookup(ENV_TRANSPORT) {
            self.connection.transport = TransportKind::from_str(&transport)?;
        }
        if let Some(raw) = lookup(ENV_MAX_RECONNECT_ATTEMPTS) {
            self.connection.max_reconnect_attempts = parse_number(ENV_MAX_RECONNECT_ATTEMPTS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_RECONNECT_DELAY_MS) {
            self.connection.reconnect_delay_ms = parse_number(ENV_RECONNECT_DELAY_MS, &raw)?;
        }
        Ok(self)
    }

    pub fn base_url(&self) -> Result<&str> {
        self.server
            .base_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                PartyLinkError::ConfigurationError(format!(
                    "base_url is required (set [server].base_url or {})",
                    ENV_BASE_URL
                ))
            })
    }

    pub fn timeouts(&self) -> LinkTimeouts {
        LinkTimeouts::builder()
            .connection_timeout(Duration::from_millis(self.timeouts.connection_timeout_ms))
            .receive_timeout(Duration::from_millis(self.timeouts.receive_timeout_ms))
            .send_timeout(Duration::from_millis(self.timeouts.send_timeout_ms))
            .build()
    }

    /// Builder pre-populated from this configuration.
    pub fn client_builder(&self) -> Result<RealtimeClientBuilder> {
        let mut builder = RealtimeClient::builder()
            .base_url(self.base_url()?)
            .connection_options(self.connection.clone())
            .timeouts(self.timeouts());
        if let Some(user_id) = &self.server.user_id {
            builder = builder.client_id(user_id.clone());
        }
        if let Some(username) = &self.server.username {
            builder = builder.username(username.clone());
        }
        Ok(builder)
    }
}

fn parse_number<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| {
        PartyLinkError::ConfigurationError(format!("{} must be a non-negative integer, got '{}'", key, raw))
    })
}
