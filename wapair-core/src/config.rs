//! Configuration for gateway access, polling and status recording

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default gateway host offered when none are configured
pub const DEFAULT_GATEWAY_HOST: &str = "http://localhost:3020";

/// Gateway state token that marks a session as authenticated
pub const DEFAULT_SUCCESS_TOKEN: &str = "open";

/// Top-level wapair configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WapairConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub polling: PollConfig,

    #[serde(default)]
    pub record: RecordConfig,
}

impl WapairConfig {
    /// Reject values that would make polling or HTTP calls spin
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.polling.interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "polling.interval_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.gateway.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "gateway.request_timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Gateway hosts and HTTP settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Candidate gateway base addresses a session can be bound to
    #[serde(default = "default_hosts")]
    pub hosts: Vec<String>,

    /// Timeout applied to every gateway request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub paths: GatewayPaths,
}

fn default_hosts() -> Vec<String> {
    vec![DEFAULT_GATEWAY_HOST.to_string()]
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            hosts: default_hosts(),
            request_timeout_secs: default_request_timeout_secs(),
            paths: GatewayPaths::default(),
        }
    }
}

impl GatewayConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Path prefixes appended to a gateway endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayPaths {
    pub create: String,
    pub connect: String,
    pub connection_state: String,
}

impl Default for GatewayPaths {
    fn default() -> Self {
        Self {
            create: "/instance/create".to_string(),
            connect: "/instance/connect".to_string(),
            connection_state: "/instance/connectionState".to_string(),
        }
    }
}

/// Poll loop policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Delay between two state polls
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Consecutive poll failures after which a session is marked failed
    #[serde(default = "default_max_consecutive_errors")]
    pub max_consecutive_errors: u32,

    /// Gateway state token that means "authenticated"
    #[serde(default = "default_success_token")]
    pub success_token: String,
}

fn default_interval_ms() -> u64 {
    5000
}

fn default_max_consecutive_errors() -> u32 {
    3
}

fn default_success_token() -> String {
    DEFAULT_SUCCESS_TOKEN.to_string()
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_consecutive_errors: default_max_consecutive_errors(),
            success_token: default_success_token(),
        }
    }
}

impl PollConfig {
    /// Delay between polls; a zero interval falls back to the default
    pub fn interval(&self) -> Duration {
        match self.interval_ms {
            0 => Duration::from_millis(default_interval_ms()),
            ms => Duration::from_millis(ms),
        }
    }

    /// Policy with a custom interval, mostly useful in tests
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval_ms = interval.as_millis() as u64;
        self
    }

    #[must_use]
    pub fn with_max_consecutive_errors(mut self, limit: u32) -> Self {
        self.max_consecutive_errors = limit;
        self
    }
}

/// Downstream system of record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordConfig {
    /// Base address receiving `updateStatusConnection` calls; recording is
    /// skipped when unset
    pub endpoint: Option<String>,
}
