use serde::Deserialize;

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawWapairConfig {
    #[serde(default)]
    pub gateway: RawGatewayConfig,

    #[serde(default)]
    pub polling: RawPollConfig,

    #[serde(default)]
    pub record: RawRecordConfig,
}

/// Gateway section as stored in TOML
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawGatewayConfig {
    /// Candidate gateway base addresses
    pub hosts: Option<Vec<String>>,

    /// Per-request timeout in seconds
    pub request_timeout_secs: Option<u64>,

    #[serde(default)]
    pub paths: RawGatewayPaths,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawGatewayPaths {
    pub create: Option<String>,
    pub connect: Option<String>,
    pub connection_state: Option<String>,
}

/// Polling section as stored in TOML
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawPollConfig {
    pub interval_ms: Option<u64>,
    pub max_consecutive_errors: Option<u32>,
    pub success_token: Option<String>,
}

/// Record section as stored in TOML
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawRecordConfig {
    pub endpoint: Option<String>,
}
