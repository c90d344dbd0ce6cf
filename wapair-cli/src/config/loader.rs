use super::types::{
    RawGatewayConfig, RawGatewayPaths, RawPollConfig, RawRecordConfig, RawWapairConfig,
};
use anyhow::Result;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use wapair_core::{GatewayConfig, GatewayPaths, PollConfig, RecordConfig, WapairConfig};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project)
    pub fn load() -> Result<WapairConfig> {
        let user_path = Self::user_config_path();
        Self::load_layers(user_path.as_deref(), &Self::project_config_path())
    }

    /// Load and merge the given layers; missing files are skipped
    pub fn load_layers(user_path: Option<&Path>, project_path: &Path) -> Result<WapairConfig> {
        let mut raw = RawWapairConfig::default();

        // Layer 1: User config
        if let Some(user_path) = user_path
            && let Some(user_config) = Self::read_raw(user_path)?
        {
            raw = Self::merge_raw(raw, user_config);
        }

        // Layer 2: Project config
        if let Some(project_config) = Self::read_raw(project_path)? {
            raw = Self::merge_raw(raw, project_config);
        }

        let config = Self::finalize(raw);
        config.validate()?;
        Ok(config)
    }

    /// Get user config path (platform-specific)
    pub fn user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "wapair").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get project config path
    /// Can be overridden with WAPAIR_PROJECT_CONFIG_DIR env var
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var("WAPAIR_PROJECT_CONFIG_DIR") {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".wapair/config.toml")
        }
    }

    fn read_raw(path: &Path) -> Result<Option<RawWapairConfig>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(Some(toml::from_str(&contents)?))
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawWapairConfig, overlay: RawWapairConfig) -> RawWapairConfig {
        RawWapairConfig {
            gateway: RawGatewayConfig {
                hosts: overlay.gateway.hosts.or(base.gateway.hosts),
                request_timeout_secs: overlay
                    .gateway
                    .request_timeout_secs
                    .or(base.gateway.request_timeout_secs),
                paths: RawGatewayPaths {
                    create: overlay.gateway.paths.create.or(base.gateway.paths.create),
                    connect: overlay.gateway.paths.connect.or(base.gateway.paths.connect),
                    connection_state: overlay
                        .gateway
                        .paths
                        .connection_state
                        .or(base.gateway.paths.connection_state),
                },
            },
            polling: RawPollConfig {
                interval_ms: overlay.polling.interval_ms.or(base.polling.interval_ms),
                max_consecutive_errors: overlay
                    .polling
                    .max_consecutive_errors
                    .or(base.polling.max_consecutive_errors),
                success_token: overlay.polling.success_token.or(base.polling.success_token),
            },
            record: RawRecordConfig {
                endpoint: overlay.record.endpoint.or(base.record.endpoint),
            },
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawWapairConfig) -> WapairConfig {
        let gateway = GatewayConfig::default();
        let paths = GatewayPaths::default();
        let polling = PollConfig::default();

        WapairConfig {
            gateway: GatewayConfig {
                hosts: raw.gateway.hosts.unwrap_or(gateway.hosts),
                request_timeout_secs: raw
                    .gateway
                    .request_timeout_secs
                    .unwrap_or(gateway.request_timeout_secs),
                paths: GatewayPaths {
                    create: raw.gateway.paths.create.unwrap_or(paths.create),
                    connect: raw.gateway.paths.connect.unwrap_or(paths.connect),
                    connection_state: raw
                        .gateway
                        .paths
                        .connection_state
                        .unwrap_or(paths.connection_state),
                },
            },
            polling: PollConfig {
                interval_ms: raw.polling.interval_ms.unwrap_or(polling.interval_ms),
                max_consecutive_errors: raw
                    .polling
                    .max_consecutive_errors
                    .unwrap_or(polling.max_consecutive_errors),
                success_token: raw.polling.success_token.unwrap_or(polling.success_token),
            },
            record: RecordConfig {
                endpoint: raw.record.endpoint,
            },
        }
    }
}
