// common/src/config.rs
use config::{Config as ConfigFile, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Central configuration for both services
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Bind address of the guest console websocket server.
    pub guest_server_addr: String,

    pub sso: SsoConfig,
    pub host_sim: HostSimConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SsoConfig {
    /// Origins allowed to become the trusted origin. Empty means
    /// first-sender-wins, matching the legacy embed behavior where the host
    /// origin is unknown until the first message arrives.
    pub allowed_origins: Vec<String>,
    /// Poll interval for the linked-account observer, in seconds.
    pub account_poll_secs: u64,
    /// Simulated credential-exchange latency for the dev exchange, in
    /// milliseconds.
    pub dev_exchange_delay_ms: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HostSimConfig {
    /// Websocket URL of the guest console's embed endpoint.
    pub guest_url: String,
    /// Origin header the simulator presents to the guest.
    pub origin: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            guest_server_addr: "127.0.0.1:8080".to_string(),
            sso: SsoConfig {
                allowed_origins: Vec::new(),
                account_poll_secs: 2,
                dev_exchange_delay_ms: 250,
            },
            host_sim: HostSimConfig {
                guest_url: "ws://127.0.0.1:8080/embed".to_string(),
                origin: "https://host.example".to_string(),
            },
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        // Get the run mode, defaulting to "development"
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        // Locate the config directory
        let config_dir = env::var("CONFIG_DIR").map(PathBuf::from).unwrap_or_else(|_| {
            // Check if we're in the project root or a subcrate
            let mut path = PathBuf::from("./config");
            if !path.exists() {
                path = PathBuf::from("../config");
            }
            path
        });

        tracing::info!("Loading configuration from {}", config_dir.display());
        tracing::info!("Using run mode: {}", run_mode);

        let config = ConfigFile::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(format!("{}.toml", run_mode))).required(false))
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Load from files and environment, falling back to defaults with
    /// plain environment overrides when no config files are present.
    pub fn from_env() -> Self {
        match Self::load() {
            Ok(config) => {
                tracing::info!("Configuration loaded from files and environment");
                config
            }
            Err(e) => {
                tracing::warn!("Failed to load configuration from files: {}", e);
                tracing::info!("Falling back to environment variables only");

                let mut config = Config::default();

                if let Ok(addr) = env::var("GUEST_SERVER_ADDR") {
                    config.guest_server_addr = addr;
                }
                if let Ok(origins) = env::var("SSO_ALLOWED_ORIGINS") {
                    config.sso.allowed_origins = origins
                        .split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect();
                }
                if let Ok(url) = env::var("HOST_SIM_GUEST_URL") {
                    config.host_sim.guest_url = url;
                }
                if let Ok(origin) = env::var("HOST_SIM_ORIGIN") {
                    config.host_sim.origin = origin;
                }

                config
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_allow_list_is_empty() {
        let config = Config::default();
        assert!(config.sso.allowed_origins.is_empty());
        assert_eq!(config.guest_server_addr, "127.0.0.1:8080");
    }
}
