//! Configuration for the registration proxy.

use anyhow::{bail, Context, Result};
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Proxy configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Shared invite code, also sent to the homeserver as the registration token
    pub invite_code: SecretString,

    /// Base URL of the homeserver
    #[serde(default = "default_homeserver_url")]
    pub homeserver_url: String,

    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Outbound timeouts
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutConfig {
    /// Total timeout for each registration call to the homeserver
    #[serde(default = "default_register_timeout", with = "humantime_serde")]
    pub register: Duration,

    /// Connect timeout for proxied traffic
    #[serde(default = "default_connect_timeout", with = "humantime_serde")]
    pub connect: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            port: default_port(),
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            register: default_register_timeout(),
            connect: default_connect_timeout(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_homeserver_url() -> String {
    "http://localhost:6167".into()
}

fn default_listen_addr() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    8008
}

fn default_register_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        Self::build(config::Environment::default())
    }

    /// Load configuration from an explicit set of environment-style variables.
    pub fn from_source(vars: HashMap<String, String>) -> Result<Self> {
        Self::build(config::Environment::default().source(Some(vars)))
    }

    fn build(env: config::Environment) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(env.separator("__").try_parsing(false))
            .build()
            .context("Failed to build configuration")?;

        let mut config: Config = config
            .try_deserialize()
            .context("Failed to deserialize configuration (is INVITE_CODE set?)")?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&mut self) -> Result<()> {
        if self.invite_code.expose_secret().trim().is_empty() {
            bail!("INVITE_CODE is not set");
        }

        let url = Url::parse(&self.homeserver_url)
            .with_context(|| format!("Invalid HOMESERVER_URL {:?}", self.homeserver_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!(
                "Invalid HOMESERVER_URL {:?}: scheme must be http or https",
                self.homeserver_url
            );
        }

        self.homeserver_url = self.homeserver_url.trim_end_matches('/').to_string();
        Ok(())
    }
}
