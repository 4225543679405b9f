//! Application configuration.

use serde::Deserialize;
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Push notification configuration.
    #[serde(default)]
    pub push: PushConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public URL of this instance.
    pub url: String,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Push notification configuration.
///
/// The key pair is normally generated through the admin API and stored in the
/// database; the `vapid_*` fields here act as a deployment-level fallback when
/// no stored pair exists yet.
#[derive(Debug, Clone, Deserialize)]
pub struct PushConfig {
    /// Fallback public key (base64url, uncompressed P-256 point).
    #[serde(default)]
    pub vapid_public_key: Option<String>,
    /// Fallback private key (base64url, P-256 scalar).
    #[serde(default)]
    pub vapid_private_key: Option<String>,
    /// Contact URI embedded in push authentication tokens.
    #[serde(default = "default_vapid_subject")]
    pub vapid_subject: String,
    /// Consecutive delivery failures after which a subscription is removed.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// Days without successful validation after which a subscription is stale.
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
    /// Days a deactivated subscription is kept before it is purged.
    #[serde(default = "default_purge_inactive_days")]
    pub purge_inactive_days: i64,
    /// Interval between background maintenance sweeps, in seconds.
    #[serde(default = "default_maintenance_interval_secs")]
    pub maintenance_interval_secs: u64,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            vapid_public_key: None,
            vapid_private_key: None,
            vapid_subject: default_vapid_subject(),
            failure_threshold: default_failure_threshold(),
            retention_days: default_retention_days(),
            purge_inactive_days: default_purge_inactive_days(),
            maintenance_interval_secs: default_maintenance_interval_secs(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_max_connections() -> u32 {
    100
}

const fn default_min_connections() -> u32 {
    5
}

fn default_vapid_subject() -> String {
    "mailto:admin@example.com".to_string()
}

const fn default_failure_threshold() -> u32 {
    5
}

const fn default_retention_days() -> i64 {
    30
}

const fn default_purge_inactive_days() -> i64 {
    7
}

const fn default_maintenance_interval_secs() -> u64 {
    3600
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `FARMVISIT_ENV`)
    /// 3. Environment variables with `FARMVISIT_` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let env = std::env::var("FARMVISIT_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("FARMVISIT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("FARMVISIT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
