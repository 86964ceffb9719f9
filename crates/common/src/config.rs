//! Application configuration.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Redis configuration (real-time side channel).
    #[serde(default)]
    pub redis: RedisConfig,
    /// Request workflow limits.
    #[serde(default)]
    pub workflow: WorkflowConfig,
    /// Notification delivery retry settings.
    #[serde(default)]
    pub notifications: NotificationConfig,
    /// Membership reconciliation sweeper settings.
    #[serde(default)]
    pub reconcile: ReconcileConfig,
    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,
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

/// Redis configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL. Without it, change events are dropped.
    #[serde(default)]
    pub url: Option<String>,
    /// Key prefix for all pub/sub channels.
    #[serde(default = "default_redis_prefix")]
    pub prefix: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: None,
            prefix: default_redis_prefix(),
        }
    }
}

/// Request workflow limits.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowConfig {
    /// Upper bound for decision history listings.
    #[serde(default = "default_history_limit")]
    pub history_limit: u64,
    /// Maximum chat message length in characters.
    #[serde(default = "default_max_message_length")]
    pub max_message_length: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
            max_message_length: default_max_message_length(),
        }
    }
}

/// Notification delivery settings.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    /// Attempts before an outbox entry is abandoned.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry.
    #[serde(default = "default_initial_delay_secs")]
    pub initial_delay_secs: u64,
    /// Upper bound on the retry delay.
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: u64,
    /// Backoff multiplier.
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    /// How often the sweeper looks for due entries.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    /// Entries processed per sweep.
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_secs: default_initial_delay_secs(),
            max_delay_secs: default_max_delay_secs(),
            multiplier: default_multiplier(),
            sweep_interval_secs: default_sweep_interval_secs(),
            batch_size: default_batch_size(),
        }
    }
}

impl NotificationConfig {
    /// Build the retry policy for outbox delivery.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_delay: Duration::from_secs(self.initial_delay_secs),
            max_delay: Duration::from_secs(self.max_delay_secs),
            multiplier: self.multiplier,
        }
    }
}

/// Membership reconciliation settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconcileConfig {
    /// How often approved requests are checked for a missing membership.
    #[serde(default = "default_reconcile_interval_secs")]
    pub interval_secs: u64,
    /// Requests inspected per run.
    #[serde(default = "default_reconcile_batch_size")]
    pub batch_size: u64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_reconcile_interval_secs(),
            batch_size: default_reconcile_batch_size(),
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_max_connections() -> u32 {
    50
}

const fn default_min_connections() -> u32 {
    5
}

fn default_redis_prefix() -> String {
    "matchup".to_string()
}

const fn default_history_limit() -> u64 {
    30
}

const fn default_max_message_length() -> usize {
    500
}

const fn default_max_attempts() -> u32 {
    5
}

const fn default_initial_delay_secs() -> u64 {
    30
}

const fn default_max_delay_secs() -> u64 {
    3600
}

const fn default_multiplier() -> f64 {
    2.0
}

const fn default_sweep_interval_secs() -> u64 {
    30
}

const fn default_batch_size() -> u64 {
    100
}

const fn default_reconcile_interval_secs() -> u64 {
    300
}

const fn default_reconcile_batch_size() -> u64 {
    200
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `.env` (if present)
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `MATCHUP_ENV`)
    /// 4. Environment variables with `MATCHUP__` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        let env = std::env::var("MATCHUP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("MATCHUP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize::<Self>()?.validated()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("MATCHUP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize::<Self>()?.validated()
    }

    /// Reject settings that would make background work misbehave.
    pub fn validated(self) -> Result<Self, config::ConfigError> {
        let multiplier = self.notifications.multiplier;
        if !multiplier.is_finite() || multiplier < 1.0 {
            return Err(config::ConfigError::Message(format!(
                "notifications.multiplier must be a finite number >= 1.0, got {multiplier}"
            )));
        }
        if self.notifications.max_attempts == 0 {
            return Err(config::ConfigError::Message(
                "notifications.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: Config = config::Config::builder()
            .set_override("server.port", 8080)
            .unwrap()
            .set_override("database.url", "postgres://localhost/matchup")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.workflow.history_limit, 30);
        assert_eq!(config.notifications.max_attempts, 5);
        assert!(config.redis.url.is_none());
        assert!(!config.logging.json);
    }

    #[test]
    fn test_negative_multiplier_is_rejected() {
        let config: Config = config::Config::builder()
            .set_override("server.port", 8080)
            .unwrap()
            .set_override("database.url", "postgres://localhost/matchup")
            .unwrap()
            .set_override("notifications.multiplier", -1.5)
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        let err = config.validated().unwrap_err();
        assert!(err.to_string().contains("notifications.multiplier"));
    }

    #[test]
    fn test_default_config_passes_validation() {
        let config: Config = config::Config::builder()
            .set_override("server.port", 8080)
            .unwrap()
            .set_override("database.url", "postgres://localhost/matchup")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert!(config.validated().is_ok());
    }

    #[test]
    fn test_retry_policy_from_config() {
        let notifications = NotificationConfig {
            max_attempts: 3,
            initial_delay_secs: 10,
            max_delay_secs: 60,
            multiplier: 3.0,
            ..Default::default()
        };
        let policy = notifications.retry_policy();

        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.initial_delay, Duration::from_secs(10));
        assert_eq!(policy.max_delay, Duration::from_secs(60));
    }
}
