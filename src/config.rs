use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const CONFIG_DIR: &str = "config";
const DEFAULT_DATABASE_URL: &str = "sqlite://m2e_store.db?mode=rwc";

/// Every table owned by this crate starts with this prefix.
pub const TABLE_PREFIX: &str = "m2epro_";

/// Process configuration, loaded once at startup.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    #[validate(length(min = 1))]
    pub database_url: String,

    /// Application environment
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Run the installer when the binary starts
    #[serde(default)]
    pub auto_install: bool,

    /// Table name prefix; kept configurable only so that a wrong value is rejected loudly
    #[serde(default = "default_table_prefix")]
    #[validate(custom = "validate_table_prefix")]
    pub table_prefix: String,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    #[validate(range(min = 1))]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB timeouts (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// Log every SQL statement through sqlx
    #[serde(default)]
    pub db_sqlx_logging: bool,

    /// Maximum number of instructions a consumer claims at once
    #[serde(default = "default_instruction_batch_size")]
    #[validate(range(min = 1, max = 10000))]
    pub instruction_batch_size: u64,

    /// Lifetime of a processing record when the caller gives none
    #[serde(default = "default_processing_ttl_secs")]
    #[validate(range(min = 1))]
    pub processing_default_ttl_secs: u64,

    /// Lifetime of a pending request continuation when the caller gives none
    #[serde(default = "default_request_pending_ttl_secs")]
    #[validate(range(min = 1))]
    pub request_pending_ttl_secs: u64,

    /// Attempts to create a local order before giving up
    #[serde(default = "default_order_creation_max_attempts")]
    #[validate(range(min = 1))]
    pub order_creation_max_attempts: i32,

    /// An attempt older than this is considered dead and may be re-claimed
    #[serde(default = "default_order_creation_attempt_timeout_secs")]
    pub order_creation_attempt_timeout_secs: u64,
}

impl AppConfig {
    /// Creates a configuration with defaults for everything but the database URL
    pub fn new(database_url: String, environment: String) -> Self {
        Self {
            database_url,
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_install: false,
            table_prefix: default_table_prefix(),
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            db_sqlx_logging: false,
            instruction_batch_size: default_instruction_batch_size(),
            processing_default_ttl_secs: default_processing_ttl_secs(),
            request_pending_ttl_secs: default_request_pending_ttl_secs(),
            order_creation_max_attempts: default_order_creation_max_attempts(),
            order_creation_attempt_timeout_secs: default_order_creation_attempt_timeout_secs(),
        }
    }

    /// Gets database URL reference
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Checks if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn processing_ttl(&self) -> Duration {
        Duration::from_secs(self.processing_default_ttl_secs)
    }

    pub fn request_pending_ttl(&self) -> Duration {
        Duration::from_secs(self.request_pending_ttl_secs)
    }

    pub fn order_creation_attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.order_creation_attempt_timeout_secs)
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.db_min_connections > self.db_max_connections {
            let mut err = ValidationError::new("db_min_connections");
            err.message = Some("db_min_connections must not exceed db_max_connections".into());
            errors.add("db_min_connections", err);
        }

        if self.is_production() && self.database_url.starts_with("sqlite::memory") {
            let mut err = ValidationError::new("database_url_in_memory");
            err.message = Some("An in-memory database cannot be used in production".into());
            errors.add("database_url", err);
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Default value functions
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

fn default_table_prefix() -> String {
    TABLE_PREFIX.to_string()
}

fn default_db_max_connections() -> u32 {
    16
}
fn default_db_min_connections() -> u32 {
    1
}
fn default_db_connect_timeout_secs() -> u64 {
    30
}
fn default_db_idle_timeout_secs() -> u64 {
    600
}
fn default_db_acquire_timeout_secs() -> u64 {
    8
}

fn default_instruction_batch_size() -> u64 {
    1000
}

fn default_processing_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_request_pending_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_order_creation_max_attempts() -> i32 {
    3
}

fn default_order_creation_attempt_timeout_secs() -> u64 {
    15 * 60
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

fn validate_table_prefix(prefix: &str) -> Result<(), ValidationError> {
    if prefix == TABLE_PREFIX {
        Ok(())
    } else {
        let mut err = ValidationError::new("table_prefix");
        err.message = Some(format!("Table prefix is fixed to '{}'", TABLE_PREFIX).into());
        Err(err)
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    load_config_from(Path::new(CONFIG_DIR))
}

pub fn load_config_from(config_dir: &Path) -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !config_dir.exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            config_dir.display()
        );
    }

    let config = Config::builder()
        .set_default("database_url", DEFAULT_DATABASE_URL)?
        .set_default("environment", run_env.as_str())?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::from(config_dir.join("default")).required(false))
        .add_source(File::from(config_dir.join(&run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn defaults_pass_validation() {
        let cfg = AppConfig::new("sqlite::memory:".into(), "test".into());
        assert!(cfg.validate().is_ok());
        assert!(cfg.validate_additional_constraints().is_ok());
        assert_eq!(cfg.table_prefix, TABLE_PREFIX);
    }

    #[test]
    fn rejects_foreign_table_prefix() {
        let mut cfg = AppConfig::new("sqlite::memory:".into(), "test".into());
        cfg.table_prefix = "shop_".into();
        let errors = cfg.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("table_prefix"));
    }

    #[test]
    fn rejects_inverted_pool_bounds() {
        let mut cfg = AppConfig::new("sqlite::memory:".into(), "test".into());
        cfg.db_min_connections = 10;
        cfg.db_max_connections = 2;
        assert!(cfg.validate_additional_constraints().is_err());
    }

    #[test]
    fn production_rejects_in_memory_database() {
        let cfg = AppConfig::new("sqlite::memory:".into(), "production".into());
        assert!(cfg.validate_additional_constraints().is_err());
    }

    #[test]
    fn loads_values_from_default_file() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("default.toml"),
            r#"
                database_url = "sqlite://from_file.db?mode=rwc"
                log_level = "debug"
                instruction_batch_size = 50
            "#,
        )
        .unwrap();

        let cfg = load_config_from(dir.path()).unwrap();
        assert_eq!(cfg.log_level, "debug");
        assert_eq!(cfg.instruction_batch_size, 50);
    }

    #[test]
    fn rejects_unknown_log_level_in_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("default.toml"), "log_level = \"loud\"\n").unwrap();

        let result = load_config_from(dir.path());
        assert!(matches!(result, Err(AppConfigError::Validation(_))));
    }
}
