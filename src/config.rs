use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, error};

/// Application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Environment (dev, staging, prod)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// CORS allowed origins, comma separated
    pub cors_origins: Option<String>,

    /// Name this service signs its own tokens with
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Name of the notes application allowed to push note events
    #[serde(default = "default_app_service_name")]
    pub app_service_name: String,

    /// JWT secret shared with the notes application
    pub auth_jwt_secret: Option<String>,

    /// Database URL
    pub db_url: Option<String>,

    /// Base URL of the notes application's permission API
    pub permission_service_url: Option<String>,

    /// Upper bound for a single permission check or note write
    #[serde(default = "default_upstream_timeout_ms")]
    pub upstream_timeout_ms: u64,

    /// Interval between server pings on a websocket
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,

    /// Silence after which a websocket is considered dead
    #[serde(default = "default_client_timeout_secs")]
    pub client_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables or app.env file
    pub fn load() -> Result<Self, ConfigError> {
        // Try to load from app.env file first
        if std::path::Path::new("app.env").exists() {
            dotenvy::from_filename("app.env").ok();
        } else {
            // Fallback to .env file
            dotenvy::dotenv().ok();
        }

        match envy::from_env::<Config>() {
            Ok(config) => {
                info!("✅ Configuration loaded successfully");
                config.validate()?;
                Ok(config)
            }
            Err(e) => {
                error!("❌ Failed to load configuration: {}", e);
                Err(ConfigError::EnvError(e))
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.heartbeat_interval_secs == 0 || self.client_timeout_secs <= self.heartbeat_interval_secs {
            return Err(ConfigError::Invalid(format!(
                "client_timeout_secs ({}) must exceed heartbeat_interval_secs ({}) and both must be positive",
                self.client_timeout_secs, self.heartbeat_interval_secs
            )));
        }
        if self.upstream_timeout_ms == 0 {
            return Err(ConfigError::Invalid("upstream_timeout_ms must be positive".to_string()));
        }
        Ok(())
    }

    /// Get the full server address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream_timeout_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn client_timeout(&self) -> Duration {
        Duration::from_secs(self.client_timeout_secs)
    }

    /// Check if running in development mode
    pub fn is_development(&self) -> bool {
        self.environment.to_lowercase() == "dev" || self.environment.to_lowercase() == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            cors_origins: None,
            service_name: default_service_name(),
            app_service_name: default_app_service_name(),
            auth_jwt_secret: None,
            db_url: None,
            permission_service_url: None,
            upstream_timeout_ms: default_upstream_timeout_ms(),
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            client_timeout_secs: default_client_timeout_secs(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    EnvError(envy::Error),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::EnvError(e) => write!(f, "Environment variable error: {}", e),
            ConfigError::Invalid(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_service_name() -> String {
    "note-collab".to_string()
}

fn default_app_service_name() -> String {
    "notes-app".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_upstream_timeout_ms() -> u64 {
    5_000
}

fn default_heartbeat_interval_secs() -> u64 {
    25
}

fn default_client_timeout_secs() -> u64 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server_address(), "0.0.0.0:5000");
        assert!(config.is_development());
    }

    #[test]
    fn reads_from_env_pairs() {
        let vars = vec![
            ("PORT".to_string(), "7000".to_string()),
            ("AUTH_JWT_SECRET".to_string(), "s3cret".to_string()),
            ("UPSTREAM_TIMEOUT_MS".to_string(), "250".to_string()),
        ];
        let config: Config = envy::from_iter(vars).unwrap();
        assert_eq!(config.port, 7000);
        assert_eq!(config.auth_jwt_secret.as_deref(), Some("s3cret"));
        assert_eq!(config.upstream_timeout(), Duration::from_millis(250));
        assert_eq!(config.client_timeout_secs, 60);
    }

    #[test]
    fn heartbeat_must_fit_inside_client_timeout() {
        let config = Config {
            heartbeat_interval_secs: 30,
            client_timeout_secs: 30,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
