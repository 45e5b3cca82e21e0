//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables using the
//! `config` and `dotenvy` crates. Variables use the `ATTUNE` prefix and
//! `__` between nested keys.
//!
//! # Example
//!
//! ```no_run
//! use attune::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod auth;
mod database;
mod error;
mod redis;
mod server;
mod sessions;
mod video;

pub use self::auth::AuthConfig;
pub use self::database::DatabaseConfig;
pub use self::error::{ConfigError, ValidationError};
pub use self::redis::RedisConfig;
pub use self::server::{Environment, ServerConfig};
pub use self::sessions::SessionsConfig;
pub use self::video::VideoConfig;

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// PostgreSQL. Without it the service runs on in-memory storage,
    /// which is refused in production.
    #[serde(default)]
    pub database: Option<DatabaseConfig>,

    /// Redis for distributed locks. Without it locks are in-process.
    #[serde(default)]
    pub redis: Option<RedisConfig>,

    pub auth: AuthConfig,

    pub video: VideoConfig,

    #[serde(default)]
    pub sessions: SessionsConfig,
}

impl AppConfig {
    /// Load configuration from the environment.
    ///
    /// 1. Loads `.env` if present (development)
    /// 2. Reads variables with the `ATTUNE` prefix
    /// 3. Splits nested keys on `__`
    ///
    /// - `ATTUNE__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `ATTUNE__SESSIONS__WAITING_TIMEOUT_SECS=90` -> `sessions.waiting_timeout_secs = 90`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("ATTUNE")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Semantic validation of every section.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        match &self.database {
            Some(database) => database.validate()?,
            None if self.is_production() => {
                return Err(ValidationError::MissingRequired("DATABASE_URL"))
            }
            None => {}
        }
        if let Some(redis) = &self.redis {
            redis.validate()?;
        }
        self.auth.validate(self.server.environment)?;
        self.video.validate()?;
        self.sessions.validate()?;
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Env vars are process-global
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const KEYS: &[&str] = &[
        "ATTUNE__DATABASE__URL",
        "ATTUNE__REDIS__URL",
        "ATTUNE__AUTH__ISSUER",
        "ATTUNE__AUTH__AUDIENCE",
        "ATTUNE__VIDEO__APP_ID",
        "ATTUNE__VIDEO__APP_CERTIFICATE",
        "ATTUNE__SERVER__PORT",
        "ATTUNE__SERVER__ENVIRONMENT",
        "ATTUNE__SESSIONS__WAITING_TIMEOUT_SECS",
    ];

    fn set_minimal_env() {
        env::set_var("ATTUNE__AUTH__ISSUER", "https://auth.example.com");
        env::set_var("ATTUNE__AUTH__AUDIENCE", "attune-api");
        env::set_var("ATTUNE__VIDEO__APP_ID", "video-app");
        env::set_var("ATTUNE__VIDEO__APP_CERTIFICATE", "video-cert");
    }

    fn clear_env() {
        for key in KEYS {
            env::remove_var(key);
        }
    }

    fn load_with(extra: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        set_minimal_env();
        for (key, value) in extra {
            env::set_var(key, value);
        }
        let result = AppConfig::load();
        clear_env();
        result
    }

    #[test]
    fn loads_minimal_environment_with_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let config = load_with(&[]).unwrap();

        assert_eq!(config.server.port, 8080);
        assert!(config.database.is_none());
        assert!(config.redis.is_none());
        assert_eq!(config.sessions.waiting_timeout_secs, 120);
        assert_eq!(config.video.token_ttl_secs, 3600);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn nested_overrides_are_applied() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let config = load_with(&[
            ("ATTUNE__SERVER__PORT", "3000"),
            ("ATTUNE__SESSIONS__WAITING_TIMEOUT_SECS", "90"),
            ("ATTUNE__DATABASE__URL", "postgres://attune@localhost/attune"),
            ("ATTUNE__REDIS__URL", "redis://localhost:6379"),
        ])
        .unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.sessions.waiting_timeout_secs, 90);
        assert!(config.database.is_some());
        assert_eq!(
            config.redis.map(|r| r.url),
            Some("redis://localhost:6379".to_string())
        );
    }

    #[test]
    fn production_without_database_is_invalid() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let config = load_with(&[("ATTUNE__SERVER__ENVIRONMENT", "production")]).unwrap();

        assert!(config.is_production());
        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingRequired("DATABASE_URL"))
        );
    }

    #[test]
    fn missing_video_section_fails_to_load() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("ATTUNE__AUTH__ISSUER", "https://auth.example.com");
        env::set_var("ATTUNE__AUTH__AUDIENCE", "attune-api");
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_err());
    }
}
