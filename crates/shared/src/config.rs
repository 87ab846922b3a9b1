//! Application configuration management.

use serde::Deserialize;

/// Environment variable holding the process-wide R2 secret encryption key.
pub const ENCRYPTION_KEY_ENV: &str = "R2_AES256_ENCRYPTION_KEY";

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Redis configuration (delete queue backing store).
    #[serde(default)]
    pub redis: RedisConfig,
    /// Object storage configuration.
    #[serde(default)]
    pub storage: StorageSettings,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Redis connection parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    /// Redis host.
    #[serde(default = "default_redis_host")]
    pub host: String,
    /// Redis port.
    #[serde(default = "default_redis_port")]
    pub port: u16,
    /// Optional password.
    #[serde(default)]
    pub password: Option<String>,
    /// Logical database index.
    #[serde(default)]
    pub db: u8,
    /// Connection pool size.
    #[serde(default = "default_redis_pool_size")]
    pub pool_size: usize,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: default_redis_host(),
            port: default_redis_port(),
            password: None,
            db: 0,
            pool_size: default_redis_pool_size(),
        }
    }
}

fn default_redis_host() -> String {
    "127.0.0.1".to_string()
}

fn default_redis_port() -> u16 {
    6379
}

fn default_redis_pool_size() -> usize {
    16
}

impl RedisConfig {
    /// Builds a `redis://` connection URL from the parameters.
    ///
    /// The password is percent-encoded so reserved characters survive URL
    /// parsing.
    #[must_use]
    pub fn url(&self) -> String {
        match self.password.as_deref().filter(|p| !p.is_empty()) {
            Some(password) => format!(
                "redis://:{}@{}:{}/{}",
                urlencoding::encode(password),
                self.host,
                self.port,
                self.db
            ),
            None => format!("redis://{}:{}/{}", self.host, self.port, self.db),
        }
    }
}

/// Object storage settings.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// AES-256 key used to encrypt tenant R2 secrets (base64 or raw 32 bytes).
    ///
    /// Falls back to [`ENCRYPTION_KEY_ENV`] when unset.
    #[serde(default)]
    pub encryption_key: Option<String>,
    /// Maximum accepted upload size in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            encryption_key: None,
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024 // 10MB
}

impl StorageSettings {
    /// Returns the configured encryption key, falling back to the environment.
    #[must_use]
    pub fn resolved_encryption_key(&self) -> Option<String> {
        self.encryption_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| {
                std::env::var(ENCRYPTION_KEY_ENV)
                    .ok()
                    .filter(|k| !k.is_empty())
            })
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("PICTOR")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_from_environment() {
        temp_env::with_vars(
            [
                ("PICTOR__DATABASE__URL", Some("postgres://localhost/pictor")),
                ("PICTOR__REDIS__PORT", Some("6380")),
                ("PICTOR__REDIS__POOL_SIZE", Some("4")),
            ],
            || {
                let config = AppConfig::load().expect("config should load");
                assert_eq!(config.database.url, "postgres://localhost/pictor");
                assert_eq!(config.database.max_connections, 10);
                assert_eq!(config.redis.port, 6380);
                assert_eq!(config.redis.pool_size, 4);
                assert_eq!(config.server.port, 8080);
                assert_eq!(config.storage.max_upload_bytes, 10 * 1024 * 1024);
            },
        );
    }

    #[test]
    fn test_redis_url() {
        let mut redis = RedisConfig::default();
        assert_eq!(redis.url(), "redis://127.0.0.1:6379/0");

        redis.password = Some("s3cret".to_string());
        redis.db = 2;
        assert_eq!(redis.url(), "redis://:s3cret@127.0.0.1:6379/2");
    }

    #[test]
    fn test_redis_url_encodes_reserved_password_characters() {
        let redis = RedisConfig {
            password: Some("p@ss:w/rd#1".to_string()),
            ..RedisConfig::default()
        };
        assert_eq!(redis.url(), "redis://:p%40ss%3Aw%2Frd%231@127.0.0.1:6379/0");
    }

    #[test]
    fn test_encryption_key_falls_back_to_env() {
        temp_env::with_var(ENCRYPTION_KEY_ENV, Some("from-env"), || {
            let settings = StorageSettings::default();
            assert_eq!(settings.resolved_encryption_key().as_deref(), Some("from-env"));

            let settings = StorageSettings {
                encryption_key: Some("from-config".to_string()),
                ..StorageSettings::default()
            };
            assert_eq!(
                settings.resolved_encryption_key().as_deref(),
                Some("from-config")
            );
        });

        temp_env::with_var_unset(ENCRYPTION_KEY_ENV, || {
            assert!(StorageSettings::default().resolved_encryption_key().is_none());
        });
    }
}
