use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, time::Duration};
use warden_auth::AuthConfig;
use warden_auth_postgres::{HealthSettings, PoolSettings};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    /// PostgreSQL connection, used when `storage.backend = "postgres"`
    #[serde(default)]
    pub postgres: PostgresConfig,
    /// Shared cache for entities and session tokens
    #[serde(default)]
    pub redis: RedisConfig,
    /// Token, cache and resolver configuration
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        if self.storage.backend == StorageBackend::Postgres {
            let pg = &self.postgres;
            if pg.url.is_none() && pg.host.is_empty() {
                return Err("postgres requires either 'url' or 'host' to be set".into());
            }
            if pg.url.is_none() && pg.database.is_empty() {
                return Err("postgres.database must not be empty".into());
            }
            if pg.pool_size == 0 {
                return Err("postgres.pool_size must be > 0".into());
            }
            if pg.min_idle > pg.pool_size {
                return Err("postgres.min_idle must be <= postgres.pool_size".into());
            }
            if pg.min_jitter > pg.max_jitter {
                return Err("postgres.min_jitter must be <= postgres.max_jitter".into());
            }
        }
        if self.redis.enabled && self.redis.url.is_empty() {
            return Err("redis.enabled=true requires redis.url".into());
        }
        if self.redis.local_purge_interval.is_zero() {
            return Err("redis.local_purge_interval must be > 0".into());
        }
        self.auth
            .validate()
            .map_err(|e| format!("auth config error: {e}"))?;
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Time allowed for in-flight requests after a shutdown signal
    #[serde(default = "default_shutdown_timeout", with = "humantime_serde")]
    pub shutdown_timeout: Duration,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}
fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(30)
}
fn default_body_limit() -> usize {
    64 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            shutdown_timeout: default_shutdown_timeout(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

/// Which relational store backs the repositories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Postgres,
    /// In-process store, lost on restart. For development and tests.
    Memory,
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackend::Postgres => write!(f, "postgres"),
            StorageBackend::Memory => write!(f, "memory"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
}

/// PostgreSQL connection configuration
///
/// Either set `url` to a full connection string, or set `host`, `port`,
/// `user`, `password` and `database` individually. `url` wins when both are
/// present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_postgres_host")]
    pub host: String,
    #[serde(default = "default_postgres_port")]
    pub port: u16,
    #[serde(default = "default_postgres_user")]
    pub user: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_postgres_database")]
    pub database: String,
    /// Maximum open connections
    #[serde(default = "default_postgres_pool_size")]
    pub pool_size: u32,
    /// Connections kept open while idle
    #[serde(default = "default_postgres_min_idle")]
    pub min_idle: u32,
    #[serde(default = "default_postgres_connect_timeout", with = "humantime_serde")]
    pub connect_timeout: Duration,
    #[serde(default = "default_postgres_max_lifetime", with = "humantime_serde")]
    pub max_lifetime: Duration,
    /// Interval between health-check pings
    #[serde(default = "default_health_interval", with = "humantime_serde")]
    pub health_check_interval: Duration,
    /// Ping retries before the pool is reported unhealthy
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: u32,
    #[serde(default = "default_min_jitter", with = "humantime_serde")]
    pub min_jitter: Duration,
    #[serde(default = "default_max_jitter", with = "humantime_serde")]
    pub max_jitter: Duration,
}

fn default_postgres_host() -> String {
    "localhost".into()
}
fn default_postgres_port() -> u16 {
    5432
}
fn default_postgres_user() -> String {
    "postgres".into()
}
fn default_postgres_database() -> String {
    "warden".into()
}
fn default_postgres_pool_size() -> u32 {
    5
}
fn default_postgres_min_idle() -> u32 {
    3
}
fn default_postgres_connect_timeout() -> Duration {
    Duration::from_secs(10)
}
fn default_postgres_max_lifetime() -> Duration {
    Duration::from_secs(60 * 60)
}
fn default_health_interval() -> Duration {
    Duration::from_secs(1)
}
fn default_retry_attempts() -> u32 {
    3
}
fn default_backoff_factor() -> u32 {
    2
}
fn default_min_jitter() -> Duration {
    Duration::from_millis(100)
}
fn default_max_jitter() -> Duration {
    Duration::from_secs(1)
}

impl PostgresConfig {
    /// Returns `url` if set, otherwise builds one from the individual options.
    pub fn connection_url(&self) -> String {
        if let Some(ref url) = self.url {
            return url.clone();
        }
        let password_part = self
            .password
            .as_ref()
            .map(|p| format!(":{p}"))
            .unwrap_or_default();
        format!(
            "postgres://{}{}@{}:{}/{}",
            self.user, password_part, self.host, self.port, self.database
        )
    }

    pub fn pool_settings(&self) -> PoolSettings {
        PoolSettings {
            max_connections: self.pool_size,
            min_connections: self.min_idle,
            acquire_timeout: self.connect_timeout,
            max_lifetime: self.max_lifetime,
        }
    }

    pub fn health_settings(&self) -> HealthSettings {
        HealthSettings {
            interval: self.health_check_interval,
            retry_attempts: self.retry_attempts,
            backoff_factor: self.backoff_factor,
            min_jitter: self.min_jitter,
            max_jitter: self.max_jitter,
        }
    }
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: default_postgres_host(),
            port: default_postgres_port(),
            user: default_postgres_user(),
            password: None,
            database: default_postgres_database(),
            pool_size: default_postgres_pool_size(),
            min_idle: default_postgres_min_idle(),
            connect_timeout: default_postgres_connect_timeout(),
            max_lifetime: default_postgres_max_lifetime(),
            health_check_interval: default_health_interval(),
            retry_attempts: default_retry_attempts(),
            backoff_factor: default_backoff_factor(),
            min_jitter: default_min_jitter(),
            max_jitter: default_max_jitter(),
        }
    }
}

/// Redis configuration for sharing sessions and cached entities across
/// instances.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Enable Redis. Without it every instance keeps its own in-process cache.
    #[serde(default)]
    pub enabled: bool,
    /// Redis connection URL (e.g., "redis://localhost:6379")
    #[serde(default = "default_redis_url")]
    pub url: String,
    #[serde(default = "default_redis_pool_size")]
    pub pool_size: usize,
    #[serde(default = "default_redis_connect_timeout", with = "humantime_serde")]
    pub connect_timeout: Duration,
    #[serde(default = "default_redis_io_timeout", with = "humantime_serde")]
    pub read_timeout: Duration,
    #[serde(default = "default_redis_io_timeout", with = "humantime_serde")]
    pub write_timeout: Duration,
    /// How often the in-process fallback drops expired entries.
    #[serde(default = "default_local_purge_interval", with = "humantime_serde")]
    pub local_purge_interval: Duration,
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}
fn default_redis_pool_size() -> usize {
    10
}
fn default_redis_connect_timeout() -> Duration {
    Duration::from_secs(5)
}
fn default_redis_io_timeout() -> Duration {
    Duration::from_secs(2)
}
fn default_local_purge_interval() -> Duration {
    Duration::from_secs(60)
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: default_redis_url(),
            pool_size: default_redis_pool_size(),
            connect_timeout: default_redis_connect_timeout(),
            read_timeout: default_redis_io_timeout(),
            write_timeout: default_redis_io_timeout(),
            local_purge_interval: default_local_purge_interval(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    /// Default configuration file, relative to the working directory.
    pub const DEFAULT_CONFIG_PATH: &str = "warden.toml";

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_PATH));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        // Environment variable overrides, e.g., WARDEN__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("WARDEN")
                .prefix_separator("__")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}
