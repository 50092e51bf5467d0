pub mod bootstrap;
pub mod cache;
pub mod config;
pub mod handlers;
pub mod observability;
pub mod routes;
pub mod server;

pub use bootstrap::{BootstrapError, Runtime, StorageHealth};
pub use cache::{CacheBackend, create_cache_backend};
pub use config::{
    AppConfig, LoggingConfig, PostgresConfig, RedisConfig, ServerConfig, StorageBackend,
    StorageConfig,
};
pub use observability::init_tracing;
pub use server::{AppState, ServerBuilder, WardenServer, build_app};
