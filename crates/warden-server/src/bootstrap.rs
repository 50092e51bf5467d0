//! Startup wiring: storage backend, cache store and services.
//!
//! The resulting [`Runtime`] owns the background tasks started here and
//! stops them in [`Runtime::shutdown`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;
use warden_auth::prelude::*;
use warden_auth_postgres::{PoolHealthMonitor, PostgresAuthStorage, StorageError};

use crate::cache::{CacheBackend, create_cache_backend, spawn_local_purge};
use crate::config::{AppConfig, StorageBackend};

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("failed to connect to PostgreSQL: {0}")]
    Connect(#[source] StorageError),

    #[error("failed to install schema: {0}")]
    Schema(#[source] StorageError),

    #[error("seeding failed: {0}")]
    Seed(#[from] AuthError),
}

/// Liveness of the relational store as seen by the server.
#[derive(Clone)]
pub enum StorageHealth {
    /// The in-memory backend cannot fail.
    Memory,
    Postgres(Arc<AtomicBool>),
}

impl StorageHealth {
    pub fn is_healthy(&self) -> bool {
        match self {
            StorageHealth::Memory => true,
            StorageHealth::Postgres(flag) => flag.load(Ordering::SeqCst),
        }
    }
}

/// Services plus the resources they run on.
pub struct Runtime {
    pub services: Services,
    pub cache: CacheBackend,
    pub storage: StorageHealth,
    shutdown: watch::Sender<bool>,
    monitor: Option<PoolHealthMonitor>,
    purge: Option<JoinHandle<()>>,
}

impl Runtime {
    /// Connects storage and cache, then wires every service.
    pub async fn start(cfg: &AppConfig) -> Result<Self, BootstrapError> {
        let cache = create_cache_backend(&cfg.redis).await;
        let store: Arc<dyn CacheStore> = Arc::new(cache.clone());
        let (shutdown, shutdown_rx) = watch::channel(false);
        let purge = match &cache {
            CacheBackend::Local(local) => Some(spawn_local_purge(
                local.clone(),
                cfg.redis.local_purge_interval,
                shutdown.subscribe(),
            )),
            CacheBackend::Redis { .. } => None,
        };

        let (services, storage, monitor) = match cfg.storage.backend {
            StorageBackend::Memory => {
                info!("using in-memory storage; data is lost on restart");
                let services = Services::build(Arc::new(MemoryStorage::new()), store, &cfg.auth);
                (services, StorageHealth::Memory, None)
            }
            StorageBackend::Postgres => {
                let url = cfg.postgres.connection_url();
                let pg = PostgresAuthStorage::connect_with(&url, &cfg.postgres.pool_settings())
                    .await
                    .map_err(BootstrapError::Connect)?;
                pg.ensure_schema().await.map_err(BootstrapError::Schema)?;

                let monitor = PoolHealthMonitor::spawn(
                    pg.pool_arc(),
                    cfg.postgres.health_settings(),
                    shutdown_rx,
                );
                let health = StorageHealth::Postgres(monitor.health_flag());
                let services = Services::build(Arc::new(pg), store, &cfg.auth);
                (services, health, Some(monitor))
            }
        };

        info!(
            storage = %cfg.storage.backend,
            cache = cache.mode(),
            "services initialized"
        );

        Ok(Self {
            services,
            cache,
            storage,
            shutdown,
            monitor,
            purge,
        })
    }

    /// Installs the reserved groups and permissions.
    pub async fn seed(&self) -> Result<SeedReport, BootstrapError> {
        Ok(self.services.seeder().run().await?)
    }

    /// Stops background tasks.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Some(monitor) = self.monitor {
            monitor.join().await;
        }
        if let Some(purge) = self.purge {
            let _ = purge.await;
        }
    }
}
