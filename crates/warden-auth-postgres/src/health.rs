//! Connection health monitoring.
//!
//! [`PoolHealthMonitor`] pings the pool on a fixed interval. A failed ping is
//! retried with exponential backoff and jitter; when every retry fails the
//! monitor marks the pool unhealthy and keeps probing on the next tick. The
//! monitor runs until its owner flips the shutdown signal.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rand::Rng;
use sqlx_core::query::query;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::PgPool;

/// Ping interval and reconnect backoff.
#[derive(Debug, Clone)]
pub struct HealthSettings {
    pub interval: Duration,
    pub retry_attempts: u32,
    pub backoff_factor: u32,
    pub min_jitter: Duration,
    pub max_jitter: Duration,
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            retry_attempts: 3,
            backoff_factor: 2,
            min_jitter: Duration::from_millis(100),
            max_jitter: Duration::from_secs(1),
        }
    }
}

impl HealthSettings {
    /// Delay before retry `attempt` (0-based): `min * factor^attempt`,
    /// capped at `max`, then jittered uniformly between `min` and that value.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let ceiling = self
            .min_jitter
            .saturating_mul(self.backoff_factor.saturating_pow(attempt))
            .min(self.max_jitter);
        if ceiling <= self.min_jitter {
            return ceiling;
        }
        rand::thread_rng().gen_range(self.min_jitter..=ceiling)
    }
}

/// Background task owning the health check of one pool.
pub struct PoolHealthMonitor {
    healthy: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl PoolHealthMonitor {
    /// Spawns the monitor. It stops once `shutdown` becomes `true` or its
    /// sender is dropped.
    #[must_use]
    pub fn spawn(
        pool: Arc<PgPool>,
        settings: HealthSettings,
        mut shutdown: watch::Receiver<bool>,
    ) -> Self {
        let healthy = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&healthy);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(settings.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        let ok = check_with_retries(&pool, &settings).await;
                        let was = flag.swap(ok, Ordering::SeqCst);
                        match (was, ok) {
                            (true, false) => error!("database unreachable after retries"),
                            (false, true) => info!("database connection recovered"),
                            _ => {}
                        }
                    }
                }
            }
            debug!("pool health monitor stopped");
        });

        Self { healthy, handle }
    }

    /// Result of the most recent health check.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }

    /// Shared handle to the health flag.
    #[must_use]
    pub fn health_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.healthy)
    }

    /// Waits for the task to finish after shutdown was signalled.
    pub async fn join(self) {
        if let Err(e) = self.handle.await {
            warn!(error = %e, "pool health monitor panicked");
        }
    }
}

async fn ping(pool: &PgPool) -> Result<(), sqlx_core::Error> {
    query("SELECT 1").execute(pool).await.map(|_| ())
}

/// One ping plus up to `retry_attempts` retries.
async fn check_with_retries(pool: &PgPool, settings: &HealthSettings) -> bool {
    let mut attempt = 0;
    loop {
        match ping(pool).await {
            Ok(()) => return true,
            Err(e) if attempt < settings.retry_attempts => {
                let delay = settings.backoff(attempt);
                warn!(attempt = attempt + 1, delay = ?delay, error = %e, "database ping failed, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                warn!(error = %e, "database ping failed");
                return false;
            }
        }
    }
}
