use std::future::IntoFuture;
use std::net::SocketAddr;
use std::time::Duration;

use axum::{Router, extract::FromRef, routing::get};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use warden_auth::prelude::*;

use crate::bootstrap::{BootstrapError, Runtime, StorageHealth};
use crate::cache::CacheBackend;
use crate::{config::AppConfig, handlers, routes};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub auth: AuthState,
    pub storage: StorageHealth,
    pub cache: CacheBackend,
}

impl AppState {
    pub fn new(services: Services, storage: StorageHealth, cache: CacheBackend) -> Self {
        Self {
            auth: AuthState::new(services.tokens.clone()),
            services,
            storage,
            cache,
        }
    }
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

pub struct WardenServer {
    addr: SocketAddr,
    app: Router,
    runtime: Runtime,
    shutdown_timeout: Duration,
}

pub fn build_app(cfg: &AppConfig, state: AppState) -> Router {
    let body_limit = cfg.server.body_limit_bytes;
    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .nest("/api", routes::api_routes())
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        http.status_code = Empty,
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>, latency: Duration, span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    /// Connects backends, seeds reserved data and builds the router.
    pub async fn build(self) -> Result<WardenServer, BootstrapError> {
        let runtime = Runtime::start(&self.config).await?;
        runtime.seed().await?;

        let state = AppState::new(
            runtime.services.clone(),
            runtime.storage.clone(),
            runtime.cache.clone(),
        );
        let app = build_app(&self.config, state);

        Ok(WardenServer {
            addr: self.addr,
            app,
            runtime,
            shutdown_timeout: self.config.server.shutdown_timeout,
        })
    }
}

impl WardenServer {
    /// Serves on the configured address until a shutdown signal arrives.
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Serves on an already bound listener until `signal` resolves.
    ///
    /// In-flight requests get `shutdown_timeout` to finish after the signal.
    pub async fn serve<F>(self, listener: tokio::net::TcpListener, signal: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!("listening on {addr}");

        let (drained_tx, drained_rx) = tokio::sync::oneshot::channel::<()>();
        let timeout = self.shutdown_timeout;
        let graceful = async move {
            signal.await;
            let _ = drained_tx.send(());
        };

        let server = axum::serve(listener, self.app)
            .with_graceful_shutdown(graceful)
            .into_future();
        tokio::select! {
            result = server => result?,
            () = async {
                let _ = drained_rx.await;
                tokio::time::sleep(timeout).await;
            } => {
                tracing::warn!(timeout = ?timeout, "shutdown timeout elapsed, dropping open connections");
            }
        }

        self.runtime.shutdown().await;
        tracing::info!("server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
