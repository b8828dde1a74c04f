//! HTTP server lifecycle with deferred startup.
//!
//! `new()` allocates shared state, `start()` binds the TCP listener, and
//! `serve()` accepts connections until shutdown. The split lets the
//! composition root spawn the worker and dispatcher against the same
//! registry and shutdown controller between construction and serving.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::routing::get;
use axum::Router;
use calcbus_core::MessageBus;
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::config::ServerConfig;
use super::handlers::{
    add_handler, divide_handler, health_handler, liveness_handler, multiply_handler,
    readiness_handler, subtract_handler, AppState,
};
use super::middleware::build_http_layers;
use super::shutdown::ShutdownController;
use crate::correlation::CorrelationRegistry;
use crate::gateway::RequestGateway;

/// How long the drain phase waits for in-flight calls after shutdown.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Manages the HTTP server lifecycle around the correlation core.
pub struct NetworkModule {
    config: ServerConfig,
    listener: Option<TcpListener>,
    registry: Arc<CorrelationRegistry>,
    gateway: Arc<RequestGateway>,
    shutdown: Arc<ShutdownController>,
}

impl NetworkModule {
    /// Creates the module without binding any port.
    ///
    /// The correlation registry and gateway are constructed here and shared
    /// via `Arc` so the dispatcher can resolve replies against the same
    /// registry instance.
    #[must_use]
    pub fn new(config: ServerConfig, bus: Arc<dyn MessageBus>) -> Self {
        let registry = Arc::new(CorrelationRegistry::new());
        let gateway = Arc::new(RequestGateway::new(
            Arc::clone(&registry),
            bus,
            config.request_topic.clone(),
            config.call_timeout,
        ));
        Self {
            config,
            listener: None,
            registry,
            gateway,
            shutdown: Arc::new(ShutdownController::new()),
        }
    }

    /// Shared handle to the correlation registry, for the dispatcher.
    #[must_use]
    pub fn registry(&self) -> Arc<CorrelationRegistry> {
        Arc::clone(&self.registry)
    }

    /// Shared handle to the shutdown controller, for the consumption loops.
    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.shutdown)
    }

    /// Assembles the axum router with all routes and middleware.
    ///
    /// Routes:
    /// - `GET /add`, `/subtract`, `/multiply`, `/divide` -- operations
    /// - `GET /health` -- detailed health JSON
    /// - `GET /health/live`, `/health/ready` -- probes
    #[must_use]
    pub fn build_router(&self) -> Router {
        let state = AppState {
            gateway: Arc::clone(&self.gateway),
            registry: Arc::clone(&self.registry),
            shutdown: Arc::clone(&self.shutdown),
            config: Arc::new(self.config.clone()),
            start_time: Instant::now(),
        };

        let layers = build_http_layers(&self.config);

        Router::new()
            .route("/add", get(add_handler))
            .route("/subtract", get(subtract_handler))
            .route("/multiply", get(multiply_handler))
            .route("/divide", get(divide_handler))
            .route("/health", get(health_handler))
            .route("/health/live", get(liveness_handler))
            .route("/health/ready", get(readiness_handler))
            .layer(layers)
            .with_state(state)
    }

    /// Binds the TCP listener; returns the actual port (relevant with
    /// port 0).
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        info!("TCP listener bound to {}:{}", self.config.host, port);

        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves until the shutdown future resolves, then drains.
    ///
    /// Drain order matters: trigger shutdown (probes flip to draining),
    /// clear the registry so gateways blocked on a reply wake immediately
    /// instead of running out their full deadline, then wait for in-flight
    /// calls to finish their response path.
    ///
    /// # Errors
    ///
    /// Returns an error on a fatal I/O failure.
    ///
    /// # Panics
    ///
    /// Panics if `start()` was not called before `serve()`.
    pub async fn serve(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let router = self.build_router();
        let listener = self
            .listener
            .expect("start() must be called before serve()");
        let registry = self.registry;
        let shutdown_ctrl = self.shutdown;

        shutdown_ctrl.set_ready();
        info!("serving HTTP connections");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;

        shutdown_ctrl.trigger_shutdown();
        registry.clear();

        let drained = shutdown_ctrl.wait_for_drain(DRAIN_TIMEOUT).await;
        if drained {
            info!("all in-flight calls drained");
        } else {
            warn!("drain timeout expired with in-flight calls remaining");
        }
        Ok(())
    }
}
