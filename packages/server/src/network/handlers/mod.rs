//! Request handlers and the shared application state.

pub mod calc;
pub mod health;

use std::sync::Arc;
use std::time::Instant;

use crate::correlation::CorrelationRegistry;
use crate::gateway::RequestGateway;
use crate::network::config::ServerConfig;
use crate::network::shutdown::ShutdownController;

pub use calc::{add_handler, divide_handler, multiply_handler, subtract_handler};
pub use health::{health_handler, liveness_handler, readiness_handler};

/// Shared state injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<RequestGateway>,
    pub registry: Arc<CorrelationRegistry>,
    pub shutdown: Arc<ShutdownController>,
    pub config: Arc<ServerConfig>,
    pub start_time: Instant,
}
