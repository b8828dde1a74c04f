//! Server configuration.

use std::time::Duration;

/// Top-level configuration for the calcbus server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address for the server.
    pub host: String,
    /// Port to listen on. 0 means OS-assigned.
    pub port: u16,
    /// Allowed CORS origins for the browser frontend.
    pub cors_origins: Vec<String>,
    /// Transport-level cap on total request processing time. Kept above
    /// `call_timeout` so the gateway's own deadline fires first and the
    /// caller gets a structured timeout body instead of a bare 408.
    pub request_timeout: Duration,
    /// Gateway deadline: how long a call waits for its bus reply.
    pub call_timeout: Duration,
    /// Bus topic the gateway publishes operation requests to.
    pub request_topic: String,
    /// Bus topic the worker publishes replies to.
    pub reply_topic: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
            request_timeout: Duration::from_secs(30),
            call_timeout: Duration::from_secs(10),
            request_topic: "operation-requests".to_string(),
            reply_topic: "operation-replies".to_string(),
        }
    }
}
