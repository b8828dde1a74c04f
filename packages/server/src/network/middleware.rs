//! Tower middleware stack applied to all HTTP requests.
//!
//! Ordering is outer-to-inner: the first layer listed processes the request
//! first on the way in and the response last on the way out. Request-ID
//! handling matters here: the set layer mints a UUID `x-request-id` when the
//! caller did not supply one, and the propagate layer echoes it back on the
//! response, so every caller can correlate their call with its bus traffic.

use axum::http::header::HeaderName;
use axum::http::{Method, StatusCode};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::config::ServerConfig;

/// The composed Tower layer type produced by [`build_http_layers`].
///
/// Each layer wraps the next in a `Stack`, from outermost (first applied)
/// to innermost (last applied). The alias keeps the builder readable.
type HttpLayers = tower::layer::util::Stack<
    PropagateRequestIdLayer,
    tower::layer::util::Stack<
        TimeoutLayer,
        tower::layer::util::Stack<
            CorsLayer,
            tower::layer::util::Stack<
                TraceLayer<
                    tower_http::classify::SharedClassifier<
                        tower_http::classify::ServerErrorsAsFailures,
                    >,
                >,
                tower::layer::util::Stack<
                    SetRequestIdLayer<MakeRequestUuid>,
                    tower::layer::util::Identity,
                >,
            >,
        >,
    >,
>;

/// Builds the HTTP middleware stack from the server configuration.
///
/// **Ordering (outermost to innermost):**
/// 1. `SetRequestId` -- adopts the inbound `x-request-id` or mints a UUID v4
/// 2. `Tracing` -- structured request/response spans
/// 3. `CORS` -- origins from config (the calculator frontend is a browser)
/// 4. `Timeout` -- transport-level backstop above the gateway deadline
/// 5. `PropagateRequestId` -- echoes `x-request-id` on the response
#[must_use]
pub fn build_http_layers(config: &ServerConfig) -> HttpLayers {
    let x_request_id = HeaderName::from_static("x-request-id");

    let cors = build_cors_layer(&config.cors_origins);

    ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout,
        ))
        .layer(PropagateRequestIdLayer::new(x_request_id))
        .into_inner()
}

/// Builds the CORS layer from the configured origin list; `"*"` allows any.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let parsed: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET])
        .allow_headers(Any)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn builds_with_defaults() {
        let config = ServerConfig::default();
        let _layers = build_http_layers(&config);
    }

    #[test]
    fn builds_with_explicit_origins() {
        let config = ServerConfig {
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "https://example.com".to_string(),
            ],
            ..ServerConfig::default()
        };
        let _layers = build_http_layers(&config);
    }

    #[test]
    fn builds_with_custom_timeout() {
        let config = ServerConfig {
            request_timeout: Duration::from_secs(5),
            ..ServerConfig::default()
        };
        let _layers = build_http_layers(&config);
    }

    #[test]
    fn wildcard_cors() {
        let _cors = build_cors_layer(&["*".to_string()]);
    }
}
