//! Relay HTTP server.
//!
//! # Responsibilities
//! - Create the Axum router (relay routes, metrics, health)
//! - Strip client-only headers before relaying
//! - Forward calls to the upstream through the instrumented client
//! - Map upstream outcomes to relay responses

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::{ServiceConfig, UpstreamConfig};
use crate::instrument::{CallSpec, Headers, InstrumentedClient, LogPolicy, TaggedClient};

/// Inbound headers that describe the client connection, not the call.
pub const STRIPPED_HEADERS: &[&str] = &[
    "user-agent",
    "accept",
    "postman-token",
    "host",
    "accept-encoding",
    "connection",
    "content-length",
];

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub client: TaggedClient,
    pub upstream: Arc<UpstreamConfig>,
    pub policy: LogPolicy,
    pub call_timeout: Duration,
    pub metrics: Option<PrometheusHandle>,
}

/// HTTP server for the relay.
pub struct HttpServer {
    router: Router,
    config: ServiceConfig,
}

impl HttpServer {
    pub fn new(
        config: ServiceConfig,
        client: InstrumentedClient,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        let state = AppState {
            client: client.tagged(config.upstream.caller_log_code.clone()),
            upstream: Arc::new(config.upstream.clone()),
            policy: config.upstream.log_policy(),
            call_timeout: Duration::from_secs(config.client.call_timeout_secs),
            metrics,
        };

        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    #[allow(deprecated)]
    fn build_router(config: &ServiceConfig, state: AppState) -> Router {
        Router::new()
            .route("/cards", get(relay_collection).post(relay_collection))
            .route("/cards/{id}", delete(relay_item))
            .route("/metrics", get(metrics_handler))
            .route("/health", get(|| async { "OK" }))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.listener.request_timeout_secs,
            )))
            .layer(TraceLayer::new_for_http())
    }

    /// Serve until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.cards_url,
            "Relay server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Relay server received shutdown signal");
            })
            .await?;

        tracing::info!("Relay server stopped");
        Ok(())
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
}

/// Copy inbound headers minus the connection-level ones.
///
/// Repeated fields are folded into one comma-separated value. Values that
/// are not valid UTF-8 are skipped.
pub fn relay_headers(inbound: &HeaderMap) -> Headers {
    let mut headers = Headers::new();
    for (name, value) in inbound {
        if STRIPPED_HEADERS.contains(&name.as_str()) {
            continue;
        }
        match value.to_str() {
            Ok(v) => headers.append(name.as_str(), v),
            Err(_) => tracing::debug!(header = %name, "Skipping non UTF-8 header value"),
        }
    }
    headers
}

fn error_response(status: StatusCode, detail: &str) -> Response {
    (status, Json(json!({ "detail": detail }))).into_response()
}

async fn relay(state: &AppState, spec: CallSpec) -> Response {
    match state.client.call(spec, state.policy.clone()).await {
        Ok(response) => {
            let status = StatusCode::from_u16(response.status_code).unwrap_or(StatusCode::BAD_GATEWAY);
            let body = json!({
                "status": response.status_code,
                "response": response.json(),
            });
            (status, Json(body)).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Upstream call failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal error while processing the request.",
            )
        }
    }
}

async fn relay_collection(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let mut builder = CallSpec::builder()
        .method(method.as_str())
        .url(state.upstream.cards_url.clone())
        .headers(relay_headers(&headers))
        .timeout(state.call_timeout);

    if method == Method::POST {
        let data: Value = match serde_json::from_slice(&body) {
            Ok(v) => v,
            Err(_) => Value::Null,
        };
        let empty = match &data {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            Value::Array(items) => items.is_empty(),
            _ => false,
        };
        if empty {
            return error_response(
                StatusCode::BAD_REQUEST,
                "A JSON request body is required for POST.",
            );
        }
        builder = builder.json(data);
    }

    match builder.build() {
        Ok(spec) => relay(&state, spec).await,
        Err(e) => {
            tracing::error!(error = %e, "Invalid relay call");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Invalid upstream configuration.")
        }
    }
}

async fn relay_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if id.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "The 'id' path parameter is required for DELETE.");
    }

    let url = format!("{}/{}", state.upstream.cards_url.trim_end_matches('/'), id);
    let spec = CallSpec::builder()
        .method("DELETE")
        .url(url)
        .headers(relay_headers(&headers))
        .timeout(state.call_timeout)
        .build();

    match spec {
        Ok(spec) => relay(&state, spec).await,
        Err(e) => {
            tracing::error!(error = %e, "Invalid relay call");
            error_response(StatusCode::BAD_REQUEST, "Invalid card id.")
        }
    }
}

async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()).into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "Metrics not enabled").into_response(),
    }
}

/// Router exposing only `GET /metrics`, for a dedicated exposition port.
pub fn metrics_router(handle: PrometheusHandle) -> Router {
    Router::new().route(
        "/metrics",
        get(move || {
            let handle = handle.clone();
            async move { handle.render() }
        }),
    )
}

/// Serve [`metrics_router`] until the shutdown signal fires.
pub async fn serve_metrics(
    listener: TcpListener,
    handle: PrometheusHandle,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), std::io::Error> {
    tracing::info!(address = %listener.local_addr()?, "Metrics listener starting");
    axum::serve(listener, metrics_router(handle))
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await
}
