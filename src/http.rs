//! HTTP front-end for the waste advisor
//!
//! Serves the upload page and the `/classify` endpoint. Health, info, and
//! metrics are plain JSON.

use axum::{
    Json, Router,
    body::Body,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartError},
    http::{Request, StatusCode, header},
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use std::{cmp::Ordering, collections::HashMap, sync::Arc, time::Duration};
use tokio::sync::Mutex;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    advisor::WasteAdvisor,
    clients::ClassifierError,
    config::Config,
    error::{Result, WasteAdvisorError},
    presentation, upload,
};

const INDEX_HTML: &str = include_str!("index.html");
const LATENCY_WINDOW: usize = 256;
/// Room for multipart framing on top of the configured image limit
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Shared state for HTTP server
#[derive(Clone)]
pub struct HttpState {
    pub config: Arc<Config>,
    pub advisor: WasteAdvisor,
    pub metrics: Arc<Mutex<HttpMetrics>>,
}

impl HttpState {
    pub fn new(config: Arc<Config>, advisor: WasteAdvisor) -> Self {
        Self {
            config,
            advisor,
            metrics: Arc::new(Mutex::new(HttpMetrics::new())),
        }
    }
}

/// Metrics for HTTP server
#[derive(Debug, Clone)]
pub struct HttpMetrics {
    pub total_requests: u64,
    pub last_request_unix: u64,
    pub errors_total: u64,
    pub latencies: Vec<f64>, // ring buffer for p95
    pub categories_count: HashMap<String, u64>,
}

impl HttpMetrics {
    fn new() -> Self {
        Self {
            total_requests: 0,
            last_request_unix: unix_now(),
            errors_total: 0,
            latencies: Vec::with_capacity(LATENCY_WINDOW),
            categories_count: HashMap::new(),
        }
    }

    fn record(&mut self, latency_ms: f64, success: bool) {
        if latency_ms > 0.0 {
            self.latencies.push(latency_ms);
            if self.latencies.len() > LATENCY_WINDOW {
                self.latencies.remove(0);
            }
        }
        if !success {
            self.errors_total = self.errors_total.saturating_add(1);
        }
        self.total_requests = self.total_requests.saturating_add(1);
        self.last_request_unix = unix_now();
    }

    /// (avg, p95) over the latency window
    pub fn latency_stats(&self) -> (Option<f64>, Option<f64>) {
        if self.latencies.is_empty() {
            return (None, None);
        }
        let sum: f64 = self.latencies.iter().sum();
        let avg = sum / self.latencies.len() as f64;
        let mut sorted = self.latencies.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        let p95_idx = ((sorted.len() as f64 * 0.95) as usize).min(sorted.len() - 1);
        (Some(avg), sorted.get(p95_idx).copied())
    }
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn bad_request(message: impl Into<String>) -> WasteAdvisorError {
    WasteAdvisorError::InvalidRequest {
        message: message.into(),
    }
}

fn multipart_error(err: MultipartError, max_bytes: usize) -> WasteAdvisorError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        upload::too_large(max_bytes)
    } else {
        bad_request(format!("Malformed upload: {}", err.body_text()))
    }
}

/// Upload page
pub async fn index_handler(State(state): State<HttpState>) -> Html<String> {
    Html(INDEX_HTML.replace(
        "{{MAX_UPLOAD}}",
        &upload::human_size(state.config.upload.max_bytes),
    ))
}

/// Health check endpoint
pub async fn health_handler() -> impl IntoResponse {
    "ok"
}

/// Info endpoint
pub async fn info_handler(State(state): State<HttpState>) -> impl IntoResponse {
    Json(json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "classifier": {
            "models": state.advisor.models(),
            "timeout_ms": state.config.classifier.timeout_ms
        },
        "upload": {
            "max_bytes": state.config.upload.max_bytes,
            "formats": ["image/jpeg", "image/png", "image/webp"]
        },
        "server": {
            "bind": state.config.runtime.http_bind.to_string()
        }
    }))
}

/// Metrics endpoint
pub async fn metrics_handler(State(state): State<HttpState>) -> impl IntoResponse {
    let metrics = state.metrics.lock().await.clone();
    let (avg_latency_ms, p95_latency_ms) = metrics.latency_stats();

    let mut categories: Vec<_> = metrics.categories_count.iter().collect();
    categories.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    let categories_top_5: Vec<_> = categories
        .into_iter()
        .take(5)
        .map(|(k, v)| json!({ "category": k, "count": v }))
        .collect();

    Json(json!({
        "metrics_version": "1",
        "total_requests": metrics.total_requests,
        "last_request_unix": metrics.last_request_unix,
        "errors_total": metrics.errors_total,
        "avg_latency_ms": avg_latency_ms,
        "p95_latency_ms": p95_latency_ms,
        "categories_top_5": categories_top_5
    }))
}

/// Accepts a multipart form with the image in the `file` field.
///
/// The whole request runs under the configured HTTP deadline; running out of
/// time is reported like any other classifier failure.
pub async fn classify_handler(
    State(state): State<HttpState>,
    multipart: Multipart,
) -> Result<Json<Value>> {
    let timeout_ms = state.config.runtime.http_request_timeout_ms;
    tokio::time::timeout(
        Duration::from_millis(timeout_ms),
        classify_upload(&state, multipart),
    )
    .await
    .map_err(|_| {
        tracing::warn!("Classify request exceeded {}ms", timeout_ms);
        WasteAdvisorError::ClassifierUnavailable {
            source: ClassifierError::Timeout { timeout_ms },
        }
    })?
}

async fn classify_upload(state: &HttpState, mut multipart: Multipart) -> Result<Json<Value>> {
    let max_bytes = state.config.upload.max_bytes;
    let mut file: Option<(Option<String>, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_bytes))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| multipart_error(e, max_bytes))?;
        file = Some((file_name, bytes.to_vec()));
        break;
    }

    let (file_name, bytes) = file.ok_or_else(|| bad_request("No file part in the request"))?;
    if file_name.as_deref().is_some_and(|name| name.trim().is_empty()) {
        return Err(bad_request("No selected file"));
    }

    let image = upload::validate(bytes, file_name, max_bytes)?;
    let report = state.advisor.advise(&image).await?;

    state
        .metrics
        .lock()
        .await
        .categories_count
        .entry(report.classification.category.to_string())
        .and_modify(|c| *c += 1)
        .or_insert(1);

    let display = presentation::summarize(&report);
    Ok(Json(json!({
        "success": true,
        "report": report,
        "display": display
    })))
}

async fn track_metrics(
    State(metrics): State<Arc<Mutex<HttpMetrics>>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let tracked = req.uri().path() == "/classify";
    let start = std::time::Instant::now();
    let resp = next.run(req).await;
    if tracked {
        let latency_ms = start.elapsed().as_millis() as f64;
        metrics
            .lock()
            .await
            .record(latency_ms, resp.status().is_success());
    }
    resp
}

/// Build the application router. Exposed so tests can drive it without a socket.
pub fn build_router(state: HttpState) -> Router {
    let body_limit = state
        .config
        .upload
        .max_bytes
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/info", get(info_handler))
        .route("/metrics", get(metrics_handler))
        .route("/classify", post(classify_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn_with_state(
            state.metrics.clone(),
            track_metrics,
        ))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers([header::CONTENT_TYPE]),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_http_server(config: Arc<Config>, advisor: WasteAdvisor) -> Result<()> {
    let bind = config.runtime.http_bind;
    let app = build_router(HttpState::new(config, advisor));

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind HTTP listener: {}", e))?;

    tracing::info!("Starting HTTP server on http://{}", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_window_is_bounded() {
        let mut m = HttpMetrics::new();
        for i in 1..=300 {
            m.record(i as f64, i % 10 != 0);
        }
        assert_eq!(m.latencies.len(), LATENCY_WINDOW);
        assert_eq!(m.total_requests, 300);
        assert_eq!(m.errors_total, 30);
        assert_eq!(m.latencies[0], 45.0);
    }

    #[test]
    fn test_latency_stats() {
        let mut m = HttpMetrics::new();
        assert_eq!(m.latency_stats(), (None, None));
        for v in [10.0, 20.0, 30.0, 40.0] {
            m.record(v, true);
        }
        let (avg, p95) = m.latency_stats();
        assert_eq!(avg, Some(25.0));
        assert_eq!(p95, Some(40.0));
    }
}
