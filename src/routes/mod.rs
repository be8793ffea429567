use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    Json, Router,
    extract::{MatchedPath, State},
    http::{HeaderValue, Method, StatusCode, header::CONTENT_TYPE},
    middleware,
    routing::{get, post},
};
use serde::Serialize;
use tokio::task;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{MakeSpan, OnRequest, OnResponse, TraceLayer},
};
use tracing::{Instrument, Span, field, instrument};

use crate::{
    api::{self, ApiError},
    catalog::CatalogStore,
    config::AppConfig,
    store::ProductStore,
};

/// Shared application state cloned into each request handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn ProductStore>,
    /// Present when the store is the file-backed catalog, enabling reloads.
    pub catalog: Option<Arc<CatalogStore>>,
    pub boot_instant: Instant,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, catalog: Arc<CatalogStore>) -> Self {
        Self {
            config,
            store: catalog.clone(),
            catalog: Some(catalog),
            boot_instant: Instant::now(),
        }
    }

    /// State backed by an arbitrary store; catalog reloads are unavailable.
    pub fn with_store(config: Arc<AppConfig>, store: Arc<dyn ProductStore>) -> Self {
        Self {
            config,
            store,
            catalog: None,
            boot_instant: Instant::now(),
        }
    }
}

/// Build the Axum router with shared layers and routes.
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_allowed_origins);

    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/v1/catalog/reload", post(trigger_reload))
        .nest("/api/v1/product", api::products::routes())
        .with_state(state)
        .fallback(api::fallback_handler)
        .layer(middleware::from_fn(api::ensure_error_envelope))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(HttpMakeSpan)
                .on_request(LogOnRequest)
                .on_response(LogOnResponse),
        )
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = origin.as_str(), "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE])
}

/// JSON payload returned by `/healthz`.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    catalog_path: String,
    uptime_seconds: f64,
    product_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    catalog_generated_at: Option<String>,
}

#[instrument(skip(state))]
async fn healthz(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let product_count = state
        .store
        .estimated_document_count()
        .await
        .map_err(|err| {
            ApiError::with_source(StatusCode::SERVICE_UNAVAILABLE, "catalog unavailable", err)
        })?;

    let catalog_generated_at = match &state.catalog {
        Some(catalog) => Some(catalog.generated_at().await.to_rfc3339()),
        None => None,
    };

    Ok(Json(HealthResponse {
        status: "ok",
        catalog_path: state.config.catalog_path.display().to_string(),
        uptime_seconds: state.boot_instant.elapsed().as_secs_f64(),
        product_count,
        catalog_generated_at,
    }))
}

#[instrument(skip(state))]
async fn trigger_reload(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let catalog = state.catalog.clone().ok_or_else(|| {
        ApiError::service_unavailable(
            "catalog reload unavailable",
            "store is not backed by a catalog file",
        )
    })?;

    task::spawn(async move {
        let span = tracing::info_span!("api_triggered_reload", path = %catalog.path().display());

        match catalog.reload().instrument(span).await {
            Ok(products) => tracing::info!(products, "catalog reload completed"),
            Err(err) => tracing::error!(error = %err, "catalog reload failed"),
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({"status": "queued"})),
    ))
}

#[derive(Clone)]
struct HttpMakeSpan;

impl<B> MakeSpan<B> for HttpMakeSpan {
    fn make_span(&mut self, request: &axum::http::Request<B>) -> Span {
        let method = request.method().clone();
        let matched_path = request
            .extensions()
            .get::<MatchedPath>()
            .map(|path| path.as_str())
            .unwrap_or_else(|| request.uri().path());

        let span = tracing::info_span!(
            "http_request",
            http.request.method = %method,
            http.route = %matched_path,
            url.path = request.uri().path(),
            url.query = field::Empty,
            http.response.status_code = field::Empty,
            http.latency_ms = field::Empty
        );

        if let Some(query) = request.uri().query() {
            span.record("url.query", field::display(query));
        }

        span
    }
}

#[derive(Clone)]
struct LogOnRequest;

impl<B> OnRequest<B> for LogOnRequest {
    fn on_request(&mut self, request: &axum::http::Request<B>, span: &Span) {
        tracing::info!(
            parent: span,
            "HTTP request received: {} {}",
            request.method(),
            request.uri().path()
        );
    }
}

#[derive(Clone)]
struct LogOnResponse;

impl<B> OnResponse<B> for LogOnResponse {
    fn on_response(self, response: &axum::http::Response<B>, latency: Duration, span: &Span) {
        let status_code = response.status().as_u16();

        span.record("http.response.status_code", field::display(status_code));
        span.record("http.latency_ms", field::display(latency.as_millis()));

        tracing::info!(
            parent: span,
            "HTTP request completed with status {} in {} ms",
            status_code,
            latency.as_millis()
        );
    }
}
