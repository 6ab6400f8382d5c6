mod rate_limit;

use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::{Json, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use reqwest::Client;
use safepoint_agents::AssistAgent;
use safepoint_core::{AssistError, AssistQuery};
use safepoint_lookup::{PlaceLocator, PlacesConfig, RoutePlanner, RoutingConfig};
use safepoint_observability::AppMetrics;
use safepoint_storage::QuotaStore;
use safepoint_synth::{GenerationConfig, ReplySynthesizer};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::rate_limit::IpRateLimiter;

const MAX_REQUEST_BODY_BYTES: usize = 16 * 1024;

pub type HttpAssistAgent = AssistAgent<PlaceLocator, RoutePlanner, ReplySynthesizer>;

#[derive(Clone)]
pub struct ApiState {
    pub agent: Arc<HttpAssistAgent>,
    pub metrics: Arc<AppMetrics>,
    pub limiter: IpRateLimiter,
    pub capabilities: ProviderCapabilities,
    pub allowed_origins: Arc<Vec<String>>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ProviderCapabilities {
    pub place_search: bool,
    pub routing: bool,
    pub generation: bool,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp_utc: String,
    metrics: safepoint_observability::MetricsSnapshot,
    capabilities: ProviderCapabilities,
}

pub async fn build_app() -> Result<Router> {
    let metrics = AppMetrics::shared();

    let upstream_timeout = Duration::from_secs(
        env::var("SAFEPOINT_UPSTREAM_TIMEOUT_SECONDS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(20),
    );
    let http_client = Client::builder()
        .connect_timeout(Duration::from_secs(6))
        .timeout(upstream_timeout)
        .build()
        .context("failed to build HTTP client")?;

    let places = build_places_config();
    let routing = build_routing_config();
    let generation = build_generation_config();
    let capabilities = ProviderCapabilities {
        place_search: places.is_some(),
        routing: routing.is_some(),
        generation: generation.is_some(),
    };

    let agent = Arc::new(AssistAgent::new(
        places.map(|config| PlaceLocator::new(http_client.clone(), config)),
        routing.map(|config| RoutePlanner::new(http_client.clone(), config)),
        generation.map(|config| ReplySynthesizer::new(http_client.clone(), config)),
        QuotaStore::new(),
        metrics.clone(),
    ));

    let rate_limit_window = Duration::from_secs(
        env::var("SAFEPOINT_RATE_LIMIT_WINDOW_SECONDS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(60),
    );
    let rate_limit_max = env::var("SAFEPOINT_RATE_LIMIT_MAX")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(30);

    let state = ApiState {
        agent,
        metrics,
        limiter: IpRateLimiter::new(rate_limit_window, rate_limit_max),
        capabilities,
        allowed_origins: Arc::new(parse_allowed_origins()),
    };

    Ok(build_router(state))
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/assist", post(assist))
        .layer(build_cors_layer(&state.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_BYTES))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .with_state(state)
}

async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    let payload = HealthResponse {
        status: "ok",
        timestamp_utc: chrono::Utc::now().to_rfc3339(),
        metrics: state.metrics.snapshot(),
        capabilities: state.capabilities,
    };
    (StatusCode::OK, Json(payload))
}

async fn assist(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(query): Json<AssistQuery>,
) -> Response {
    let user_key = request_ip(&headers);

    match state.agent.handle(&user_key, query).await {
        Ok(reply) => (
            StatusCode::OK,
            Json(serde_json::json!({ "reply": reply.text })),
        )
            .into_response(),
        Err(error) => error_response(error),
    }
}

fn error_response(error: AssistError) -> Response {
    let status = if error.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        tracing::error!(error = %error, "assist request failed server-side");
        StatusCode::INTERNAL_SERVER_ERROR
    };

    (
        status,
        Json(serde_json::json!({ "error": error.to_string() })),
    )
        .into_response()
}

async fn rate_limit_middleware(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS || request.uri().path() == "/health" {
        return next.run(request).await;
    }

    let ip = request_ip(request.headers());
    if !state.limiter.allow(&ip) {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(serde_json::json!({
                "error": "rate limit exceeded for this IP"
            })),
        )
            .into_response();
    }

    next.run(request).await
}

fn request_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .map(|value| value.split(',').next().unwrap_or("unknown").trim().to_string())
        .unwrap_or_else(|| "local".to_string())
}

fn build_cors_layer(allowed_origins: &Arc<Vec<String>>) -> CorsLayer {
    let origins = allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect::<Vec<_>>();
    let origins = if origins.is_empty() {
        vec![HeaderValue::from_static("http://localhost:5500")]
    } else {
        origins
    };

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

fn parse_allowed_origins() -> Vec<String> {
    env::var("SAFEPOINT_ALLOWED_ORIGINS")
        .ok()
        .map(|value| {
            value
                .split(',')
                .map(|origin| origin.trim().trim_end_matches('/').to_string())
                .filter(|origin| !origin.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn build_places_config() -> Option<PlacesConfig> {
    let api_key = env::var("SAFEPOINT_PLACES_API_KEY").ok()?;
    let base_url = env::var("SAFEPOINT_PLACES_BASE_URL")
        .unwrap_or_else(|_| "https://api.geoapify.com".to_string());
    let lang = env::var("SAFEPOINT_PLACES_LANG").unwrap_or_else(|_| "en".to_string());

    Some(PlacesConfig {
        base_url,
        api_key,
        lang,
    })
}

fn build_routing_config() -> Option<RoutingConfig> {
    let api_key = env::var("SAFEPOINT_ROUTING_API_KEY").ok()?;
    let base_url = env::var("SAFEPOINT_ROUTING_BASE_URL")
        .unwrap_or_else(|_| "https://router.project-osrm.org".to_string());

    Some(RoutingConfig { base_url, api_key })
}

fn build_generation_config() -> Option<GenerationConfig> {
    let api_key = env::var("SAFEPOINT_GENERATION_API_KEY").ok()?;
    let base_url = env::var("SAFEPOINT_GENERATION_BASE_URL")
        .unwrap_or_else(|_| "https://api.groq.com/openai/v1".to_string());
    let model = env::var("SAFEPOINT_GENERATION_MODEL")
        .unwrap_or_else(|_| "llama-3.3-70b-versatile".to_string());

    Some(GenerationConfig {
        base_url,
        api_key,
        model,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_ip_prefers_the_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.2"),
        );
        assert_eq!(request_ip(&headers), "203.0.113.9");
    }

    #[test]
    fn request_ip_defaults_to_local() {
        assert_eq!(request_ip(&HeaderMap::new()), "local");
    }
}
