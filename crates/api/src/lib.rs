mod rate_limit;

use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::{Json, State};
use axum::http::{Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use callejero_agents::{filter_nearby, GuideAgent, DEFAULT_SEARCH_RADIUS_METERS};
use callejero_core::Place;
use callejero_observability::AppMetrics;
use callejero_providers::{
    GeocodeError, NominatimClient, OverpassClient, DEFAULT_GEOCODE_TIMEOUT,
    DEFAULT_NOMINATIM_BASE_URL, DEFAULT_OVERPASS_BASE_URL, DEFAULT_PLACES_TIMEOUT,
    DEFAULT_USER_AGENT,
};
use callejero_storage::MemoryStore;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::rate_limit::IpRateLimiter;

const MAX_BODY_BYTES: usize = 16 * 1024;

pub type Agent = GuideAgent<NominatimClient, OverpassClient, MemoryStore>;

#[derive(Clone)]
pub struct ApiState {
    pub agent: Arc<Agent>,
    pub metrics: Arc<AppMetrics>,
    pub default_radius: u32,
}

/// Auth + throttling context shared by the gate middlewares.
#[derive(Clone)]
struct AccessGate {
    api_key: String,
    limiter: IpRateLimiter,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp_utc: String,
    metrics: callejero_observability::MetricsSnapshot,
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeRequest {
    place_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlacesRequest {
    latitude: Option<f64>,
    longitude: Option<f64>,
    radius: Option<u32>,
}

#[derive(Debug, Serialize)]
struct PlacesResponse {
    place_count: usize,
    places: Vec<Place>,
}

/// Runtime settings read from the environment, one `CALLEJERO_*` variable
/// per knob, each with a default.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub nominatim_url: String,
    pub overpass_url: String,
    pub user_agent: String,
    pub geocode_timeout: Duration,
    pub places_timeout: Duration,
    pub default_radius: u32,
    pub api_key: String,
    pub rate_limit_window: Duration,
    pub rate_limit_max: usize,
}

impl ApiConfig {
    pub fn from_env() -> Self {
        Self {
            nominatim_url: env::var("CALLEJERO_NOMINATIM_URL")
                .unwrap_or_else(|_| DEFAULT_NOMINATIM_BASE_URL.to_string()),
            overpass_url: env::var("CALLEJERO_OVERPASS_URL")
                .unwrap_or_else(|_| DEFAULT_OVERPASS_BASE_URL.to_string()),
            user_agent: env::var("CALLEJERO_USER_AGENT")
                .unwrap_or_else(|_| DEFAULT_USER_AGENT.to_string()),
            geocode_timeout: env_duration_secs(
                "CALLEJERO_GEOCODE_TIMEOUT_SECONDS",
                DEFAULT_GEOCODE_TIMEOUT,
            ),
            places_timeout: env_duration_secs(
                "CALLEJERO_PLACES_TIMEOUT_SECONDS",
                DEFAULT_PLACES_TIMEOUT,
            ),
            default_radius: env_parsed(
                "CALLEJERO_SEARCH_RADIUS_METERS",
                DEFAULT_SEARCH_RADIUS_METERS,
            ),
            api_key: env::var("CALLEJERO_API_KEY")
                .unwrap_or_else(|_| "dev-callejero-key".to_string()),
            rate_limit_window: env_duration_secs(
                "CALLEJERO_RATE_LIMIT_WINDOW_SECONDS",
                Duration::from_secs(60),
            ),
            rate_limit_max: env_parsed("CALLEJERO_RATE_LIMIT_MAX", 80),
        }
    }
}

/// Build the production app from environment configuration.
pub fn build_app() -> Result<Router> {
    build_app_with(ApiConfig::from_env())
}

pub fn build_app_with(config: ApiConfig) -> Result<Router> {
    let metrics = AppMetrics::shared();

    let geocoder = Arc::new(
        NominatimClient::new(&config.nominatim_url, &config.user_agent, config.geocode_timeout)
            .context("failed to initialize geocoder")?,
    );
    let places = Arc::new(
        OverpassClient::new(&config.overpass_url, &config.user_agent, config.places_timeout)
            .context("failed to initialize place provider")?,
    );

    let agent = Arc::new(GuideAgent::new(
        geocoder,
        places,
        Arc::new(MemoryStore::new()),
        metrics.clone(),
        config.geocode_timeout,
        config.default_radius,
    ));

    let state = ApiState {
        agent,
        metrics,
        default_radius: config.default_radius,
    };

    let gate = AccessGate {
        api_key: config.api_key,
        limiter: IpRateLimiter::new(config.rate_limit_window, config.rate_limit_max),
    };

    Ok(build_router(state, gate))
}

fn build_router(state: ApiState, gate: AccessGate) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/chat", post(chat))
        .route("/v1/geocode", post(geocode))
        .route("/v1/places", post(places))
        .route("/v1/places/summary", get(places_summary))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(middleware::from_fn_with_state(
            gate.clone(),
            api_key_middleware,
        ))
        .layer(middleware::from_fn_with_state(gate, rate_limit_middleware))
        .with_state(state)
}

async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        timestamp_utc: chrono::Utc::now().to_rfc3339(),
        metrics: state.metrics.snapshot(),
    })
}

async fn chat(State(state): State<ApiState>, Json(request): Json<ChatRequest>) -> Response {
    let Some(message) = request
        .message
        .filter(|message| !message.trim().is_empty())
    else {
        return error_response(StatusCode::BAD_REQUEST, "empty_message", "Mensaje vacío");
    };

    let reply = state.agent.interpret_query(&message).await;
    (StatusCode::OK, Json(reply)).into_response()
}

async fn geocode(State(state): State<ApiState>, Json(request): Json<GeocodeRequest>) -> Response {
    let Some(place_name) = request
        .place_name
        .filter(|place_name| !place_name.trim().is_empty())
    else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "missing_place_name",
            "Nombre del lugar no proporcionado",
        );
    };

    match state.agent.geocode(&place_name).await {
        Ok(located) => {
            let place_count = state
                .agent
                .resolve_location(located.lat, located.lon, state.default_radius)
                .await;
            let snapshot = state.agent.session_snapshot();

            (
                StatusCode::OK,
                Json(json!({
                    "latitude": located.lat,
                    "longitude": located.lon,
                    "address": located.display_name,
                    "place_count": place_count,
                    "places": snapshot.current_places,
                })),
            )
                .into_response()
        }
        Err(GeocodeError::NotFound) => error_response(
            StatusCode::NOT_FOUND,
            "location_not_found",
            "No se encontró el lugar",
        ),
        Err(GeocodeError::TimedOut) => error_response(
            StatusCode::REQUEST_TIMEOUT,
            "geocode_timeout",
            "Tiempo de espera agotado",
        ),
        Err(GeocodeError::Upstream(_)) => error_response(
            StatusCode::BAD_GATEWAY,
            "geocode_unavailable",
            "Error al geocodificar ubicación",
        ),
    }
}

async fn places(State(state): State<ApiState>, Json(request): Json<PlacesRequest>) -> Response {
    let (Some(latitude), Some(longitude)) = (request.latitude, request.longitude) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "missing_coordinates",
            "Se requieren latitud y longitud",
        );
    };

    let radius = request.radius.unwrap_or(state.default_radius);
    let place_count = state
        .agent
        .resolve_location(latitude, longitude, radius)
        .await;
    let snapshot = state.agent.session_snapshot();
    let nearby = filter_nearby(latitude, longitude, radius, &snapshot.current_places);

    (
        StatusCode::OK,
        Json(PlacesResponse {
            place_count,
            places: nearby,
        }),
    )
        .into_response()
}

async fn places_summary(State(state): State<ApiState>) -> impl IntoResponse {
    Json(json!({ "summary": state.agent.summarize() }))
}

async fn api_key_middleware(
    State(gate): State<AccessGate>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.uri().path() == "/health" {
        return next.run(request).await;
    }

    let presented = request
        .headers()
        .get("x-api-key")
        .and_then(|value| value.to_str().ok());

    if presented != Some(gate.api_key.as_str()) {
        return error_response(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "Missing or invalid API key",
        );
    }

    next.run(request).await
}

async fn rate_limit_middleware(
    State(gate): State<AccessGate>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let client = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .unwrap_or("local")
        .trim()
        .to_string();

    if !gate.limiter.allow(&client) {
        return error_response(
            StatusCode::TOO_MANY_REQUESTS,
            "rate_limited",
            "Too many requests",
        );
    }

    next.run(request).await
}

fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(json!({
            "error": code,
            "message": message,
        })),
    )
        .into_response()
}

fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<T>().ok())
        .unwrap_or(default)
}

fn env_duration_secs(name: &str, default: Duration) -> Duration {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}
