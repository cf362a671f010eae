use crate::config::Config;
use crate::errors::AppError;
use crate::models::{Coordinate, PlaceSearchResult, SearchPlacesBody};
use crate::places_client::PlacesClient;
use crate::search;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use moka::future::Cache;
use serde_json::json;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Maps provider client; `None` when no credential is configured.
    pub places: Option<PlacesClient>,
    /// Origin name (trimmed, lower-cased) -> coordinate. `None` when caching is disabled.
    pub geocode_cache: Option<Cache<String, Coordinate>>,
}

impl AppState {
    /// Builds the state from configuration.
    ///
    /// A missing credential does not fail start-up; searches report it per request.
    pub fn new(config: Config) -> Self {
        let places = match PlacesClient::from_config(&config) {
            Ok(client) => {
                tracing::info!(
                    "✓ Maps client initialized: {}",
                    config.google_maps_base_url
                );
                Some(client)
            }
            Err(e) => {
                tracing::error!("Maps client unavailable: {}", e);
                None
            }
        };

        let geocode_cache = config.geocode_cache_ttl().map(|ttl| {
            tracing::info!("Geocode cache initialized ({}s TTL, 10k capacity)", ttl.as_secs());
            Cache::builder().time_to_live(ttl).max_capacity(10_000).build()
        });

        Self {
            config,
            places,
            geocode_cache,
        }
    }
}

/// Health check endpoint.
///
/// Returns the service status, version and current server time.
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses((status = 200, description = "Service is up"))
)]
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
    )
}

/// POST /api/places/search
///
/// Finds places matching `searchTerm` within `radius` meters of `location`,
/// nearest first. An empty array is a valid answer.
///
/// An unreadable body is handled like an empty one, so the caller always learns
/// which fields are missing.
#[utoipa::path(
    post,
    path = "/api/places/search",
    tag = "places",
    request_body = SearchPlacesBody,
    responses(
        (status = 200, description = "Places ordered by distance", body = [PlaceSearchResult]),
        (status = 400, description = "Missing fields or unknown location", body = ErrorBody),
        (status = 500, description = "Maps API not configured or failing", body = ErrorBody)
    )
)]
pub async fn search_places(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SearchPlacesBody>, JsonRejection>,
) -> Result<Json<Vec<PlaceSearchResult>>, AppError> {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("place_search", %request_id);

    handle_search(&state, payload).instrument(span).await
}

async fn handle_search(
    state: &AppState,
    payload: Result<Json<SearchPlacesBody>, JsonRejection>,
) -> Result<Json<Vec<PlaceSearchResult>>, AppError> {
    let body = match payload {
        Ok(Json(body)) => body,
        Err(rejection) => {
            tracing::warn!("Unreadable search body: {}", rejection.body_text());
            SearchPlacesBody::default()
        }
    };
    tracing::info!("POST /api/places/search - body: {:?}", body);

    let request = body.validate()?;
    let places = search::search_places(state, &request).await?;

    Ok(Json(places.into_iter().map(PlaceSearchResult::from).collect()))
}
