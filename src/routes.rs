use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers::{self, AppState};
use crate::models::{ErrorBody, LatLng, PlaceSearchResult, SearchPlacesBody};

/// OpenAPI document served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(handlers::search_places, handlers::health),
    components(schemas(SearchPlacesBody, PlaceSearchResult, LatLng, ErrorBody)),
    tags(
        (name = "places", description = "Geo-proximity place search"),
        (name = "system", description = "Operational endpoints")
    )
)]
pub struct ApiDoc;

/// Builds the application router.
///
/// With `rate_limit` set, everything except `/health` is limited to 10 req/sec per IP
/// (burst 20). The limiter needs the peer address, so the router must then be served
/// with connect info.
pub fn build_router(state: Arc<AppState>, rate_limit: bool) -> anyhow::Result<Router> {
    let mut protected_routes = Router::new()
        .route("/api/places/search", post(handlers::search_places))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Request size limit: 1MB max payload
        .layer(RequestBodyLimitLayer::new(1024 * 1024));

    if rate_limit {
        let governor_conf = Arc::new(
            GovernorConfigBuilder::default()
                .per_second(10)
                .burst_size(20)
                .key_extractor(SmartIpKeyExtractor)
                .finish()
                .ok_or_else(|| anyhow::anyhow!("Invalid rate limiter configuration"))?,
        );
        protected_routes = protected_routes.layer(ServiceBuilder::new().layer(GovernorLayer {
            config: governor_conf,
        }));
    }

    // Health check bypasses rate limiting
    let app = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    Ok(app)
}
