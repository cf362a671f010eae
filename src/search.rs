/// Geo-proximity place search
///
/// Turns a (term, origin, radius) triple into a distance-ranked list of nearby places:
/// 1. Resolve the origin name to a coordinate (geocoding, cached)
/// 2. Search three concentric zones (0.33r, 0.66r, r), following page tokens
/// 3. Deduplicate by provider place id, first occurrence wins
/// 4. Drop candidates outside the radius, fetch contact details for the rest
/// 5. Sort by distance, keeping discovery order on ties
use futures::future::{self, try_join_all};
use futures::stream::{self, StreamExt};
use moka::future::Cache;
use std::collections::HashSet;
use std::time::Duration;

use crate::config::Config;
use crate::errors::{AppError, ResultExt};
use crate::handlers::AppState;
use crate::models::{CandidatePlace, Coordinate, EnrichedPlace, PlaceDetails, SearchRequest};
use crate::places_client::PlacesClient;

/// Page tokens only become valid a short while after they are issued.
pub const PAGE_TOKEN_WARMUP: Duration = Duration::from_secs(2);

/// Fractions of the requested radius searched as separate zones.
pub const ZONE_FACTORS: [f64; 3] = [0.33, 0.66, 1.0];

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Tunables of one search, taken from configuration.
#[derive(Debug, Clone, Copy)]
pub struct SearchSettings {
    pub max_pages_per_zone: usize,
    pub detail_concurrency: usize,
    pub timeout: Duration,
}

impl From<&Config> for SearchSettings {
    fn from(config: &Config) -> Self {
        Self {
            max_pages_per_zone: config.max_pages_per_zone.max(1),
            detail_concurrency: config.detail_concurrency.max(1),
            timeout: config.search_timeout(),
        }
    }
}

/// Runs a complete place search within the configured time budget.
///
/// Fails before any outbound call when no maps credential is configured.
pub async fn search_places(
    state: &AppState,
    request: &SearchRequest,
) -> Result<Vec<EnrichedPlace>, AppError> {
    let client = state.places.as_ref().ok_or_else(|| {
        AppError::Configuration("GOOGLE_MAPS_API_KEY is not set".to_string())
    })?;
    let settings = SearchSettings::from(&state.config);

    match tokio::time::timeout(
        settings.timeout,
        run_search(client, state.geocode_cache.as_ref(), request, &settings),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => Err(AppError::Timeout(settings.timeout)),
    }
}

async fn run_search(
    client: &PlacesClient,
    geocode_cache: Option<&Cache<String, Coordinate>>,
    request: &SearchRequest,
    settings: &SearchSettings,
) -> Result<Vec<EnrichedPlace>, AppError> {
    tracing::info!(
        "Searching '{}' within {} m of '{}'",
        request.query,
        request.radius_meters,
        request.origin_name
    );

    tracing::info!("Step 1: Resolving origin");
    let origin = resolve_origin(client, geocode_cache, &request.origin_name).await?;

    tracing::info!("Step 2: Searching {} zones", ZONE_FACTORS.len());
    let zones = search_zones(client, origin, request, settings.max_pages_per_zone).await?;

    let candidates = dedupe_candidates(zones);
    tracing::info!("Step 3: {} unique candidate(s)", candidates.len());

    let nearby = locate_within_radius(candidates, origin, request.radius_km());
    tracing::info!(
        "Step 4: Fetching details for {} candidate(s) inside {} km",
        nearby.len(),
        request.radius_km()
    );
    let enriched =
        enrich_candidates(client, nearby, &request.query, settings.detail_concurrency).await;

    let ranked = rank_within_radius(enriched, request.radius_km());
    tracing::info!("✓ Search finished with {} result(s)", ranked.len());
    Ok(ranked)
}

/// Resolves the origin name to a coordinate, consulting the geocode cache first.
///
/// Only successful lookups are cached.
pub async fn resolve_origin(
    client: &PlacesClient,
    geocode_cache: Option<&Cache<String, Coordinate>>,
    origin_name: &str,
) -> Result<Coordinate, AppError> {
    let cache_key = origin_name.trim().to_lowercase();

    if let Some(cache) = geocode_cache {
        if let Some(coordinate) = cache.get(&cache_key).await {
            tracing::debug!("Geocode cache hit for '{}'", origin_name);
            return Ok(coordinate);
        }
    }

    let coordinate = client
        .geocode(origin_name)
        .await
        .context("Resolving search origin")?
        .ok_or_else(|| {
            AppError::LocationNotFound(format!("No geocoding result for '{}'", origin_name))
        })?;

    if let Some(cache) = geocode_cache {
        cache.insert(cache_key, coordinate).await;
    }

    Ok(coordinate)
}

/// Radii of the three search zones in whole meters, never below one meter.
pub fn zone_radii(radius_meters: f64) -> [u32; 3] {
    ZONE_FACTORS.map(|factor| ((radius_meters * factor).round() as u32).max(1))
}

/// Searches all zones concurrently and returns their listings in zone order.
///
/// Any failing zone aborts the whole search.
async fn search_zones(
    client: &PlacesClient,
    origin: Coordinate,
    request: &SearchRequest,
    max_pages: usize,
) -> Result<Vec<Vec<CandidatePlace>>, AppError> {
    let radii = zone_radii(request.radius_meters);
    let zone_count = radii.len();

    let searches = radii.into_iter().enumerate().map(|(index, radius)| async move {
        search_zone(client, origin, radius, &request.query, max_pages)
            .await
            .with_context(|| format!("Zone {}/{} ({} m)", index + 1, zone_count, radius))
    });

    try_join_all(searches).await
}

/// Pages through one zone's listing, waiting for each page token to warm up.
async fn search_zone(
    client: &PlacesClient,
    origin: Coordinate,
    radius_meters: u32,
    keyword: &str,
    max_pages: usize,
) -> Result<Vec<CandidatePlace>, AppError> {
    let mut places = Vec::new();
    let mut page_token: Option<String> = None;

    for page in 1..=max_pages {
        if page_token.is_some() {
            tokio::time::sleep(PAGE_TOKEN_WARMUP).await;
        }

        let result = client
            .nearby_page(origin, radius_meters, keyword, page_token.as_deref())
            .await?;
        tracing::debug!(
            "Zone {} m page {}: {} place(s)",
            radius_meters,
            page,
            result.places.len()
        );
        places.extend(result.places);

        match result.next_page_token {
            Some(token) => page_token = Some(token),
            None => return Ok(places),
        }
    }

    tracing::warn!(
        "Zone {} m still had more pages after {} page(s); stopping",
        radius_meters,
        max_pages
    );
    Ok(places)
}

/// Merges zone listings, keeping the first occurrence of every place id.
pub fn dedupe_candidates(zones: Vec<Vec<CandidatePlace>>) -> Vec<CandidatePlace> {
    let mut seen = HashSet::new();
    zones
        .into_iter()
        .flatten()
        .filter(|candidate| seen.insert(candidate.external_id.clone()))
        .collect()
}

/// Great-circle distance in kilometers (haversine).
pub fn haversine_km(from: Coordinate, to: Coordinate) -> f64 {
    let phi1 = from.latitude.to_radians();
    let phi2 = to.latitude.to_radians();
    let d_phi = (to.latitude - from.latitude).to_radians();
    let d_lambda = (to.longitude - from.longitude).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // Rounding can push `a` past 1 for near-antipodal points
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Rounds kilometers to one decimal.
pub fn round_km(km: f64) -> f64 {
    (km * 10.0).round() / 10.0
}

/// The radius test is applied to the reported (rounded) distance.
pub fn is_within_radius(distance_km: f64, radius_km: f64) -> bool {
    round_km(distance_km) <= radius_km
}

/// Pairs candidates with their exact distance, dropping those outside the radius.
pub fn locate_within_radius(
    candidates: Vec<CandidatePlace>,
    origin: Coordinate,
    radius_km: f64,
) -> Vec<(CandidatePlace, f64)> {
    candidates
        .into_iter()
        .filter_map(|candidate| {
            let distance = haversine_km(origin, candidate.coordinate);
            if is_within_radius(distance, radius_km) {
                Some((candidate, distance))
            } else {
                tracing::debug!(
                    "Skipping '{}' at {:.1} km (outside {} km)",
                    candidate.display_name,
                    distance,
                    radius_km
                );
                None
            }
        })
        .collect()
}

/// Fetches details concurrently; a failed fetch drops only that candidate.
///
/// Output keeps input order.
async fn enrich_candidates(
    client: &PlacesClient,
    candidates: Vec<(CandidatePlace, f64)>,
    industry: &str,
    concurrency: usize,
) -> Vec<EnrichedPlace> {
    stream::iter(candidates)
        .map(|(candidate, distance)| async move {
            match client.place_details(&candidate.external_id).await {
                Ok(details) => Some(build_enriched(candidate, details, industry, distance)),
                Err(e) => {
                    tracing::warn!(
                        "Dropping '{}' ({}): detail fetch failed: {}",
                        candidate.display_name,
                        candidate.external_id,
                        e
                    );
                    None
                }
            }
        })
        .buffered(concurrency.max(1))
        .filter_map(future::ready)
        .collect::<Vec<_>>()
        .await
}

/// Combines a candidate with its details. The search listing's vicinity stands in for a missing address.
pub fn build_enriched(
    candidate: CandidatePlace,
    details: PlaceDetails,
    industry: &str,
    distance_km: f64,
) -> EnrichedPlace {
    EnrichedPlace {
        name: candidate.display_name,
        industry: industry.to_string(),
        phone_number: details.phone_number,
        address: details.address.or(candidate.vicinity),
        website: details.website,
        distance_km: round_km(distance_km),
        exact_distance_km: distance_km,
        coordinate: candidate.coordinate,
    }
}

/// Keeps places inside the radius and orders them by distance (stable).
pub fn rank_within_radius(places: Vec<EnrichedPlace>, radius_km: f64) -> Vec<EnrichedPlace> {
    let mut ranked: Vec<EnrichedPlace> = places
        .into_iter()
        .filter(|place| is_within_radius(place.exact_distance_km, radius_km))
        .collect();
    ranked.sort_by(|a, b| a.exact_distance_km.total_cmp(&b.exact_distance_km));
    ranked
}
