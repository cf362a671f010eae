use failsafe::futures::CircuitBreaker;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;

use crate::circuit_breaker::{create_upstream_circuit_breaker, UpstreamBreaker};
use crate::config::Config;
use crate::errors::AppError;
use crate::models::{Coordinate, PlaceDetails};
use crate::places_models::{
    status, GeocodeResponse, NearbyPage, NearbySearchResponse, PlaceDetailsResponse,
};

const GEOCODE_PATH: &str = "/maps/api/geocode/json";
const NEARBY_SEARCH_PATH: &str = "/maps/api/place/nearbysearch/json";
const PLACE_DETAILS_PATH: &str = "/maps/api/place/details/json";
const DETAIL_FIELDS: &str = "formatted_phone_number,formatted_address,website";

/// Client for the maps provider's geocoding, nearby search and place details services.
#[derive(Clone)]
pub struct PlacesClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    breaker: UpstreamBreaker,
}

impl PlacesClient {
    /// Creates a new `PlacesClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the maps web services, without trailing slash.
    /// * `api_key` - The API key sent as `key` on every request.
    pub fn new(base_url: String, api_key: String) -> Result<Self, AppError> {
        if api_key.trim().is_empty() {
            return Err(AppError::Configuration(
                "GOOGLE_MAPS_API_KEY is empty".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create maps client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            api_key,
            breaker: create_upstream_circuit_breaker(),
        })
    }

    /// Creates a client from configuration, failing when no credential is configured.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let api_key = config.google_maps_api_key.clone().ok_or_else(|| {
            AppError::Configuration("GOOGLE_MAPS_API_KEY is not set".to_string())
        })?;
        Self::new(config.google_maps_base_url.clone(), api_key)
    }

    /// Resolves a free-text address to the coordinate of its first match.
    ///
    /// Returns `Ok(None)` when the provider knows no such place.
    pub async fn geocode(&self, address: &str) -> Result<Option<Coordinate>, AppError> {
        self.guarded(async {
            tracing::info!("Geocoding location: {}", address);

            let response: GeocodeResponse = self
                .get_json("Geocoding", GEOCODE_PATH, &[("address", address)])
                .await?;
            check_status(
                "Geocoding",
                &response.status,
                response.error_message.as_deref(),
            )?;

            let first = response.results.into_iter().next();
            if let Some(ref result) = first {
                tracing::debug!(
                    "Geocoded '{}' to {:?} ({})",
                    address,
                    result.geometry.location,
                    result.formatted_address.as_deref().unwrap_or("-")
                );
            }
            Ok(first.map(|result| result.geometry.location.into()))
        })
        .await
    }

    /// Fetches one page of a radius-bounded keyword search.
    ///
    /// With a `page_token` the provider ignores every other parameter, so only the token is sent.
    pub async fn nearby_page(
        &self,
        origin: Coordinate,
        radius_meters: u32,
        keyword: &str,
        page_token: Option<&str>,
    ) -> Result<NearbyPage, AppError> {
        self.guarded(async {
            let location = format!("{},{}", origin.latitude, origin.longitude);
            let radius = radius_meters.to_string();

            let response: NearbySearchResponse = match page_token {
                Some(token) => {
                    self.get_json("Nearby search", NEARBY_SEARCH_PATH, &[("pagetoken", token)])
                        .await?
                }
                None => {
                    self.get_json(
                        "Nearby search",
                        NEARBY_SEARCH_PATH,
                        &[
                            ("location", location.as_str()),
                            ("radius", radius.as_str()),
                            ("keyword", keyword),
                        ],
                    )
                    .await?
                }
            };
            check_status(
                "Nearby search",
                &response.status,
                response.error_message.as_deref(),
            )?;

            Ok(NearbyPage {
                places: response.results.into_iter().map(Into::into).collect(),
                next_page_token: response.next_page_token.filter(|t| !t.is_empty()),
            })
        })
        .await
    }

    /// Fetches phone number, formatted address and website of one place.
    ///
    /// Not routed through the circuit breaker: detail failures are isolated per place.
    pub async fn place_details(&self, place_id: &str) -> Result<PlaceDetails, AppError> {
        let response: PlaceDetailsResponse = self
            .get_json(
                "Place details",
                PLACE_DETAILS_PATH,
                &[("place_id", place_id), ("fields", DETAIL_FIELDS)],
            )
            .await?;

        if response.status == status::NOT_FOUND {
            return Err(AppError::Upstream(format!(
                "Place {} no longer exists",
                place_id
            )));
        }
        check_status(
            "Place details",
            &response.status,
            response.error_message.as_deref(),
        )?;

        response
            .result
            .map(Into::into)
            .ok_or_else(|| AppError::Upstream(format!("No details returned for {}", place_id)))
    }

    /// Runs `call` through the circuit breaker.
    ///
    /// Configuration errors (a refused key) are not counted as provider failures.
    async fn guarded<T, F>(&self, call: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, AppError>>,
    {
        let is_failure = |e: &AppError| !matches!(e.root(), AppError::Configuration(_));

        match self.breaker.call_with(is_failure, call).await {
            Ok(value) => Ok(value),
            Err(failsafe::Error::Inner(e)) => Err(e),
            Err(failsafe::Error::Rejected) => {
                tracing::warn!("Maps provider circuit is open, failing fast");
                Err(AppError::Upstream(
                    "Maps provider is unavailable (circuit open)".to_string(),
                ))
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        label: &str,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, AppError> {
        // Build URL with proper parameter encoding
        let mut url = reqwest::Url::parse_with_params(&format!("{}{}", self.base_url, path), params)
            .map_err(|e| AppError::Internal(format!("Failed to build {} URL: {}", label, e)))?;
        // Redact key from logs to prevent credential exposure
        tracing::debug!("{} URL: {}&key=[REDACTED]", label, url);
        url.query_pairs_mut().append_pair("key", &self.api_key);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("{} request failed: {}", label, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!("{} returned error {}: {}", label, status, error_text);
            return Err(AppError::Upstream(format!(
                "{} returned status {}: {}",
                label, status, error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to parse {} response: {}", label, e)))
    }
}

/// Maps the provider's in-body status to an error, `OK` and `ZERO_RESULTS` being successes.
fn check_status(label: &str, code: &str, error_message: Option<&str>) -> Result<(), AppError> {
    let detail = error_message.unwrap_or("no error message");
    match code {
        status::OK | status::ZERO_RESULTS => Ok(()),
        status::REQUEST_DENIED => Err(AppError::Configuration(format!(
            "{} request denied: {}",
            label, detail
        ))),
        other => Err(AppError::Upstream(format!(
            "{} returned status {}: {}",
            label, other, detail
        ))),
    }
}
