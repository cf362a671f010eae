use serde::Deserialize;

use crate::models::{CandidatePlace, Coordinate, PlaceDetails};

/// Status values the maps web services put in every response body.
pub mod status {
    pub const OK: &str = "OK";
    pub const ZERO_RESULTS: &str = "ZERO_RESULTS";
    pub const REQUEST_DENIED: &str = "REQUEST_DENIED";
    pub const NOT_FOUND: &str = "NOT_FOUND";
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LatLngLiteral {
    pub lat: f64,
    pub lng: f64,
}

impl From<LatLngLiteral> for Coordinate {
    fn from(location: LatLngLiteral) -> Self {
        Coordinate::new(location.lat, location.lng)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Geometry {
    pub location: LatLngLiteral,
}

// ============ Geocoding ============

#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<GeocodeResult>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeResult {
    pub formatted_address: Option<String>,
    pub geometry: Geometry,
}

// ============ Nearby Search ============

#[derive(Debug, Clone, Deserialize)]
pub struct NearbySearchResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<NearbyPlace>,
    pub next_page_token: Option<String>,
    pub error_message: Option<String>,
}

/// Place stub as listed by a nearby search.
#[derive(Debug, Clone, Deserialize)]
pub struct NearbyPlace {
    pub place_id: String,
    #[serde(default)]
    pub name: String,
    pub geometry: Geometry,
    pub vicinity: Option<String>,
}

impl From<NearbyPlace> for CandidatePlace {
    fn from(place: NearbyPlace) -> Self {
        CandidatePlace {
            external_id: place.place_id,
            display_name: place.name,
            coordinate: place.geometry.location.into(),
            vicinity: place.vicinity,
        }
    }
}

/// One page of a zone search.
#[derive(Debug, Clone, Default)]
pub struct NearbyPage {
    pub places: Vec<CandidatePlace>,
    pub next_page_token: Option<String>,
}

// ============ Place Details ============

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceDetailsResponse {
    pub status: String,
    pub result: Option<PlaceDetailsResult>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaceDetailsResult {
    pub formatted_phone_number: Option<String>,
    pub formatted_address: Option<String>,
    pub website: Option<String>,
}

impl From<PlaceDetailsResult> for PlaceDetails {
    fn from(result: PlaceDetailsResult) -> Self {
        PlaceDetails {
            phone_number: result.formatted_phone_number.filter(|s| !s.is_empty()),
            address: result.formatted_address.filter(|s| !s.is_empty()),
            website: result.website.filter(|s| !s.is_empty()),
        }
    }
}
