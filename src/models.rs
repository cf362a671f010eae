use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::errors::AppError;

// ============ Domain Models ============

/// A point on the globe in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A validated search request.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// Free-text term, e.g. an industry ("Zahnarzt") or business name.
    pub query: String,
    /// Human-readable origin, resolved through geocoding.
    pub origin_name: String,
    /// Search radius in meters, always > 0.
    pub radius_meters: f64,
}

impl SearchRequest {
    pub fn radius_km(&self) -> f64 {
        self.radius_meters / 1000.0
    }
}

/// A place stub collected from one of the zone searches.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidatePlace {
    /// Provider place identifier, the deduplication key.
    pub external_id: String,
    pub display_name: String,
    pub coordinate: Coordinate,
    /// Short address from the search listing, used when details carry none.
    pub vicinity: Option<String>,
}

/// Contact details fetched per candidate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaceDetails {
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub website: Option<String>,
}

/// A candidate that survived detail enrichment and the radius filter.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedPlace {
    pub name: String,
    /// The original search term.
    pub industry: String,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub website: Option<String>,
    /// Great-circle distance from the origin, rounded to one decimal.
    pub distance_km: f64,
    /// Unrounded distance, used for ordering.
    pub exact_distance_km: f64,
    pub coordinate: Coordinate,
}

// ============ API Models ============

/// Body of `POST /api/places/search`.
///
/// Every field is optional on the wire so absent ones can be reported together.
/// A field of the wrong JSON type reads as absent instead of rejecting the body.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchPlacesBody {
    #[schema(example = "Zahnarzt")]
    #[serde(default, deserialize_with = "string_or_absent")]
    pub search_term: Option<String>,
    #[schema(example = "München")]
    #[serde(default, deserialize_with = "string_or_absent")]
    pub location: Option<String>,
    /// Radius in meters. Numeric strings are accepted as well.
    #[schema(example = 5000)]
    #[serde(default, deserialize_with = "number_or_numeric_string")]
    pub radius: Option<f64>,
}

impl SearchPlacesBody {
    /// Checks presence of all fields, flagging every one that is missing or unusable.
    pub fn validate(&self) -> Result<SearchRequest, AppError> {
        let query = non_blank(self.search_term.as_deref());
        let origin_name = non_blank(self.location.as_deref());
        let radius_meters = self.radius.filter(|r| r.is_finite() && *r > 0.0);

        match (query, origin_name, radius_meters) {
            (Some(query), Some(origin_name), Some(radius_meters)) => Ok(SearchRequest {
                query,
                origin_name,
                radius_meters,
            }),
            (query, origin_name, radius_meters) => Err(AppError::Validation {
                search_term: query.is_none(),
                location: origin_name.is_none(),
                radius: radius_meters.is_none(),
            }),
        }
    }
}

fn string_or_absent<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}

fn number_or_numeric_string<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Coordinates as exposed to API clients.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// One entry of the search response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlaceSearchResult {
    pub name: String,
    pub industry: String,
    /// Empty when the provider has no phone number.
    pub phone_number: String,
    /// Always empty, the provider exposes no e-mail addresses.
    pub email: String,
    pub address: String,
    pub website: String,
    /// Kilometers from the origin, one decimal.
    pub distance: f64,
    pub coordinates: LatLng,
}

impl From<EnrichedPlace> for PlaceSearchResult {
    fn from(place: EnrichedPlace) -> Self {
        Self {
            name: place.name,
            industry: place.industry,
            phone_number: place.phone_number.unwrap_or_default(),
            email: String::new(),
            address: place.address.unwrap_or_default(),
            website: place.website.unwrap_or_default(),
            distance: place.distance_km,
            coordinates: LatLng {
                lat: place.coordinate.latitude,
                lng: place.coordinate.longitude,
            },
        }
    }
}

/// Error body shared by every failing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    #[schema(value_type = Object)]
    pub details: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(term: Option<&str>, location: Option<&str>, radius: Option<f64>) -> SearchPlacesBody {
        SearchPlacesBody {
            search_term: term.map(str::to_string),
            location: location.map(str::to_string),
            radius,
        }
    }

    #[test]
    fn test_validate_accepts_complete_body() {
        let request = body(Some(" Zahnarzt "), Some("München"), Some(5000.0))
            .validate()
            .unwrap();

        assert_eq!(request.query, "Zahnarzt");
        assert_eq!(request.origin_name, "München");
        assert_eq!(request.radius_km(), 5.0);
    }

    #[test]
    fn test_validate_flags_every_missing_field() {
        match body(None, Some("  "), Some(0.0)).validate() {
            Err(AppError::Validation {
                search_term,
                location,
                radius,
            }) => {
                assert!(search_term);
                assert!(location);
                assert!(radius);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_non_positive_radius() {
        for radius in [-1.0, 0.0, f64::NAN, f64::INFINITY] {
            match body(Some("Bakery"), Some("Berlin"), Some(radius)).validate() {
                Err(AppError::Validation {
                    search_term,
                    location,
                    radius,
                }) => {
                    assert!(!search_term && !location && radius);
                }
                other => panic!("expected validation error, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_body_accepts_numeric_string_radius() {
        let parsed: SearchPlacesBody = serde_json::from_value(serde_json::json!({
            "searchTerm": "Zahnarzt",
            "location": "München",
            "radius": "2500"
        }))
        .unwrap();
        assert_eq!(parsed.radius, Some(2500.0));

        let parsed: SearchPlacesBody =
            serde_json::from_value(serde_json::json!({ "radius": "five km" })).unwrap();
        assert_eq!(parsed.radius, None);
        assert_eq!(parsed.search_term, None);
    }

    #[test]
    fn test_wrongly_typed_fields_read_as_absent() {
        let parsed: SearchPlacesBody = serde_json::from_value(serde_json::json!({
            "searchTerm": 42,
            "location": "München",
            "radius": true
        }))
        .unwrap();
        assert_eq!(parsed.search_term, None);
        assert_eq!(parsed.location.as_deref(), Some("München"));
        assert_eq!(parsed.radius, None);
    }

    #[test]
    fn test_result_wire_shape() {
        let place = EnrichedPlace {
            name: "Praxis Dr. Huber".into(),
            industry: "Zahnarzt".into(),
            phone_number: Some("089 123456".into()),
            address: None,
            website: None,
            distance_km: 3.2,
            exact_distance_km: 3.2024,
            coordinate: Coordinate::new(48.1639, 11.582),
        };

        let json = serde_json::to_value(PlaceSearchResult::from(place)).unwrap();
        assert_eq!(json["phoneNumber"], "089 123456");
        assert_eq!(json["email"], "");
        assert_eq!(json["address"], "");
        assert_eq!(json["distance"], 3.2);
        assert_eq!(json["coordinates"]["lat"], 48.1639);
        assert_eq!(json["coordinates"]["lng"], 11.582);
    }
}
