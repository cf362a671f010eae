/// Tests for the maps provider client and origin resolution
/// Covers request shapes, status handling and the circuit breaker against a mock provider
use moka::future::Cache;
use serde_json::json;
use vaiba_places::errors::AppError;
use vaiba_places::models::Coordinate;
use vaiba_places::places_client::PlacesClient;
use vaiba_places::search::resolve_origin;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> PlacesClient {
    PlacesClient::new(server.uri(), "test_key".to_string()).unwrap()
}

#[cfg(test)]
mod client_tests {
    use super::*;

    #[tokio::test]
    async fn test_geocode_returns_first_match() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/maps/api/geocode/json"))
            .and(query_param("address", "Hamburg"))
            .and(query_param("key", "test_key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "OK",
                "results": [
                    { "geometry": { "location": { "lat": 53.5511, "lng": 9.9937 } } },
                    { "geometry": { "location": { "lat": 0.0, "lng": 0.0 } } }
                ]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let coordinate = client_for(&mock_server).geocode("Hamburg").await.unwrap();
        assert_eq!(coordinate, Some(Coordinate::new(53.5511, 9.9937)));
    }

    #[tokio::test]
    async fn test_nearby_first_page_sends_location_radius_and_keyword() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/maps/api/place/nearbysearch/json"))
            .and(query_param("location", "53.5511,9.9937"))
            .and(query_param("radius", "1650"))
            .and(query_param("keyword", "Steuerberater"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "OK",
                "results": [{
                    "place_id": "p1",
                    "name": "Kanzlei Meyer",
                    "geometry": { "location": { "lat": 53.55, "lng": 9.99 } }
                }],
                "next_page_token": "next"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let page = client_for(&mock_server)
            .nearby_page(Coordinate::new(53.5511, 9.9937), 1650, "Steuerberater", None)
            .await
            .unwrap();

        assert_eq!(page.places.len(), 1);
        assert_eq!(page.places[0].external_id, "p1");
        assert_eq!(page.places[0].display_name, "Kanzlei Meyer");
        assert_eq!(page.next_page_token.as_deref(), Some("next"));
    }

    #[tokio::test]
    async fn test_nearby_continuation_sends_only_the_token() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/maps/api/place/nearbysearch/json"))
            .and(query_param("pagetoken", "next"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "status": "OK", "results": [], "next_page_token": "" })),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let page = client_for(&mock_server)
            .nearby_page(Coordinate::new(53.5511, 9.9937), 1650, "Steuerberater", Some("next"))
            .await
            .unwrap();

        assert!(page.places.is_empty());
        // An empty token ends pagination
        assert!(page.next_page_token.is_none());
    }

    #[tokio::test]
    async fn test_details_request_asks_for_contact_fields() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/maps/api/place/details/json"))
            .and(query_param("place_id", "p1"))
            .and(query_param(
                "fields",
                "formatted_phone_number,formatted_address,website",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "OK",
                "result": {
                    "formatted_phone_number": "040 123456",
                    "formatted_address": "Jungfernstieg 1, 20095 Hamburg"
                }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let details = client_for(&mock_server).place_details("p1").await.unwrap();

        assert_eq!(details.phone_number.as_deref(), Some("040 123456"));
        assert_eq!(
            details.address.as_deref(),
            Some("Jungfernstieg 1, 20095 Hamburg")
        );
        assert_eq!(details.website, None);
    }

    #[tokio::test]
    async fn test_details_not_found_is_an_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/maps/api/place/details/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "NOT_FOUND" })))
            .mount(&mock_server)
            .await;

        let result = client_for(&mock_server).place_details("gone").await;
        assert!(matches!(result, Err(AppError::Upstream(_))));
    }

    #[tokio::test]
    async fn test_circuit_opens_after_repeated_upstream_failures() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/maps/api/geocode/json"))
            .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
            .expect(5) // Sixth call is rejected without reaching the provider
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        for _ in 0..5 {
            assert!(matches!(
                client.geocode("Hamburg").await,
                Err(AppError::Upstream(_))
            ));
        }

        match client.geocode("Hamburg").await {
            Err(AppError::Upstream(msg)) => assert!(msg.contains("circuit open")),
            other => panic!("expected fail-fast upstream error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_zero_results_do_not_trip_the_circuit() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/maps/api/geocode/json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "status": "ZERO_RESULTS", "results": [] })),
            )
            .expect(7)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        for _ in 0..7 {
            assert_eq!(client.geocode("Nowhere").await.unwrap(), None);
        }
    }

    #[tokio::test]
    async fn test_denied_key_does_not_trip_the_circuit() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/maps/api/place/nearbysearch/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "REQUEST_DENIED",
                "error_message": "The provided API key is invalid.",
                "results": []
            })))
            .expect(7)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let origin = Coordinate::new(48.1351, 11.5820);
        for _ in 0..7 {
            assert!(matches!(
                client.nearby_page(origin, 1000, "Zahnarzt", None).await,
                Err(AppError::Configuration(_))
            ));
        }
    }
}

#[cfg(test)]
mod origin_tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_origin_is_location_not_found_and_not_cached() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/maps/api/geocode/json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "status": "ZERO_RESULTS", "results": [] })),
            )
            .expect(2)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let cache: Cache<String, Coordinate> = Cache::new(100);

        for _ in 0..2 {
            let result = resolve_origin(&client, Some(&cache), "Atlantis").await;
            assert!(matches!(result, Err(AppError::LocationNotFound(_))));
        }
        assert_eq!(cache.get("atlantis").await, None);
    }

    #[tokio::test]
    async fn test_resolved_origin_is_cached_case_insensitively() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/maps/api/geocode/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "OK",
                "results": [{ "geometry": { "location": { "lat": 50.9375, "lng": 6.9603 } } }]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let cache: Cache<String, Coordinate> = Cache::new(100);

        let first = resolve_origin(&client, Some(&cache), "Köln").await.unwrap();
        let second = resolve_origin(&client, Some(&cache), "  KÖLN ").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(cache.get("köln").await, Some(first));
    }
}
