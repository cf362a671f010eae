//! VAIBA Place Search API Library
//!
//! Geo-proximity prospect search: resolves a location, fans out radius-scoped
//! searches against the maps provider, deduplicates and enriches the hits with
//! contact details, and returns them nearest first.
//!
//! # Modules
//!
//! - `api`: API definitions.
//! - `core`: Core business logic.
//! - `integrations`: External service integrations.
//! - `circuit_breaker`: Circuit breaker for provider calls.
//! - `config`: Configuration management.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers and shared state.
//! - `models`: Domain and API data models.
//! - `places_client`: Maps provider client (geocoding, nearby search, details).
//! - `places_models`: Maps provider wire models.
//! - `routes`: Router assembly and OpenAPI document.
//! - `search`: The place search aggregation.

pub mod api;
pub mod core;
pub mod integrations;

pub mod circuit_breaker;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod places_client;
pub mod places_models;
pub mod routes;
pub mod search;
