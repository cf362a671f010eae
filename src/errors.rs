use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;

/// Application-specific error types.
#[derive(Debug, Clone)]
pub enum AppError {
    /// Required request fields were absent or unusable. Each flag is `true` when the field failed.
    Validation {
        search_term: bool,
        location: bool,
        radius: bool,
    },
    /// The origin name could not be geocoded.
    LocationNotFound(String),
    /// The maps provider credential is missing or was refused.
    Configuration(String),
    /// A geocoding or zone-search call failed.
    Upstream(String),
    /// The whole search exceeded its time budget.
    Timeout(Duration),
    /// Internal server error.
    Internal(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl AppError {
    /// Returns the innermost error, skipping context wrappers.
    pub fn root(&self) -> &AppError {
        match self {
            AppError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// HTTP status the error is reported with.
    pub fn status(&self) -> StatusCode {
        match self.root() {
            AppError::Validation { .. } | AppError::LocationNotFound(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for AppError {
    /// Formats the error for display.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation {
                search_term,
                location,
                radius,
            } => {
                let missing: Vec<&str> = [
                    (*search_term, "searchTerm"),
                    (*location, "location"),
                    (*radius, "radius"),
                ]
                .into_iter()
                .filter_map(|(flag, name)| flag.then_some(name))
                .collect();
                write!(f, "Missing required fields: {}", missing.join(", "))
            }
            AppError::LocationNotFound(msg) => write!(f, "Location not found: {}", msg),
            AppError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Upstream(msg) => write!(f, "Upstream error: {}", msg),
            AppError::Timeout(limit) => write!(f, "Timed out after {}s", limit.as_secs()),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    /// Converts the error into an HTTP response.
    ///
    /// Every body has the shape `{ "error": ..., "details": ... }`.
    fn into_response(self) -> Response {
        let (error_message, details): (&str, Value) = match &self {
            AppError::Validation {
                search_term,
                location,
                radius,
            } => {
                tracing::warn!("Rejected search request: {}", self);
                (
                    "Missing required fields",
                    json!({
                        "searchTerm": search_term,
                        "location": location,
                        "radius": radius,
                    }),
                )
            }
            AppError::LocationNotFound(msg) => {
                tracing::warn!("Location not found: {}", msg);
                ("Location not found", json!(msg))
            }
            AppError::Configuration(msg) => {
                tracing::error!("Configuration error: {}", msg);
                ("Maps API is not configured", json!(msg))
            }
            AppError::Upstream(msg) => {
                tracing::error!("Upstream error: {}", msg);
                ("Failed to search places", json!(msg))
            }
            AppError::Timeout(limit) => {
                tracing::error!("Place search timed out after {:?}", limit);
                (
                    "Place search timed out",
                    json!(format!("no result within {}s", limit.as_secs())),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                ("Internal server error", json!(msg))
            }
            AppError::WithContext { source, context } => {
                // Log full context chain, then answer as the underlying error
                tracing::error!("Error with context: {} -> {}", context, source);
                return (**source).clone().into_response();
            }
        };

        let body = Json(json!({
            "error": error_message,
            "details": details,
        }));

        (self.status(), body).into_response()
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;

    /// Add context lazily (only evaluated on error).
    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}
