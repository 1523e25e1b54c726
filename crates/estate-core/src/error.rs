//! Centralized error types for the estate graph.

use thiserror::Error;

/// Why a listing record was rejected by validation.
///
/// Variants are ordered the way the rules are applied: the first failing
/// rule decides the reason.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RejectReason {
    MissingLocationQuality,
    NonIntegerLocationQuality,
    MissingPrice,
    TextualPrice,
    InvalidPrice,
    NegativePrice,
    MissingFloor,
    TextualFloor,
    InvalidFloor,
    InvalidCoordinate { field: &'static str },
    MissingEstateSize,
    InvalidEstateSize,
    MissingRooms,
    InvalidRooms,
    MissingId,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingLocationQuality => "missing_location_quality",
            Self::NonIntegerLocationQuality => "non_integer_location_quality",
            Self::MissingPrice => "missing_price",
            Self::TextualPrice => "textual_price",
            Self::InvalidPrice => "invalid_price",
            Self::NegativePrice => "negative_price",
            Self::MissingFloor => "missing_floor",
            Self::TextualFloor => "textual_floor",
            Self::InvalidFloor => "invalid_floor",
            Self::InvalidCoordinate { field: "lon" } => "invalid_lon",
            Self::InvalidCoordinate { .. } => "invalid_lat",
            Self::MissingEstateSize => "missing_estate_size",
            Self::InvalidEstateSize => "invalid_estate_size",
            Self::MissingRooms => "missing_number_of_rooms",
            Self::InvalidRooms => "invalid_number_of_rooms",
            Self::MissingId => "missing_id",
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for estate graph operations.
#[derive(Error, Debug)]
pub enum EstateError {
    #[error("Malformed listing record: {0}")]
    MalformedRecord(RejectReason),

    #[error("Missing reference entity {entity} for key '{key}'")]
    MissingReference { entity: &'static str, key: String },

    #[error("Upstream service '{service}' unavailable: {cause}")]
    ServiceUnavailable { service: String, cause: String },

    #[error("Upstream service '{service}' returned invalid data: {detail}")]
    InvalidResponse { service: String, detail: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for estate graph operations.
pub type EstateResult<T> = Result<T, EstateError>;

impl EstateError {
    /// Create an unavailable-service error.
    pub fn unavailable(service: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::ServiceUnavailable {
            service: service.into(),
            cause: cause.to_string(),
        }
    }

    /// Create an invalid-response error.
    pub fn invalid_response(service: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::InvalidResponse {
            service: service.into(),
            detail: detail.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
