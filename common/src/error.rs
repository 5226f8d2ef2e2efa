//! Error types for FxLedger operations.

use crate::{CurrencyCode, Timestamp};
use thiserror::Error;

/// Main error type surfaced by the currency service.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Feed payload could not be parsed.
    #[error("Malformed rate feed: {0}")]
    MalformedFeed(String),

    /// Reference currency missing from the feed.
    #[error("Reference currency {0} not found in rate feed")]
    ReferenceRateNotFound(CurrencyCode),

    /// Feed transport failed (timeout, non-2xx, connection error).
    #[error("Rate feed unavailable: {0}")]
    FeedUnavailable(String),

    /// Lookup or conversion against a code that has no canonical rate.
    #[error("Unknown currency code: {0}")]
    UnknownCurrencyCode(String),

    /// Request failed validation or the same-currency policy.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        message: String,
        field: Option<String>,
    },

    /// History query with start after end.
    #[error("Invalid date range: start {start} is later than end {end}")]
    InvalidRange { start: Timestamp, end: Timestamp },

    /// Conversion history is not kept in this deployment mode.
    #[error("Conversion history is not recorded in this deployment")]
    HistoryDisabled,

    /// Store read or write failure.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ServiceError {
    /// Build an `InvalidRequest` without a field.
    pub fn invalid(message: impl Into<String>) -> Self {
        ServiceError::InvalidRequest {
            message: message.into(),
            field: None,
        }
    }

    /// Build an `InvalidRequest` attributed to a request field.
    pub fn invalid_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        ServiceError::InvalidRequest {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Whether the caller's input caused this error.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ServiceError::UnknownCurrencyCode(_)
                | ServiceError::InvalidRequest { .. }
                | ServiceError::InvalidRange { .. }
        )
    }

    /// Whether this error aborts a refresh cycle (the previous snapshot stays).
    pub fn is_refresh_failure(&self) -> bool {
        matches!(
            self,
            ServiceError::MalformedFeed(_)
                | ServiceError::ReferenceRateNotFound(_)
                | ServiceError::FeedUnavailable(_)
                | ServiceError::Persistence(_)
        )
    }

    /// Stable error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            ServiceError::MalformedFeed(_) => "MALFORMED_FEED",
            ServiceError::ReferenceRateNotFound(_) => "REFERENCE_RATE_NOT_FOUND",
            ServiceError::FeedUnavailable(_) => "FEED_UNAVAILABLE",
            ServiceError::UnknownCurrencyCode(_) => "UNKNOWN_CURRENCY_CODE",
            ServiceError::InvalidRequest { .. } => "INVALID_REQUEST",
            ServiceError::InvalidRange { .. } => "INVALID_RANGE",
            ServiceError::HistoryDisabled => "HISTORY_DISABLED",
            ServiceError::Persistence(_) => "PERSISTENCE_ERROR",
            ServiceError::Configuration(_) => "CONFIGURATION_ERROR",
        }
    }
}

/// Result type alias for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;
