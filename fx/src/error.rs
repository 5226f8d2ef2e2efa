//! FX engine error types.

use fxledger_common::{CurrencyCode, ServiceError};
use thiserror::Error;

/// Errors that can occur while ingesting rates or converting amounts.
#[derive(Debug, Error)]
pub enum FxError {
    /// Feed payload could not be parsed.
    #[error("Malformed rate feed: {0}")]
    MalformedFeed(String),

    /// Reference currency missing from the feed.
    #[error("Reference currency {0} not found in rate feed")]
    ReferenceRateNotFound(CurrencyCode),

    /// No canonical rate for the requested currency.
    #[error("Unknown currency code: {0}")]
    UnknownCurrencyCode(CurrencyCode),

    /// Same-currency conversion rejected by policy.
    #[error("Cannot convert {0} to itself: same currency")]
    SameCurrency(CurrencyCode),

    /// Decimal arithmetic overflowed.
    #[error("Amount {amount} {from} cannot be converted to {to}: arithmetic overflow")]
    Overflow {
        amount: String,
        from: CurrencyCode,
        to: CurrencyCode,
    },

    /// Feed transport failed.
    #[error("Feed source {provider} failed: {reason}")]
    FeedUnavailable { provider: String, reason: String },
}

impl From<FxError> for ServiceError {
    fn from(err: FxError) -> Self {
        match err {
            FxError::MalformedFeed(reason) => ServiceError::MalformedFeed(reason),
            FxError::ReferenceRateNotFound(code) => ServiceError::ReferenceRateNotFound(code),
            FxError::UnknownCurrencyCode(code) => {
                ServiceError::UnknownCurrencyCode(code.to_string())
            }
            FxError::SameCurrency(_) => ServiceError::invalid_field(
                "FromCurrencyCode and ToCurrencyCode can't be the same",
                "toCurrencyCode",
            ),
            e @ FxError::Overflow { .. } => ServiceError::invalid_field(e.to_string(), "amount"),
            e @ FxError::FeedUnavailable { .. } => ServiceError::FeedUnavailable(e.to_string()),
        }
    }
}

/// Result type for FX operations.
pub type FxResult<T> = Result<T, FxError>;
