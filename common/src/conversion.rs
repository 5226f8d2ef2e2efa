//! Conversion requests, responses and history records.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{CurrencyCode, ServiceError, Timestamp};

/// A validated request to convert `amount` from one currency to another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    pub amount: Decimal,
}

impl ConversionRequest {
    /// Create a request from already validated parts.
    pub fn new(from: CurrencyCode, to: CurrencyCode, amount: Decimal) -> Self {
        Self { from, to, amount }
    }

    /// Validate raw request fields.
    pub fn parse(from: &str, to: &str, amount: Decimal) -> Result<Self, ServiceError> {
        let from = CurrencyCode::parse(from)
            .map_err(|e| ServiceError::invalid_field(e.to_string(), "fromCurrencyCode"))?;
        let to = CurrencyCode::parse(to)
            .map_err(|e| ServiceError::invalid_field(e.to_string(), "toCurrencyCode"))?;

        let request = Self { from, to, amount };
        request.validate()?;
        Ok(request)
    }

    /// Check the amount precondition.
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.amount <= Decimal::ZERO {
            return Err(ServiceError::invalid_field(
                "Amount must be greater than zero",
                "amount",
            ));
        }
        Ok(())
    }

    /// Whether both sides name the same currency.
    pub fn is_same_currency(&self) -> bool {
        self.from == self.to
    }
}

/// Result of a conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResponse {
    pub from_currency_code: CurrencyCode,
    pub from_currency_desc: String,
    pub to_currency_code: CurrencyCode,
    pub to_currency_desc: String,
    pub original_amount: Decimal,
    pub converted_amount: Decimal,
}

/// A conversion record before the history store assigns its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewConversionRecord {
    pub from_code: CurrencyCode,
    pub from_desc: String,
    pub to_code: CurrencyCode,
    pub to_desc: String,
    pub original_amount: Decimal,
    pub converted_amount: Decimal,
    pub converted_at: Timestamp,
}

impl NewConversionRecord {
    /// Build the audit record for a completed conversion.
    pub fn from_response(response: &ConversionResponse, converted_at: Timestamp) -> Self {
        Self {
            from_code: response.from_currency_code.clone(),
            from_desc: response.from_currency_desc.clone(),
            to_code: response.to_currency_code.clone(),
            to_desc: response.to_currency_desc.clone(),
            original_amount: response.original_amount,
            converted_amount: response.converted_amount,
            converted_at,
        }
    }

    /// Attach the store-assigned id.
    pub fn with_id(self, id: i64) -> ConversionRecord {
        ConversionRecord {
            id,
            from_currency_code: self.from_code,
            from_currency_desc: self.from_desc,
            to_currency_code: self.to_code,
            to_currency_desc: self.to_desc,
            original_amount: self.original_amount,
            converted_amount: self.converted_amount,
            conversion_date: self.converted_at,
        }
    }
}

/// Persisted, append-only conversion record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionRecord {
    pub id: i64,
    pub from_currency_code: CurrencyCode,
    pub from_currency_desc: String,
    pub to_currency_code: CurrencyCode,
    pub to_currency_desc: String,
    pub original_amount: Decimal,
    pub converted_amount: Decimal,
    pub conversion_date: Timestamp,
}

/// Conjunctive filter over conversion history. Absent fields impose no
/// constraint; bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionFilter {
    pub from_currency: Option<CurrencyCode>,
    pub start: Option<Timestamp>,
    pub end: Option<Timestamp>,
}

impl ConversionFilter {
    /// Filter on source currency only.
    pub fn from_currency(code: CurrencyCode) -> Self {
        Self {
            from_currency: Some(code),
            ..Default::default()
        }
    }

    /// Restrict to an inclusive time range.
    pub fn between(mut self, start: Option<Timestamp>, end: Option<Timestamp>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    /// Reject ranges whose start lies after their end.
    pub fn validate(&self) -> Result<(), ServiceError> {
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start > end {
                return Err(ServiceError::InvalidRange { start, end });
            }
        }
        Ok(())
    }

    /// Whether a record satisfies every supplied predicate.
    pub fn matches(&self, record: &ConversionRecord) -> bool {
        if let Some(code) = &self.from_currency {
            if &record.from_currency_code != code {
                return false;
            }
        }
        if let Some(start) = self.start {
            if record.conversion_date < start {
                return false;
            }
        }
        if let Some(end) = self.end {
            if record.conversion_date > end {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn record(from: &str, at: Timestamp) -> ConversionRecord {
        NewConversionRecord {
            from_code: CurrencyCode::parse(from).unwrap(),
            from_desc: from.to_string(),
            to_code: CurrencyCode::inr(),
            to_desc: "Indian Rupee".to_string(),
            original_amount: dec!(10),
            converted_amount: dec!(852.1),
            converted_at: at,
        }
        .with_id(1)
    }

    #[test]
    fn test_parse_request() {
        let request = ConversionRequest::parse("INR", "USD", dec!(100)).unwrap();
        assert_eq!(request.from, CurrencyCode::inr());
        assert!(!request.is_same_currency());
    }

    #[test]
    fn test_parse_request_rejects_bad_fields() {
        let err = ConversionRequest::parse("inr", "USD", dec!(100)).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::InvalidRequest { field: Some(ref f), .. } if f == "fromCurrencyCode"
        ));

        let err = ConversionRequest::parse("INR", "USD", dec!(0)).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::InvalidRequest { field: Some(ref f), .. } if f == "amount"
        ));

        assert!(ConversionRequest::parse("INR", "USD", dec!(-5)).is_err());
    }

    #[test]
    fn test_filter_inclusive_bounds() {
        let d1 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let d2 = Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap();
        let filter =
            ConversionFilter::from_currency(CurrencyCode::usd()).between(Some(d1), Some(d2));

        assert!(filter.matches(&record("USD", d1)));
        assert!(filter.matches(&record("USD", d2)));
        assert!(!filter.matches(&record("USD", d2 + Duration::seconds(1))));
        assert!(!filter.matches(&record("EUR", d1)));
    }

    #[test]
    fn test_filter_rejects_inverted_range() {
        let d1 = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let d2 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let filter = ConversionFilter::default().between(Some(d1), Some(d2));

        assert!(matches!(filter.validate(), Err(ServiceError::InvalidRange { .. })));
        assert!(ConversionFilter::default().validate().is_ok());
    }
}
