//! ISO 4217 style currency codes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a string is not a well-formed currency code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid currency code '{0}': expected three uppercase letters")]
pub struct InvalidCurrencyCode(pub String);

/// Three-letter uppercase currency code (e.g. `USD`).
///
/// Construction always validates, so holding a `CurrencyCode` means the
/// value is exactly three ASCII uppercase letters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Parse and validate a currency code.
    pub fn parse(code: &str) -> Result<Self, InvalidCurrencyCode> {
        if code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase()) {
            Ok(Self(code.to_string()))
        } else {
            Err(InvalidCurrencyCode(code.to_string()))
        }
    }

    /// Get the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn usd() -> Self {
        Self("USD".to_string())
    }

    pub fn eur() -> Self {
        Self("EUR".to_string())
    }

    pub fn dkk() -> Self {
        Self("DKK".to_string())
    }

    pub fn inr() -> Self {
        Self("INR".to_string())
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CurrencyCode {
    type Err = InvalidCurrencyCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = InvalidCurrencyCode;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

impl AsRef<str> for CurrencyCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_codes() {
        assert_eq!(CurrencyCode::parse("USD").unwrap().as_str(), "USD");
        assert_eq!("INR".parse::<CurrencyCode>().unwrap(), CurrencyCode::inr());
    }

    #[test]
    fn test_invalid_codes() {
        for bad in ["usd", "US", "USDT", "U1D", "", "ÄBC"] {
            assert!(CurrencyCode::parse(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_serde_roundtrip_as_plain_string() {
        let json = serde_json::to_string(&CurrencyCode::eur()).unwrap();
        assert_eq!(json, "\"EUR\"");

        let parsed: CurrencyCode = serde_json::from_str("\"DKK\"").unwrap();
        assert_eq!(parsed, CurrencyCode::dkk());

        assert!(serde_json::from_str::<CurrencyCode>("\"dkk\"").is_err());
    }
}
