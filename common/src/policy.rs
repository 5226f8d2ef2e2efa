//! Rounding and same-currency policies.
//!
//! Deployments of this service disagree on two behaviours: how many
//! fractional digits rates and converted amounts carry, and whether a
//! same-currency conversion is passed through or rejected. Both are fixed
//! once per deployment through [`ServiceMode`] so they are never mixed.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fixed number of fractional digits applied to canonical rates and
/// converted amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingPrecision {
    TwoPlaces,
    FourPlaces,
}

impl RoundingPrecision {
    /// Number of fractional digits.
    pub fn decimal_places(&self) -> u32 {
        match self {
            RoundingPrecision::TwoPlaces => 2,
            RoundingPrecision::FourPlaces => 4,
        }
    }

    /// Round a value with banker's rounding (midpoint to even).
    pub fn round(&self, value: Decimal) -> Decimal {
        value.round_dp(self.decimal_places())
    }

    /// Smallest representable step at this precision (0.01 or 0.0001).
    pub fn unit(&self) -> Decimal {
        Decimal::new(1, self.decimal_places())
    }
}

/// What the conversion engine does when source and target currency match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SameCurrencyPolicy {
    /// Return the original amount without a rate lookup.
    PassThrough,
    /// Fail the request as invalid.
    Reject,
}

/// The pair of choices the conversion path depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionPolicy {
    pub same_currency: SameCurrencyPolicy,
    pub precision: RoundingPrecision,
}

impl ConversionPolicy {
    /// Audited deployments: reject same-currency, four digits.
    pub fn ledger() -> Self {
        Self {
            same_currency: SameCurrencyPolicy::Reject,
            precision: RoundingPrecision::FourPlaces,
        }
    }

    /// Whole-snapshot deployments: pass same-currency through, two digits.
    pub fn snapshot() -> Self {
        Self {
            same_currency: SameCurrencyPolicy::PassThrough,
            precision: RoundingPrecision::TwoPlaces,
        }
    }
}

impl Default for ConversionPolicy {
    fn default() -> Self {
        Self::ledger()
    }
}

/// Deployment mode of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceMode {
    /// Persist the rate snapshot only.
    Snapshot,
    /// Persist rates and every successful conversion.
    Ledger,
}

impl ServiceMode {
    /// Conversion policy implied by this mode.
    pub fn policy(&self) -> ConversionPolicy {
        match self {
            ServiceMode::Snapshot => ConversionPolicy::snapshot(),
            ServiceMode::Ledger => ConversionPolicy::ledger(),
        }
    }

    /// Whether conversions are appended to the history store.
    pub fn records_conversions(&self) -> bool {
        matches!(self, ServiceMode::Ledger)
    }
}

impl fmt::Display for ServiceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceMode::Snapshot => write!(f, "snapshot"),
            ServiceMode::Ledger => write!(f, "ledger"),
        }
    }
}

impl FromStr for ServiceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "snapshot" | "file" => Ok(ServiceMode::Snapshot),
            "ledger" | "db" => Ok(ServiceMode::Ledger),
            other => Err(format!("unknown service mode '{other}'")),
        }
    }
}
