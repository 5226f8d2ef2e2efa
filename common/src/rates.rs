//! Raw and canonical exchange rates.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{CurrencyCode, Timestamp};

/// One currency entry as published by the external feed.
///
/// `rate` is expressed against the feed's own base currency and has not
/// been re-based yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRateEntry {
    pub code: CurrencyCode,
    pub description: String,
    pub rate: Decimal,
}

impl RawRateEntry {
    pub fn new(code: CurrencyCode, description: impl Into<String>, rate: Decimal) -> Self {
        Self {
            code,
            description: description.into(),
            rate,
        }
    }
}

/// A currency's rate expressed in units of the reference currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalRate {
    /// Currency code (unique within a rate table).
    #[serde(rename = "currencyCode")]
    pub code: CurrencyCode,
    /// Human-readable currency name.
    #[serde(rename = "currencyDesc")]
    pub description: String,
    /// Value of one unit of `code` in reference-currency units. Always positive.
    pub rate: Decimal,
    /// Capture instant of the refresh cycle that produced this rate.
    pub as_of: Timestamp,
}

impl CanonicalRate {
    pub fn new(
        code: CurrencyCode,
        description: impl Into<String>,
        rate: Decimal,
        as_of: Timestamp,
    ) -> Self {
        Self {
            code,
            description: description.into(),
            rate,
            as_of,
        }
    }
}

/// An immutable snapshot of canonical rates keyed by currency code.
///
/// Stores hand out whole tables so readers never observe a partially
/// written refresh batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateTable {
    rates: BTreeMap<CurrencyCode, CanonicalRate>,
}

impl RateTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the rate for a currency code.
    pub fn get(&self, code: &CurrencyCode) -> Option<&CanonicalRate> {
        self.rates.get(code)
    }

    /// Check whether a code is present.
    pub fn contains(&self, code: &CurrencyCode) -> bool {
        self.rates.contains_key(code)
    }

    /// Insert or overwrite the rate for `rate.code`.
    pub fn upsert(&mut self, rate: CanonicalRate) {
        self.rates.insert(rate.code.clone(), rate);
    }

    /// Insert `rate`, or overwrite the rate and timestamp of the existing
    /// entry. An existing entry keeps its stored description.
    pub fn merge(&mut self, mut rate: CanonicalRate) {
        if let Some(existing) = self.rates.get(&rate.code) {
            rate.description = existing.description.clone();
        }
        self.rates.insert(rate.code.clone(), rate);
    }

    /// Return a copy of this table with one rate merged in.
    pub fn with_rate(&self, rate: CanonicalRate) -> Self {
        self.merged_with(std::iter::once(rate))
    }

    /// Return a copy of this table with a batch merged in. Codes absent from
    /// the batch keep their current entry.
    pub fn merged_with(&self, rates: impl IntoIterator<Item = CanonicalRate>) -> Self {
        let mut next = self.clone();
        for rate in rates {
            next.merge(rate);
        }
        next
    }

    /// Number of currencies in the table.
    pub fn len(&self) -> usize {
        self.rates.len()
    }

    /// Whether the table holds no rates.
    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Iterate rates in currency-code order.
    pub fn iter(&self) -> impl Iterator<Item = &CanonicalRate> {
        self.rates.values()
    }

    /// Copy the rates out in currency-code order.
    pub fn to_vec(&self) -> Vec<CanonicalRate> {
        self.rates.values().cloned().collect()
    }
}

impl FromIterator<CanonicalRate> for RateTable {
    /// Later entries with the same code replace earlier ones.
    fn from_iter<I: IntoIterator<Item = CanonicalRate>>(iter: I) -> Self {
        let mut table = RateTable::new();
        for rate in iter {
            table.upsert(rate);
        }
        table
    }
}

/// Response for a single-currency rate lookup: one unit of
/// `base_currency_code` is worth `converted_currency_amount` units of the
/// reference currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateQuote {
    pub base_currency_code: CurrencyCode,
    pub base_currency_desc: String,
    pub base_currency_amount: Decimal,
    pub converted_currency_code: CurrencyCode,
    pub converted_currency_amount: Decimal,
    pub as_of: Timestamp,
}
