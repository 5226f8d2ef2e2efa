//! Re-basing of feed rates onto the reference currency.

use std::collections::BTreeMap;

use chrono::Utc;
use fxledger_common::{CanonicalRate, CurrencyCode, RoundingPrecision, Timestamp};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::error::{FxError, FxResult};
use crate::feed::RateFeed;

/// Configuration for the normalizer.
#[derive(Debug, Clone)]
pub struct NormalizerConfig {
    /// Currency every canonical rate is expressed in.
    pub reference: CurrencyCode,
    /// Base currency of the feed when the document does not declare one.
    pub feed_base: CurrencyCode,
    /// Description used for the synthesized feed-base entry.
    pub feed_base_description: String,
    /// Fractional digits kept on canonical rates.
    pub precision: RoundingPrecision,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            reference: CurrencyCode::inr(),
            feed_base: CurrencyCode::dkk(),
            feed_base_description: "Danish Krone".to_string(),
            precision: RoundingPrecision::FourPlaces,
        }
    }
}

/// Turns a parsed feed into the canonical rate set.
#[derive(Debug, Clone, Default)]
pub struct RateNormalizer {
    config: NormalizerConfig,
}

impl RateNormalizer {
    /// Create a normalizer with the given configuration.
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    /// The reference currency.
    pub fn reference(&self) -> &CurrencyCode {
        &self.config.reference
    }

    /// The rounding precision applied to canonical rates.
    pub fn precision(&self) -> RoundingPrecision {
        self.config.precision
    }

    /// Normalize a feed, stamping every rate with the current instant.
    pub fn normalize(&self, feed: &RateFeed) -> FxResult<Vec<CanonicalRate>> {
        self.normalize_at(feed, Utc::now())
    }

    /// Normalize a feed, stamping every rate with `captured_at`.
    ///
    /// Each canonical rate is `raw / reference_raw`; the feed's own base
    /// currency is added as `1 / reference_raw` unless the feed already lists
    /// it. Duplicate codes resolve to the last occurrence. An entry whose
    /// canonical rate rounds to zero at the configured precision is dropped
    /// with a warning, so every returned rate is positive.
    pub fn normalize_at(
        &self,
        feed: &RateFeed,
        captured_at: Timestamp,
    ) -> FxResult<Vec<CanonicalRate>> {
        let reference = &self.config.reference;
        let precision = self.config.precision;

        let reference_rate = feed
            .entries
            .iter()
            .rev()
            .find(|entry| &entry.code == reference)
            .map(|entry| entry.rate)
            .ok_or_else(|| FxError::ReferenceRateNotFound(reference.clone()))?;

        if reference_rate <= Decimal::ZERO {
            return Err(FxError::MalformedFeed(format!(
                "reference rate {reference_rate} for {reference} must be positive"
            )));
        }

        debug!(
            reference = %reference,
            reference_rate = %reference_rate,
            "Re-basing feed onto reference currency"
        );

        let mut canonical: BTreeMap<CurrencyCode, CanonicalRate> = BTreeMap::new();

        for entry in &feed.entries {
            let rate = rebase(entry.rate, reference_rate, precision, &entry.code)?;

            if rate.is_zero() {
                warn!(
                    code = %entry.code,
                    raw_rate = %entry.rate,
                    "Canonical rate rounds to zero; entry dropped"
                );
                continue;
            }

            let previous = canonical.insert(
                entry.code.clone(),
                CanonicalRate::new(
                    entry.code.clone(),
                    entry.description.clone(),
                    rate,
                    captured_at,
                ),
            );

            if previous.is_some() {
                warn!(code = %entry.code, "Duplicate currency in feed; last occurrence wins");
            }
        }

        let feed_base = feed.base.as_ref().unwrap_or(&self.config.feed_base);
        if !feed.entries.iter().any(|entry| &entry.code == feed_base) {
            let rate = rebase(Decimal::ONE, reference_rate, precision, feed_base)?;

            if rate.is_zero() {
                warn!(code = %feed_base, "Feed base rate rounds to zero; not synthesized");
            } else {
                let description = if feed_base == &self.config.feed_base {
                    self.config.feed_base_description.clone()
                } else {
                    feed_base.to_string()
                };

                canonical.insert(
                    feed_base.clone(),
                    CanonicalRate::new(feed_base.clone(), description, rate, captured_at),
                );
            }
        }

        Ok(canonical.into_values().collect())
    }
}

fn rebase(
    raw: Decimal,
    reference_rate: Decimal,
    precision: RoundingPrecision,
    code: &CurrencyCode,
) -> FxResult<Decimal> {
    raw.checked_div(reference_rate)
        .map(|rate| precision.round(rate))
        .ok_or_else(|| FxError::MalformedFeed(format!("rate for {code} is out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fxledger_common::RawRateEntry;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;
    use std::collections::BTreeSet;

    fn code(s: &str) -> CurrencyCode {
        CurrencyCode::parse(s).unwrap()
    }

    fn entry(c: &str, rate: Decimal) -> RawRateEntry {
        RawRateEntry::new(code(c), format!("{c} description"), rate)
    }

    fn find<'a>(rates: &'a [CanonicalRate], c: &str) -> &'a CanonicalRate {
        rates.iter().find(|r| r.code.as_str() == c).unwrap()
    }

    #[test]
    fn test_rebases_onto_reference() {
        let feed = RateFeed {
            base: Some(code("DKK")),
            published: None,
            entries: vec![
                entry("USD", dec!(686.62)),
                entry("INR", dec!(8.24)),
                entry("EUR", dec!(746.07)),
            ],
        };

        let rates = RateNormalizer::default().normalize(&feed).unwrap();

        assert_eq!(rates.len(), 4);
        assert_eq!(find(&rates, "INR").rate, dec!(1.0000));
        assert_eq!(find(&rates, "USD").rate, dec!(83.3277));
        assert_eq!(find(&rates, "EUR").rate, dec!(90.5425));
        // 1 / 8.24
        assert_eq!(find(&rates, "DKK").rate, dec!(0.1214));
        assert_eq!(find(&rates, "DKK").description, "Danish Krone");
    }

    #[test]
    fn test_feed_entry_wins_over_synthetic_base() {
        let feed = RateFeed {
            base: Some(code("DKK")),
            published: None,
            entries: vec![
                entry("USD", dec!(0.1355)),
                entry("INR", dec!(1.0)),
                entry("DKK", dec!(7.46)),
            ],
        };

        let rates = RateNormalizer::default().normalize(&feed).unwrap();

        assert_eq!(rates.len(), 3);
        assert_eq!(find(&rates, "INR").rate, dec!(1.0000));
        assert_eq!(find(&rates, "USD").rate, dec!(0.1355));
        assert_eq!(find(&rates, "DKK").rate, dec!(7.4600));
        assert_eq!(find(&rates, "DKK").description, "DKK description");
    }

    #[test]
    fn test_configured_base_used_when_feed_is_silent() {
        let feed = RateFeed::from_entries(vec![entry("INR", dec!(8))]);

        let rates = RateNormalizer::default().normalize(&feed).unwrap();

        assert_eq!(rates.len(), 2);
        assert_eq!(find(&rates, "DKK").rate, dec!(0.125));
    }

    #[test]
    fn test_two_place_precision() {
        let config = NormalizerConfig {
            precision: RoundingPrecision::TwoPlaces,
            ..Default::default()
        };
        let feed =
            RateFeed::from_entries(vec![entry("USD", dec!(686.62)), entry("INR", dec!(8.24))]);

        let rates = RateNormalizer::new(config).normalize(&feed).unwrap();

        assert_eq!(find(&rates, "USD").rate, dec!(83.33));
        assert_eq!(find(&rates, "DKK").rate, dec!(0.12));
    }

    #[test]
    fn test_missing_reference_fails() {
        let feed =
            RateFeed::from_entries(vec![entry("USD", dec!(686.62)), entry("EUR", dec!(746.07))]);

        let err = RateNormalizer::default().normalize(&feed).unwrap_err();
        assert!(matches!(err, FxError::ReferenceRateNotFound(ref c) if c == &CurrencyCode::inr()));

        let empty = RateFeed::from_entries(vec![]);
        assert!(matches!(
            RateNormalizer::default().normalize(&empty),
            Err(FxError::ReferenceRateNotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_codes_last_wins() {
        let feed = RateFeed::from_entries(vec![
            entry("INR", dec!(8)),
            entry("USD", dec!(680)),
            entry("USD", dec!(688)),
        ]);

        let rates = RateNormalizer::default().normalize(&feed).unwrap();

        assert_eq!(rates.iter().filter(|r| r.code == CurrencyCode::usd()).count(), 1);
        assert_eq!(find(&rates, "USD").rate, dec!(86));
    }

    #[test]
    fn test_rates_rounding_to_zero_are_dropped() {
        let config = NormalizerConfig {
            precision: RoundingPrecision::TwoPlaces,
            ..Default::default()
        };
        let feed = RateFeed::from_entries(vec![entry("INR", dec!(8)), entry("VND", dec!(0.027))]);

        let rates = RateNormalizer::new(config).normalize(&feed).unwrap();

        assert!(rates.iter().all(|r| r.rate > Decimal::ZERO));
        assert!(rates.iter().all(|r| r.code.as_str() != "VND"));
    }

    #[test]
    fn test_single_capture_instant() {
        let feed = RateFeed::from_entries(vec![
            entry("INR", dec!(8)),
            entry("USD", dec!(680)),
            entry("EUR", dec!(746)),
        ]);
        let captured_at = Utc::now();

        let rates = RateNormalizer::default().normalize_at(&feed, captured_at).unwrap();

        assert!(rates.iter().all(|r| r.as_of == captured_at));
    }

    fn arb_code() -> impl Strategy<Value = CurrencyCode> {
        "[A-Z]{3}".prop_map(|s| CurrencyCode::parse(&s).unwrap())
    }

    fn arb_rate() -> impl Strategy<Value = Decimal> {
        (1i64..100_000_000i64).prop_map(|n| Decimal::new(n, 4))
    }

    proptest! {
        #[test]
        fn prop_one_rate_per_code_plus_base(
            others in proptest::collection::vec((arb_code(), arb_rate()), 0..40),
            reference_rate in (1i64..1_000_000i64).prop_map(|n| Decimal::new(n, 6)),
        ) {
            let mut entries: Vec<RawRateEntry> = others
                .iter()
                .filter(|(c, _)| c.as_str() != "INR" && c.as_str() != "DKK")
                .map(|(c, r)| RawRateEntry::new(c.clone(), c.to_string(), *r))
                .collect();
            entries.push(RawRateEntry::new(CurrencyCode::inr(), "Indian rupee", reference_rate));

            let mut expected: BTreeSet<_> = entries.iter().map(|e| e.code.clone()).collect();
            let distinct = expected.len();
            expected.insert(CurrencyCode::dkk());
            let feed = RateFeed::from_entries(entries);

            let rates = RateNormalizer::default().normalize(&feed).unwrap();
            let codes: BTreeSet<_> = rates.iter().map(|r| r.code.clone()).collect();

            // one rate per distinct code plus the synthesized base
            prop_assert_eq!(rates.len(), distinct + 1);
            prop_assert_eq!(codes, expected);
            prop_assert!(rates.iter().all(|r| r.rate > Decimal::ZERO));
        }

        #[test]
        fn prop_missing_reference_always_fails(
            others in proptest::collection::vec((arb_code(), arb_rate()), 0..40),
        ) {
            let entries: Vec<RawRateEntry> = others
                .into_iter()
                .filter(|(c, _)| c.as_str() != "INR")
                .map(|(c, r)| RawRateEntry::new(c.clone(), c.to_string(), r))
                .collect();

            let result = RateNormalizer::default().normalize(&RateFeed::from_entries(entries));
            prop_assert!(matches!(result, Err(FxError::ReferenceRateNotFound(_))));
        }
    }
}
