//! Rate feed parsing.
//!
//! The production feed is the Danmarks Nationalbank XML document:
//!
//! ```xml
//! <exchangerates type="Exchange rates" author="Danmarks Nationalbank" refcur="DKK" refamt="1">
//!   <dailyrates id="2024-05-17">
//!     <currency code="USD" desc="US dollars" rate="686.62" />
//!     ...
//!   </dailyrates>
//! </exchangerates>
//! ```

use std::str::FromStr;

use fxledger_common::{CurrencyCode, RawRateEntry};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use crate::error::{FxError, FxResult};

/// A parsed feed: every published entry plus what the document says about
/// itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateFeed {
    /// The feed's own base currency, when the document declares one.
    pub base: Option<CurrencyCode>,
    /// Publication identifier (usually the rate date).
    pub published: Option<String>,
    /// Entries in document order, duplicates included.
    pub entries: Vec<RawRateEntry>,
}

impl RateFeed {
    /// Build a feed from entries alone.
    pub fn from_entries(entries: Vec<RawRateEntry>) -> Self {
        Self {
            base: None,
            published: None,
            entries,
        }
    }
}

/// Converts a raw payload into raw rate entries. Implementations are pure.
pub trait FeedParser: Send + Sync {
    /// Short name of the format, used in logs.
    fn format(&self) -> &str;

    /// Parse a payload.
    fn parse(&self, payload: &[u8]) -> FxResult<RateFeed>;
}

#[derive(Debug, Deserialize)]
struct ExchangeRatesDocument {
    #[serde(rename = "@refcur", default)]
    refcur: Option<String>,
    #[serde(rename = "dailyrates", default)]
    daily_rates: Vec<DailyRatesElement>,
}

#[derive(Debug, Deserialize)]
struct DailyRatesElement {
    #[serde(rename = "@id", default)]
    id: Option<String>,
    #[serde(rename = "currency", default)]
    currencies: Vec<CurrencyElement>,
}

#[derive(Debug, Deserialize)]
struct CurrencyElement {
    #[serde(rename = "@code", default)]
    code: Option<String>,
    #[serde(rename = "@desc", default)]
    desc: Option<String>,
    #[serde(rename = "@rate", default)]
    rate: Option<String>,
}

/// Parser for the Danmarks Nationalbank `currencyratesxml` document.
#[derive(Debug, Clone, Copy, Default)]
pub struct NationalbankXmlParser;

impl NationalbankXmlParser {
    fn parse_entry(index: usize, element: CurrencyElement) -> FxResult<RawRateEntry> {
        let code = element
            .code
            .ok_or_else(|| missing_attribute(index, "code"))?;
        let desc = element
            .desc
            .ok_or_else(|| missing_attribute(index, "desc"))?;
        let rate = element
            .rate
            .ok_or_else(|| missing_attribute(index, "rate"))?;

        let code = CurrencyCode::parse(code.trim())
            .map_err(|e| FxError::MalformedFeed(format!("currency #{index}: {e}")))?;

        let rate = parse_rate(&code, &rate)?;

        Ok(RawRateEntry::new(code, desc.trim(), rate))
    }
}

impl FeedParser for NationalbankXmlParser {
    fn format(&self) -> &str {
        "nationalbanken-xml"
    }

    fn parse(&self, payload: &[u8]) -> FxResult<RateFeed> {
        let text = std::str::from_utf8(payload)
            .map_err(|e| FxError::MalformedFeed(format!("payload is not UTF-8: {e}")))?;

        if text.trim().is_empty() {
            return Err(FxError::MalformedFeed("empty payload".to_string()));
        }

        let document: ExchangeRatesDocument = quick_xml::de::from_str(text)
            .map_err(|e| FxError::MalformedFeed(format!("invalid XML: {e}")))?;

        if document.daily_rates.is_empty() {
            return Err(FxError::MalformedFeed(
                "document has no <dailyrates> element".to_string(),
            ));
        }

        let base = match document.refcur {
            Some(code) => Some(
                CurrencyCode::parse(code.trim())
                    .map_err(|e| FxError::MalformedFeed(format!("refcur: {e}")))?,
            ),
            None => None,
        };

        let published = document.daily_rates.iter().find_map(|d| d.id.clone());

        let mut entries = Vec::new();
        for element in document
            .daily_rates
            .into_iter()
            .flat_map(|daily| daily.currencies)
        {
            entries.push(Self::parse_entry(entries.len(), element)?);
        }

        debug!(
            entries = entries.len(),
            base = ?base,
            published = ?published,
            "Parsed rate feed"
        );

        Ok(RateFeed {
            base,
            published,
            entries,
        })
    }
}

fn missing_attribute(index: usize, attribute: &str) -> FxError {
    FxError::MalformedFeed(format!("currency #{index} is missing attribute '{attribute}'"))
}

/// Parse a rate with the invariant decimal format: `.` separator, no
/// grouping, strictly positive.
fn parse_rate(code: &CurrencyCode, raw: &str) -> FxResult<Decimal> {
    let raw = raw.trim();

    if raw.contains(',') {
        return Err(FxError::MalformedFeed(format!(
            "rate '{raw}' for {code} uses a locale-specific separator"
        )));
    }

    let rate = Decimal::from_str(raw)
        .map_err(|e| FxError::MalformedFeed(format!("rate '{raw}' for {code}: {e}")))?;

    if rate <= Decimal::ZERO {
        return Err(FxError::MalformedFeed(format!(
            "rate {rate} for {code} must be positive"
        )));
    }

    Ok(rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const FEED: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<exchangerates type="Exchange rates" author="Danmarks Nationalbank" refcur="DKK" refamt="1">
  <dailyrates id="2024-05-17">
    <currency code="AUD" desc="Australian dollars" rate="458.92" />
    <currency code="INR" desc="Indian rupee" rate="8.24" />
    <currency code="USD" desc="US dollars" rate="686.62" />
  </dailyrates>
</exchangerates>"#;

    fn parse(payload: &str) -> FxResult<RateFeed> {
        NationalbankXmlParser.parse(payload.as_bytes())
    }

    #[test]
    fn test_parse_extracts_every_entry() {
        let feed = parse(FEED).unwrap();

        assert_eq!(feed.base, Some(CurrencyCode::dkk()));
        assert_eq!(feed.published.as_deref(), Some("2024-05-17"));
        assert_eq!(feed.entries.len(), 3);

        let usd = &feed.entries[2];
        assert_eq!(usd.code, CurrencyCode::usd());
        assert_eq!(usd.description, "US dollars");
        assert_eq!(usd.rate, dec!(686.62));
    }

    #[test]
    fn test_parse_keeps_duplicates_for_normalizer() {
        let payload = r#"<exchangerates><dailyrates>
            <currency code="USD" desc="US dollars" rate="686.62" />
            <currency code="USD" desc="US dollars" rate="690.00" />
        </dailyrates></exchangerates>"#;

        let feed = parse(payload).unwrap();
        assert_eq!(feed.base, None);
        assert_eq!(feed.entries.len(), 2);
    }

    #[test]
    fn test_missing_attribute_is_malformed() {
        let payload = r#"<exchangerates><dailyrates>
            <currency code="USD" rate="686.62" />
        </dailyrates></exchangerates>"#;

        match parse(payload) {
            Err(FxError::MalformedFeed(reason)) => assert!(reason.contains("desc")),
            other => panic!("expected malformed feed, got {other:?}"),
        }
    }

    #[test]
    fn test_locale_separator_is_malformed() {
        let payload = r#"<exchangerates><dailyrates>
            <currency code="USD" desc="US dollars" rate="686,62" />
        </dailyrates></exchangerates>"#;

        assert!(matches!(parse(payload), Err(FxError::MalformedFeed(_))));
    }

    #[test]
    fn test_non_numeric_and_non_positive_rates_are_malformed() {
        for rate in ["-", "abc", "0", "-1.5"] {
            let payload = format!(
                r#"<exchangerates><dailyrates><currency code="USD" desc="US dollars" rate="{rate}" /></dailyrates></exchangerates>"#
            );
            assert!(
                matches!(parse(&payload), Err(FxError::MalformedFeed(_))),
                "rate {rate} should be rejected"
            );
        }
    }

    #[test]
    fn test_bad_code_is_malformed() {
        let payload = r#"<exchangerates><dailyrates>
            <currency code="usd" desc="US dollars" rate="686.62" />
        </dailyrates></exchangerates>"#;

        assert!(matches!(parse(payload), Err(FxError::MalformedFeed(_))));
    }

    #[test]
    fn test_unparsable_payloads_are_malformed() {
        let payloads = [
            "",
            "   ",
            "<exchangerates><dailyrates></exchangerates>",
            "<html><body>Service unavailable</body></html>",
        ];

        for payload in payloads {
            assert!(
                matches!(parse(payload), Err(FxError::MalformedFeed(_))),
                "payload {payload:?} should be rejected"
            );
        }

        assert!(matches!(
            NationalbankXmlParser.parse(&[0xff, 0xfe, 0x00]),
            Err(FxError::MalformedFeed(_))
        ));
    }
}
