//! FxLedger FX Engine
//!
//! Rate ingestion and conversion for the FxLedger service.
//!
//! # Features
//!
//! - Pluggable feed transport ([`FeedSource`]) and feed format ([`FeedParser`])
//! - Re-basing of a published feed onto a reference currency
//! - Conversion through the reference currency with a fixed rounding policy
//!
//! # Example
//!
//! ```rust,ignore
//! use fxledger_fx::{ConversionEngine, FeedParser, NationalbankXmlParser, RateNormalizer};
//!
//! let feed = NationalbankXmlParser.parse(&payload)?;
//! let rates: RateTable = RateNormalizer::default().normalize(&feed)?.into_iter().collect();
//!
//! let engine = ConversionEngine::new(ConversionPolicy::ledger());
//! let response = engine.convert(&request, &rates)?;
//! ```

pub mod engine;
pub mod error;
pub mod feed;
pub mod normalizer;
pub mod source;

pub use engine::ConversionEngine;
pub use error::{FxError, FxResult};
pub use feed::{FeedParser, NationalbankXmlParser, RateFeed};
pub use normalizer::{NormalizerConfig, RateNormalizer};
pub use source::{FeedSource, HttpFeedSource};

#[cfg(any(test, feature = "test-utils"))]
pub use source::StaticFeedSource;
