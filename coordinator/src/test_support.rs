//! Shared fixtures for the coordinator tests.

use std::sync::Arc;

use fxledger_common::{CurrencyCode, ServiceMode};
use fxledger_fx::{
    FeedSource, NationalbankXmlParser, NormalizerConfig, RateNormalizer, StaticFeedSource,
};
use fxledger_ledger::{ConversionHistoryStore, MemoryConversionHistory, MemoryRateStore, RateStore};

use crate::metrics::{Metrics, SharedMetrics};
use crate::refresh::RateRefresher;
use crate::service::CurrencyService;

/// Feed whose re-based rates are round numbers: INR 1, USD 83, EUR 93,
/// DKK 0.125.
pub const FEED: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<exchangerates type="Exchange rates" author="Danmarks Nationalbank" refcur="DKK" refamt="1">
  <dailyrates id="2024-05-17">
    <currency code="EUR" desc="Euro" rate="744" />
    <currency code="INR" desc="Indian rupee" rate="8" />
    <currency code="USD" desc="US dollars" rate="664" />
  </dailyrates>
</exchangerates>"#;

pub fn refresher_with(
    source: Arc<dyn FeedSource>,
    store: Arc<dyn RateStore>,
    metrics: SharedMetrics,
) -> RateRefresher {
    refresher_for_mode(source, store, metrics, ServiceMode::Ledger)
}

fn refresher_for_mode(
    source: Arc<dyn FeedSource>,
    store: Arc<dyn RateStore>,
    metrics: SharedMetrics,
    mode: ServiceMode,
) -> RateRefresher {
    let normalizer = RateNormalizer::new(NormalizerConfig {
        precision: mode.policy().precision,
        ..Default::default()
    });
    RateRefresher::new(source, Arc::new(NationalbankXmlParser), normalizer, store, metrics)
}

fn service(mode: ServiceMode, source: Arc<StaticFeedSource>) -> CurrencyService {
    let store: Arc<dyn RateStore> = Arc::new(MemoryRateStore::new());
    let metrics = Arc::new(Metrics::new());
    let refresher = Arc::new(refresher_for_mode(source, store.clone(), metrics.clone(), mode));
    let history = mode
        .records_conversions()
        .then(|| Arc::new(MemoryConversionHistory::new()) as Arc<dyn ConversionHistoryStore>);

    match CurrencyService::new(mode, CurrencyCode::inr(), refresher, store, history, metrics) {
        Ok(service) => service,
        Err(e) => panic!("fixture service: {e}"),
    }
}

/// Ledger-mode service over in-memory stores, plus its feed source.
pub fn ledger_service() -> (CurrencyService, Arc<StaticFeedSource>) {
    let source = Arc::new(StaticFeedSource::new("static", FEED));
    (service(ServiceMode::Ledger, source.clone()), source)
}

/// Snapshot-mode service over an in-memory store.
pub fn snapshot_service(source: StaticFeedSource) -> CurrencyService {
    service(ServiceMode::Snapshot, Arc::new(source))
}
