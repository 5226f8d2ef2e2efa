//! Currency service: rate queries, conversions and conversion history.

use std::sync::Arc;

use fxledger_common::{
    CanonicalRate, ConversionFilter, ConversionRecord, ConversionRequest, ConversionResponse,
    CurrencyCode, NewConversionRecord, RateQuote, Result, ServiceError, ServiceMode,
};
use fxledger_fx::ConversionEngine;
use fxledger_ledger::{ConversionHistoryStore, RateStore};
use tracing::{debug, info, instrument, warn};

use crate::metrics::SharedMetrics;
use crate::refresh::RateRefresher;

/// Composition of the rate store, the conversion engine and the history
/// store behind the HTTP surface.
pub struct CurrencyService {
    mode: ServiceMode,
    reference: CurrencyCode,
    engine: ConversionEngine,
    refresher: Arc<RateRefresher>,
    store: Arc<dyn RateStore>,
    history: Option<Arc<dyn ConversionHistoryStore>>,
    metrics: SharedMetrics,
}

impl CurrencyService {
    /// Create a service. Ledger mode requires a history store.
    pub fn new(
        mode: ServiceMode,
        reference: CurrencyCode,
        refresher: Arc<RateRefresher>,
        store: Arc<dyn RateStore>,
        history: Option<Arc<dyn ConversionHistoryStore>>,
        metrics: SharedMetrics,
    ) -> Result<Self> {
        if mode.records_conversions() && history.is_none() {
            return Err(ServiceError::Configuration(
                "ledger mode requires a conversion history store".to_string(),
            ));
        }

        Ok(Self {
            mode,
            reference,
            engine: ConversionEngine::new(mode.policy()),
            refresher,
            store,
            history,
            metrics,
        })
    }

    /// Deployment mode.
    pub fn mode(&self) -> ServiceMode {
        self.mode
    }

    /// The refresher driving this service's rate store.
    pub fn refresher(&self) -> &Arc<RateRefresher> {
        &self.refresher
    }

    /// Metrics shared with the refresher.
    pub fn metrics(&self) -> &SharedMetrics {
        &self.metrics
    }

    /// The current canonical rate set.
    pub async fn list_rates(&self) -> Result<Vec<CanonicalRate>> {
        Ok(self.store.load_all().await?)
    }

    /// Run a refresh cycle, then return the resulting rate set. A failed
    /// cycle is reported to the caller.
    #[instrument(skip(self))]
    pub async fn refresh_and_list(&self) -> Result<Vec<CanonicalRate>> {
        let report = self.refresher.refresh().await?;
        debug!(cycle_id = %report.cycle_id, "On-demand refresh finished");
        self.list_rates().await
    }

    /// The rate of one unit of `code` in the reference currency.
    #[instrument(skip(self))]
    pub async fn get_rate(&self, code: &str) -> Result<RateQuote> {
        let code = CurrencyCode::parse(code)
            .map_err(|e| ServiceError::invalid_field(e.to_string(), "currencyCode"))?;

        let rates = self.store.snapshot().await?;
        Ok(self.engine.get_rate(&code, &rates, &self.reference)?)
    }

    /// Convert an amount. In ledger mode the conversion is recorded before
    /// the response is returned; a failed append fails the call.
    #[instrument(skip(self, request), fields(from = %request.from, to = %request.to))]
    pub async fn convert(&self, request: ConversionRequest) -> Result<ConversionResponse> {
        request.validate()?;

        let rates = self.store.snapshot().await?;
        let response = match self.engine.convert(&request, &rates) {
            Ok(response) => response,
            Err(e) => {
                let e = ServiceError::from(e);
                if e.is_client_error() {
                    self.metrics.conversion_rejected();
                }
                return Err(e);
            }
        };

        if self.mode.records_conversions() {
            if let Some(history) = &self.history {
                let record = NewConversionRecord::from_response(&response, fxledger_common::now());
                let stored = history.append(record).await.map_err(|e| {
                    warn!(error = %e, "Failed to record conversion");
                    ServiceError::from(e)
                })?;
                self.metrics.history_appended();
                debug!(record_id = stored.id, "Conversion recorded");
            }
        }

        self.metrics.conversion_completed();
        info!(
            amount = %response.original_amount,
            converted = %response.converted_amount,
            "Conversion completed"
        );

        Ok(response)
    }

    /// Conversion records matching `filter`.
    #[instrument(skip(self))]
    pub async fn conversions(&self, filter: ConversionFilter) -> Result<Vec<ConversionRecord>> {
        let history = match (&self.history, self.mode.records_conversions()) {
            (Some(history), true) => history,
            _ => return Err(ServiceError::HistoryDisabled),
        };

        filter.validate()?;
        Ok(history.query(&filter).await?)
    }
}
