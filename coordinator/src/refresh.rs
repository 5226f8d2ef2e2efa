//! One fetch, normalize and persist pass over the rate feed.

use std::sync::Arc;

use fxledger_common::{ServiceError, Timestamp};
use fxledger_fx::{FeedParser, FeedSource, RateNormalizer};
use fxledger_ledger::RateStore;
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::metrics::SharedMetrics;
use crate::state::RefreshPhase;

/// Outcome of a successful refresh cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshReport {
    pub cycle_id: Uuid,
    pub rates_written: usize,
    pub captured_at: Timestamp,
    /// Publication id of the feed, when it carries one.
    pub published: Option<String>,
}

/// Observable refresh state, reported by the health endpoint.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshStatus {
    pub phase: RefreshPhase,
    pub last_success: Option<RefreshReport>,
    pub last_error: Option<String>,
    pub last_error_at: Option<Timestamp>,
}

/// Runs refresh cycles. Cycles are serialized: a trigger that arrives while
/// one is running waits for it and then runs its own.
pub struct RateRefresher {
    source: Arc<dyn FeedSource>,
    parser: Arc<dyn FeedParser>,
    normalizer: RateNormalizer,
    store: Arc<dyn RateStore>,
    metrics: SharedMetrics,
    cycle_lock: Mutex<()>,
    status: RwLock<RefreshStatus>,
}

impl RateRefresher {
    /// Create a refresher.
    pub fn new(
        source: Arc<dyn FeedSource>,
        parser: Arc<dyn FeedParser>,
        normalizer: RateNormalizer,
        store: Arc<dyn RateStore>,
        metrics: SharedMetrics,
    ) -> Self {
        Self {
            source,
            parser,
            normalizer,
            store,
            metrics,
            cycle_lock: Mutex::new(()),
            status: RwLock::new(RefreshStatus::default()),
        }
    }

    /// Current refresh status.
    pub fn status(&self) -> RefreshStatus {
        self.status.read().clone()
    }

    /// Current phase.
    pub fn phase(&self) -> RefreshPhase {
        self.status.read().phase
    }

    /// Run one full cycle. On failure the previously persisted snapshot is
    /// left untouched.
    #[instrument(skip(self), fields(cycle_id = tracing::field::Empty))]
    pub async fn refresh(&self) -> Result<RefreshReport, ServiceError> {
        let _guard = self.cycle_lock.lock().await;

        let cycle_id = Uuid::now_v7();
        tracing::Span::current().record("cycle_id", tracing::field::display(cycle_id));
        self.metrics.refresh_started();

        let result = self.run_cycle(cycle_id).await;

        let mut status = self.status.write();
        status.phase = RefreshPhase::Idle;

        match result {
            Ok(report) => {
                info!(
                    rates = report.rates_written,
                    published = ?report.published,
                    backend = self.store.backend(),
                    "Rate refresh completed"
                );
                self.metrics.refresh_succeeded(report.rates_written);
                status.last_success = Some(report.clone());
                Ok(report)
            }
            Err(e) => {
                error!(error = %e, code = e.error_code(), "Rate refresh failed");
                self.metrics.refresh_failed();
                status.last_error = Some(e.to_string());
                status.last_error_at = Some(fxledger_common::now());
                Err(e)
            }
        }
    }

    async fn run_cycle(&self, cycle_id: Uuid) -> Result<RefreshReport, ServiceError> {
        self.set_phase(RefreshPhase::Fetching);
        let payload = self.source.fetch().await?;
        debug!(source = self.source.name(), bytes = payload.len(), "Feed fetched");

        self.set_phase(RefreshPhase::Normalizing);
        let feed = self.parser.parse(&payload)?;
        let captured_at = fxledger_common::now();
        let rates = self.normalizer.normalize_at(&feed, captured_at)?;

        self.set_phase(RefreshPhase::Persisting);
        let rates_written = self.store.replace_all(rates).await?;

        Ok(RefreshReport {
            cycle_id,
            rates_written,
            captured_at,
            published: feed.published,
        })
    }

    fn set_phase(&self, phase: RefreshPhase) {
        debug!(phase = %phase, "Refresh phase");
        self.status.write().phase = phase;
    }
}
