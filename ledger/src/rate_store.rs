//! Canonical rate persistence.

use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use fxledger_common::{CanonicalRate, RateTable};
use tracing::debug;

use crate::error::StoreResult;

/// Persistence of the canonical rate set.
///
/// Readers always observe a complete snapshot: either the one before a
/// write or the one after it.
#[async_trait]
pub trait RateStore: Send + Sync {
    /// Short backend name, used in logs.
    fn backend(&self) -> &'static str;

    /// Every persisted rate; empty if nothing has been written yet.
    async fn load_all(&self) -> StoreResult<Vec<CanonicalRate>>;

    /// The persisted rates as a lookup table.
    async fn snapshot(&self) -> StoreResult<Arc<RateTable>> {
        Ok(Arc::new(self.load_all().await?.into_iter().collect()))
    }

    /// Insert `rate`, or overwrite rate and timestamp of the existing entry
    /// with the same code. The stored description is kept.
    async fn upsert(&self, rate: CanonicalRate) -> StoreResult<()>;

    /// Upsert a whole refresh batch atomically. Codes absent from `rates`
    /// keep their previous entry. Returns the number of rates written.
    async fn replace_all(&self, rates: Vec<CanonicalRate>) -> StoreResult<usize>;
}

/// In-process store holding an atomically swapped snapshot.
pub struct MemoryRateStore {
    current: ArcSwap<RateTable>,
}

impl MemoryRateStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(RateTable::new()),
        }
    }

    /// Create a store seeded with `rates`.
    pub fn with_rates(rates: impl IntoIterator<Item = CanonicalRate>) -> Self {
        Self {
            current: ArcSwap::from_pointee(rates.into_iter().collect()),
        }
    }
}

impl Default for MemoryRateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RateStore for MemoryRateStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn load_all(&self) -> StoreResult<Vec<CanonicalRate>> {
        Ok(self.current.load().to_vec())
    }

    async fn snapshot(&self) -> StoreResult<Arc<RateTable>> {
        Ok(self.current.load_full())
    }

    async fn upsert(&self, rate: CanonicalRate) -> StoreResult<()> {
        self.current.rcu(|table| table.with_rate(rate.clone()));
        Ok(())
    }

    async fn replace_all(&self, rates: Vec<CanonicalRate>) -> StoreResult<usize> {
        let written = rates.len();
        self.current.rcu(|table| table.merged_with(rates.iter().cloned()));

        debug!(rates = written, "Swapped in-memory rate snapshot");
        Ok(written)
    }
}
