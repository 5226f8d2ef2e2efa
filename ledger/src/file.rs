//! JSON file rate store.
//!
//! The whole snapshot lives in one JSON array. Writes go to a sibling temp
//! file which is then renamed over the target, so a crash mid-write leaves
//! the previous snapshot intact.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use fxledger_common::{CanonicalRate, RateTable};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::StoreResult;
use crate::rate_store::RateStore;

/// Rate store backed by a single JSON file.
pub struct JsonFileRateStore {
    path: PathBuf,
    cached: ArcSwap<RateTable>,
    write_lock: Mutex<()>,
}

impl JsonFileRateStore {
    /// Open the store at `path`, loading the existing snapshot if there is one.
    pub async fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let rates = read_snapshot(&path).await?;

        info!(path = %path.display(), rates = rates.len(), "Opened rate file");

        Ok(Self {
            path,
            cached: ArcSwap::from_pointee(rates.into_iter().collect()),
            write_lock: Mutex::new(()),
        })
    }

    /// Path of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn write(&self, table: RateTable) -> StoreResult<usize> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let rates = table.to_vec();
        let body = serde_json::to_vec_pretty(&rates)?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, &body).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        self.cached.store(Arc::new(table));

        debug!(path = %self.path.display(), rates = rates.len(), "Wrote rate file");
        Ok(rates.len())
    }
}

async fn read_snapshot(path: &Path) -> StoreResult<Vec<CanonicalRate>> {
    match tokio::fs::read(path).await {
        Ok(body) if body.iter().all(u8::is_ascii_whitespace) => Ok(Vec::new()),
        Ok(body) => Ok(serde_json::from_slice(&body)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl RateStore for JsonFileRateStore {
    fn backend(&self) -> &'static str {
        "file"
    }

    async fn load_all(&self) -> StoreResult<Vec<CanonicalRate>> {
        Ok(self.cached.load().to_vec())
    }

    async fn snapshot(&self) -> StoreResult<Arc<RateTable>> {
        Ok(self.cached.load_full())
    }

    async fn upsert(&self, rate: CanonicalRate) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        let next = self.cached.load().with_rate(rate);
        self.write(next).await?;
        Ok(())
    }

    async fn replace_all(&self, rates: Vec<CanonicalRate>) -> StoreResult<usize> {
        let _guard = self.write_lock.lock().await;
        let written = rates.len();
        let next = self.cached.load().merged_with(rates);
        self.write(next).await?;
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fxledger_common::CurrencyCode;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn rate(code: &str, value: Decimal) -> CanonicalRate {
        CanonicalRate::new(CurrencyCode::parse(code).unwrap(), code, value, Utc::now())
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileRateStore::open(dir.path().join("rates.json")).await.unwrap();

        assert!(store.load_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_replace_all_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shared").join("currency_rates.json");

        let store = JsonFileRateStore::open(&path).await.unwrap();
        let written = store
            .replace_all(vec![rate("INR", dec!(1.00)), rate("USD", dec!(83.33))])
            .await
            .unwrap();
        assert_eq!(written, 2);

        let reopened = JsonFileRateStore::open(&path).await.unwrap();
        let snapshot = reopened.snapshot().await.unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get(&CurrencyCode::usd()).unwrap().rate, dec!(83.33));

        // no temp file left behind
        let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_file_format_is_json_array() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rates.json");

        let store = JsonFileRateStore::open(&path).await.unwrap();
        store.replace_all(vec![rate("USD", dec!(83.33))]).await.unwrap();

        let body: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        let first = &body.as_array().unwrap()[0];
        assert_eq!(first["currencyCode"], "USD");
        assert_eq!(first["currencyDesc"], "USD");
        assert!(first.get("asOf").is_some());
    }

    #[tokio::test]
    async fn test_upsert_rewrites_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rates.json");

        let store = JsonFileRateStore::open(&path).await.unwrap();
        store.replace_all(vec![rate("USD", dec!(83.33))]).await.unwrap();
        store.upsert(rate("USD", dec!(84.01))).await.unwrap();
        store.upsert(rate("EUR", dec!(90.54))).await.unwrap();

        let reopened = JsonFileRateStore::open(&path).await.unwrap();
        let snapshot = reopened.snapshot().await.unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get(&CurrencyCode::usd()).unwrap().rate, dec!(84.01));
    }

    #[tokio::test]
    async fn test_replace_all_keeps_codes_missing_from_batch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rates.json");

        let store = JsonFileRateStore::open(&path).await.unwrap();
        store
            .replace_all(vec![rate("USD", dec!(83.33)), rate("EUR", dec!(90.54))])
            .await
            .unwrap();
        let written = store.replace_all(vec![rate("USD", dec!(84.01))]).await.unwrap();
        assert_eq!(written, 1);

        let reopened = JsonFileRateStore::open(&path).await.unwrap();
        let snapshot = reopened.snapshot().await.unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get(&CurrencyCode::usd()).unwrap().rate, dec!(84.01));
        assert_eq!(snapshot.get(&CurrencyCode::eur()).unwrap().rate, dec!(90.54));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rates.json");
        std::fs::write(&path, b"{not json").unwrap();

        let result = JsonFileRateStore::open(&path).await;
        assert!(matches!(result, Err(crate::StoreError::Serialization(_))));
    }
}
