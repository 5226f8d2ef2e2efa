//! Conversion history persistence.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use fxledger_common::{ConversionFilter, ConversionRecord, NewConversionRecord};
use parking_lot::RwLock;

use crate::error::StoreResult;

/// Append-only log of completed conversions.
#[async_trait]
pub trait ConversionHistoryStore: Send + Sync {
    /// Short backend name, used in logs.
    fn backend(&self) -> &'static str;

    /// Persist a record and return it with its generated id.
    async fn append(&self, record: NewConversionRecord) -> StoreResult<ConversionRecord>;

    /// Records matching every predicate of `filter`, ordered by conversion
    /// time then id. The caller validates the range beforehand.
    async fn query(&self, filter: &ConversionFilter) -> StoreResult<Vec<ConversionRecord>>;
}

/// In-process conversion history.
#[derive(Default)]
pub struct MemoryConversionHistory {
    records: RwLock<Vec<ConversionRecord>>,
    next_id: AtomicI64,
}

impl MemoryConversionHistory {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether no record has been stored.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl ConversionHistoryStore for MemoryConversionHistory {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn append(&self, record: NewConversionRecord) -> StoreResult<ConversionRecord> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let record = record.with_id(id);
        self.records.write().push(record.clone());
        Ok(record)
    }

    async fn query(&self, filter: &ConversionFilter) -> StoreResult<Vec<ConversionRecord>> {
        let mut matched: Vec<ConversionRecord> = self
            .records
            .read()
            .iter()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect();

        matched.sort_by(|a, b| {
            a.conversion_date
                .cmp(&b.conversion_date)
                .then(a.id.cmp(&b.id))
        });
        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use fxledger_common::{CurrencyCode, Timestamp};
    use rust_decimal_macros::dec;

    fn new_record(from: &str, at: Timestamp) -> NewConversionRecord {
        NewConversionRecord {
            from_code: CurrencyCode::parse(from).unwrap(),
            from_desc: format!("{from} name"),
            to_code: CurrencyCode::inr(),
            to_desc: "Indian Rupee".to_string(),
            original_amount: dec!(10),
            converted_amount: dec!(833.28),
            converted_at: at,
        }
    }

    #[tokio::test]
    async fn test_append_assigns_increasing_ids() {
        let history = MemoryConversionHistory::new();
        let at = Utc::now();

        let first = history.append(new_record("USD", at)).await.unwrap();
        let second = history.append(new_record("USD", at)).await.unwrap();

        assert!(second.id > first.id);
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn test_query_filters_and_orders() {
        let history = MemoryConversionHistory::new();
        let jan = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        let feb = Utc.with_ymd_and_hms(2024, 2, 15, 12, 0, 0).unwrap();
        let mar = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();

        history.append(new_record("USD", mar)).await.unwrap();
        history.append(new_record("EUR", feb)).await.unwrap();
        history.append(new_record("USD", jan)).await.unwrap();
        history.append(new_record("USD", feb)).await.unwrap();

        let all = history.query(&ConversionFilter::default()).await.unwrap();
        assert_eq!(all.len(), 4);
        assert!(all
            .windows(2)
            .all(|w| (w[0].conversion_date, w[0].id) <= (w[1].conversion_date, w[1].id)));

        let usd = history
            .query(&ConversionFilter::from_currency(CurrencyCode::usd()))
            .await
            .unwrap();
        assert_eq!(usd.len(), 3);

        let filter =
            ConversionFilter::from_currency(CurrencyCode::usd()).between(Some(jan), Some(feb));
        let usd_until_feb = history.query(&filter).await.unwrap();
        assert_eq!(usd_until_feb.len(), 2);
        assert_eq!(usd_until_feb[0].conversion_date, jan);

        let none = history
            .query(&ConversionFilter::default().between(Some(mar + Duration::days(1)), None))
            .await
            .unwrap();
        assert!(none.is_empty());
    }
}
