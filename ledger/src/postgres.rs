//! PostgreSQL stores.
//!
//! Tables are created on startup with [`migrate`] and are never dropped or
//! truncated by the service:
//!
//! - `currency_rates`: one row per currency code, overwritten in place.
//! - `currency_conversions`: append-only, indexed on `conversion_date`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fxledger_common::{
    CanonicalRate, ConversionFilter, ConversionRecord, CurrencyCode, NewConversionRecord, RateTable,
};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use tracing::{debug, info, instrument};

use crate::error::{StoreError, StoreResult};
use crate::history::ConversionHistoryStore;
use crate::rate_store::RateStore;

const CREATE_RATES: &str = r#"
CREATE TABLE IF NOT EXISTS currency_rates (
    id              BIGSERIAL PRIMARY KEY,
    currency_code   VARCHAR(3)  NOT NULL UNIQUE,
    currency_desc   TEXT        NOT NULL,
    rate            NUMERIC     NOT NULL CHECK (rate > 0),
    as_of           TIMESTAMPTZ NOT NULL
)"#;

const CREATE_CONVERSIONS: &str = r#"
CREATE TABLE IF NOT EXISTS currency_conversions (
    id                  BIGSERIAL PRIMARY KEY,
    from_currency_code  VARCHAR(3)  NOT NULL,
    from_currency_desc  TEXT        NOT NULL,
    to_currency_code    VARCHAR(3)  NOT NULL,
    to_currency_desc    TEXT        NOT NULL,
    original_amount     NUMERIC     NOT NULL,
    converted_amount    NUMERIC     NOT NULL,
    conversion_date     TIMESTAMPTZ NOT NULL
)"#;

const CREATE_CONVERSIONS_DATE_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_currency_conversions_date
    ON currency_conversions (conversion_date)"#;

const UPSERT_RATE: &str = r#"
INSERT INTO currency_rates (currency_code, currency_desc, rate, as_of)
VALUES ($1, $2, $3, $4)
ON CONFLICT (currency_code) DO UPDATE
SET rate  = EXCLUDED.rate,
    as_of = EXCLUDED.as_of"#;

/// Connect a pool to `url`.
pub async fn connect(url: &str, max_connections: u32) -> StoreResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await?;
    Ok(pool)
}

/// Create the service tables if they do not exist yet.
pub async fn migrate(pool: &PgPool) -> StoreResult<()> {
    for statement in [CREATE_RATES, CREATE_CONVERSIONS, CREATE_CONVERSIONS_DATE_INDEX] {
        sqlx::query(statement).execute(pool).await?;
    }
    info!("Database schema is up to date");
    Ok(())
}

#[derive(Debug, FromRow)]
struct RateRow {
    currency_code: String,
    currency_desc: String,
    rate: Decimal,
    as_of: DateTime<Utc>,
}

impl TryFrom<RateRow> for CanonicalRate {
    type Error = StoreError;

    fn try_from(row: RateRow) -> StoreResult<Self> {
        let code = parse_code(&row.currency_code)?;
        Ok(CanonicalRate::new(code, row.currency_desc, row.rate, row.as_of))
    }
}

#[derive(Debug, FromRow)]
struct ConversionRow {
    id: i64,
    from_currency_code: String,
    from_currency_desc: String,
    to_currency_code: String,
    to_currency_desc: String,
    original_amount: Decimal,
    converted_amount: Decimal,
    conversion_date: DateTime<Utc>,
}

impl TryFrom<ConversionRow> for ConversionRecord {
    type Error = StoreError;

    fn try_from(row: ConversionRow) -> StoreResult<Self> {
        Ok(ConversionRecord {
            id: row.id,
            from_currency_code: parse_code(&row.from_currency_code)?,
            from_currency_desc: row.from_currency_desc,
            to_currency_code: parse_code(&row.to_currency_code)?,
            to_currency_desc: row.to_currency_desc,
            original_amount: row.original_amount,
            converted_amount: row.converted_amount,
            conversion_date: row.conversion_date,
        })
    }
}

fn parse_code(raw: &str) -> StoreResult<CurrencyCode> {
    CurrencyCode::parse(raw.trim()).map_err(|e| StoreError::InvalidRow(e.to_string()))
}

/// Rate store over the `currency_rates` table.
#[derive(Clone)]
pub struct PgRateStore {
    pool: PgPool,
}

impl PgRateStore {
    /// Create a store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RateStore for PgRateStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn load_all(&self) -> StoreResult<Vec<CanonicalRate>> {
        let rows: Vec<RateRow> = sqlx::query_as(
            "SELECT currency_code, currency_desc, rate, as_of FROM currency_rates ORDER BY currency_code",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CanonicalRate::try_from).collect()
    }

    async fn snapshot(&self) -> StoreResult<Arc<RateTable>> {
        Ok(Arc::new(self.load_all().await?.into_iter().collect()))
    }

    async fn upsert(&self, rate: CanonicalRate) -> StoreResult<()> {
        sqlx::query(UPSERT_RATE)
            .bind(rate.code.as_str())
            .bind(&rate.description)
            .bind(rate.rate)
            .bind(rate.as_of)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Upserts every rate in one transaction. Codes absent from `rates`
    /// keep their previous row.
    #[instrument(skip(self, rates), fields(rates = rates.len()))]
    async fn replace_all(&self, rates: Vec<CanonicalRate>) -> StoreResult<usize> {
        let mut tx = self.pool.begin().await?;

        for rate in &rates {
            sqlx::query(UPSERT_RATE)
                .bind(rate.code.as_str())
                .bind(&rate.description)
                .bind(rate.rate)
                .bind(rate.as_of)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        debug!(rates = rates.len(), "Upserted rate batch");
        Ok(rates.len())
    }
}

/// Conversion history over the `currency_conversions` table.
#[derive(Clone)]
pub struct PgConversionHistory {
    pool: PgPool,
}

impl PgConversionHistory {
    /// Create a history store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConversionHistoryStore for PgConversionHistory {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn append(&self, record: NewConversionRecord) -> StoreResult<ConversionRecord> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO currency_conversions (
                from_currency_code, from_currency_desc, to_currency_code, to_currency_desc,
                original_amount, converted_amount, conversion_date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(record.from_code.as_str())
        .bind(&record.from_desc)
        .bind(record.to_code.as_str())
        .bind(&record.to_desc)
        .bind(record.original_amount)
        .bind(record.converted_amount)
        .bind(record.converted_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(record.with_id(id))
    }

    async fn query(&self, filter: &ConversionFilter) -> StoreResult<Vec<ConversionRecord>> {
        let rows: Vec<ConversionRow> = sqlx::query_as(
            r#"
            SELECT id, from_currency_code, from_currency_desc, to_currency_code, to_currency_desc,
                   original_amount, converted_amount, conversion_date
            FROM currency_conversions
            WHERE ($1::TEXT IS NULL OR from_currency_code = $1)
              AND ($2::TIMESTAMPTZ IS NULL OR conversion_date >= $2)
              AND ($3::TIMESTAMPTZ IS NULL OR conversion_date <= $3)
            ORDER BY conversion_date, id
            "#,
        )
        .bind(filter.from_currency.as_ref().map(|c| c.as_str().to_string()))
        .bind(filter.start)
        .bind(filter.end)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ConversionRecord::try_from).collect()
    }
}
