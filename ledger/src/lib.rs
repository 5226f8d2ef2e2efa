//! FxLedger Storage
//!
//! Persistence for the current canonical rate snapshot and the append-only
//! conversion log. Callers depend on the [`RateStore`] and
//! [`ConversionHistoryStore`] traits; the backends are interchangeable.

pub mod error;
pub mod file;
pub mod history;
pub mod postgres;
pub mod rate_store;

pub use error::{StoreError, StoreResult};
pub use file::JsonFileRateStore;
pub use history::{ConversionHistoryStore, MemoryConversionHistory};
pub use postgres::{PgConversionHistory, PgRateStore};
pub use rate_store::{MemoryRateStore, RateStore};
