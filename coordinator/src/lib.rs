//! FxLedger Coordinator
//!
//! Runs the rate refresh cycle on a schedule and on demand, and serves rate
//! lookups, conversions and conversion history over HTTP.

pub mod api;
pub mod config;
pub mod metrics;
pub mod refresh;
pub mod scheduler;
pub mod service;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{AppConfig, StorageBackend};
pub use refresh::{RateRefresher, RefreshReport, RefreshStatus};
pub use scheduler::RefreshScheduler;
pub use service::CurrencyService;
