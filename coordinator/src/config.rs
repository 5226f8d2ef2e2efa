//! Service configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use fxledger_common::{CurrencyCode, ServiceError, ServiceMode};

/// Where rates and conversion history are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// In-process only; lost on restart.
    Memory,
    /// Rates in a JSON file. Snapshot mode only.
    File,
    /// Rates and history in PostgreSQL.
    Postgres,
}

impl FromStr for StorageBackend {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "file" | "json" => Ok(StorageBackend::File),
            "postgres" | "postgresql" | "pg" => Ok(StorageBackend::Postgres),
            other => Err(ServiceError::Configuration(format!(
                "unknown storage backend '{other}'"
            ))),
        }
    }
}

/// Rate feed configuration.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Feed URL.
    pub url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Currency every canonical rate is expressed in.
    pub reference_currency: CurrencyCode,
    /// Base currency assumed when the feed does not declare one.
    pub base_currency: CurrencyCode,
    /// Description given to the synthesized base-currency entry.
    pub base_description: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: "https://www.nationalbanken.dk/api/currencyratesxml?lang=en".to_string(),
            timeout: Duration::from_secs(30),
            reference_currency: CurrencyCode::inr(),
            base_currency: CurrencyCode::dkk(),
            base_description: "Danish Krone".to_string(),
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Selected backend.
    pub backend: StorageBackend,
    /// Snapshot file for the file backend.
    pub rates_file: PathBuf,
    /// Database URL for the postgres backend.
    pub database_url: String,
    /// Pool size for the postgres backend.
    pub max_connections: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            rates_file: PathBuf::from("shared/currency_rates.json"),
            database_url: "postgres://localhost/fxledger".to_string(),
            max_connections: 5,
        }
    }
}

/// Main service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Listen address.
    pub listen_addr: String,
    /// Listen port.
    pub listen_port: u16,
    /// Deployment mode; fixes the conversion policy.
    pub mode: ServiceMode,
    /// Period between scheduled refresh cycles.
    pub refresh_interval: Duration,
    /// Feed configuration.
    pub feed: FeedConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0".to_string(),
            listen_port: 8080,
            mode: ServiceMode::Ledger,
            refresh_interval: Duration::from_secs(3600),
            feed: FeedConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ServiceError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ServiceError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("FXLEDGER_LISTEN_ADDR") {
            config.listen_addr = addr;
        }

        if let Some(port) = lookup("FXLEDGER_LISTEN_PORT") {
            config.listen_port = parse_number("FXLEDGER_LISTEN_PORT", &port)?;
        }

        if let Some(mode) = lookup("FXLEDGER_MODE") {
            config.mode = mode.parse().map_err(|_| {
                ServiceError::Configuration(format!("FXLEDGER_MODE: unknown mode '{mode}'"))
            })?;
        }

        if let Some(secs) = lookup("FXLEDGER_REFRESH_INTERVAL_SECS") {
            config.refresh_interval =
                Duration::from_secs(parse_number("FXLEDGER_REFRESH_INTERVAL_SECS", &secs)?);
        }

        if let Some(backend) = lookup("FXLEDGER_STORAGE") {
            config.storage.backend = backend.parse()?;
        }

        if let Some(path) = lookup("FXLEDGER_RATES_FILE") {
            config.storage.rates_file = PathBuf::from(path);
        }

        if let Some(url) = lookup("DATABASE_URL") {
            config.storage.database_url = url;
        }

        if let Some(max) = lookup("FXLEDGER_DB_MAX_CONNECTIONS") {
            config.storage.max_connections = parse_number("FXLEDGER_DB_MAX_CONNECTIONS", &max)?;
        }

        if let Some(url) = lookup("FXLEDGER_FEED_URL") {
            config.feed.url = url;
        }

        if let Some(secs) = lookup("FXLEDGER_FEED_TIMEOUT_SECS") {
            config.feed.timeout =
                Duration::from_secs(parse_number("FXLEDGER_FEED_TIMEOUT_SECS", &secs)?);
        }

        if let Some(code) = lookup("FXLEDGER_REFERENCE_CURRENCY") {
            config.feed.reference_currency = parse_code("FXLEDGER_REFERENCE_CURRENCY", &code)?;
        }

        if let Some(code) = lookup("FXLEDGER_FEED_BASE_CURRENCY") {
            config.feed.base_currency = parse_code("FXLEDGER_FEED_BASE_CURRENCY", &code)?;
        }

        if let Some(desc) = lookup("FXLEDGER_FEED_BASE_DESCRIPTION") {
            config.feed.base_description = desc;
        }

        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.listen_port == 0 {
            return Err("Listen port cannot be 0".to_string());
        }

        if self.refresh_interval.is_zero() {
            return Err("Refresh interval cannot be 0".to_string());
        }

        if self.feed.url.is_empty() {
            return Err("Feed URL cannot be empty".to_string());
        }

        if self.feed.timeout.is_zero() {
            return Err("Feed timeout cannot be 0".to_string());
        }

        match self.storage.backend {
            StorageBackend::File => {
                if self.storage.rates_file.as_os_str().is_empty() {
                    return Err("File storage requires a rates file path".to_string());
                }
                if self.mode.records_conversions() {
                    return Err(
                        "Ledger mode records conversions and cannot use file storage".to_string(),
                    );
                }
            }
            StorageBackend::Postgres => {
                if self.storage.database_url.is_empty() {
                    return Err("Database URL cannot be empty".to_string());
                }
                if self.storage.max_connections == 0 {
                    return Err("Database pool needs at least one connection".to_string());
                }
            }
            StorageBackend::Memory => {}
        }

        Ok(())
    }

    /// `addr:port` to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.listen_addr, self.listen_port)
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T, ServiceError> {
    value
        .trim()
        .parse()
        .map_err(|_| ServiceError::Configuration(format!("{key}: '{value}' is not a valid number")))
}

fn parse_code(key: &str, value: &str) -> Result<CurrencyCode, ServiceError> {
    CurrencyCode::parse(value.trim())
        .map_err(|e| ServiceError::Configuration(format!("{key}: {e}")))
}
