//! FxLedger Binary
//!
//! Refreshes exchange rates on a schedule and serves conversions over HTTP.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fxledger_coordinator::{
    api, metrics::Metrics, AppConfig, CurrencyService, RateRefresher, RefreshScheduler,
    StorageBackend,
};
use fxledger_fx::{HttpFeedSource, NationalbankXmlParser, NormalizerConfig, RateNormalizer};
use fxledger_ledger::{
    postgres, ConversionHistoryStore, JsonFileRateStore, MemoryConversionHistory, MemoryRateStore,
    PgConversionHistory, PgRateStore, RateStore,
};

type Stores = (
    Arc<dyn RateStore>,
    Option<Arc<dyn ConversionHistoryStore>>,
);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting FxLedger");

    // Load configuration
    let config = AppConfig::from_env()?;
    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(anyhow::anyhow!("Configuration error: {}", e));
    }

    info!(
        mode = %config.mode,
        storage = ?config.storage.backend,
        reference = %config.feed.reference_currency,
        "Configuration loaded"
    );

    let (store, history) = open_stores(&config).await?;
    let existing = store.load_all().await?.len();
    info!(backend = store.backend(), rates = existing, "Rate store ready");

    let metrics = Arc::new(Metrics::new());

    let source = Arc::new(HttpFeedSource::new(config.feed.url.clone(), config.feed.timeout)?);
    let normalizer = RateNormalizer::new(NormalizerConfig {
        reference: config.feed.reference_currency.clone(),
        feed_base: config.feed.base_currency.clone(),
        feed_base_description: config.feed.base_description.clone(),
        precision: config.mode.policy().precision,
    });
    let refresher = Arc::new(RateRefresher::new(
        source,
        Arc::new(NationalbankXmlParser),
        normalizer,
        store.clone(),
        metrics.clone(),
    ));

    let service = Arc::new(CurrencyService::new(
        config.mode,
        config.feed.reference_currency.clone(),
        refresher.clone(),
        store,
        history,
        metrics,
    )?);

    // Set up graceful shutdown
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = RefreshScheduler::new(refresher, config.refresh_interval).spawn(shutdown_rx);

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    info!(
        listen_addr = %config.listen_addr,
        listen_port = %config.listen_port,
        "FxLedger running"
    );

    axum::serve(listener, api::router(service))
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await?;

    scheduler.await?;

    info!("FxLedger shutdown complete");
    Ok(())
}

async fn open_stores(config: &AppConfig) -> anyhow::Result<Stores> {
    let records = config.mode.records_conversions();

    let stores: Stores = match config.storage.backend {
        StorageBackend::Memory => {
            let history = records.then(|| {
                Arc::new(MemoryConversionHistory::new()) as Arc<dyn ConversionHistoryStore>
            });
            (Arc::new(MemoryRateStore::new()) as Arc<dyn RateStore>, history)
        }
        StorageBackend::File => {
            let store = JsonFileRateStore::open(&config.storage.rates_file).await?;
            (Arc::new(store) as Arc<dyn RateStore>, None)
        }
        StorageBackend::Postgres => {
            let pool =
                postgres::connect(&config.storage.database_url, config.storage.max_connections)
                    .await?;
            postgres::migrate(&pool).await?;

            let history = records.then(|| {
                Arc::new(PgConversionHistory::new(pool.clone())) as Arc<dyn ConversionHistoryStore>
            });
            (Arc::new(PgRateStore::new(pool)) as Arc<dyn RateStore>, history)
        }
    };

    Ok(stores)
}

async fn shutdown_signal(shutdown_tx: watch::Sender<bool>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }

    info!("Shutdown signal received");
    let _ = shutdown_tx.send(true);
}
