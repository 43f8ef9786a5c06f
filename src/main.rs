use std::sync::Arc;

use mongodb::Client;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use sharesalert::{
    config::{self, NotificationSink, StoreBackend},
    services::{
        alert_monitor,
        alert_store::{AlertStore, MongoAlertStore},
        announcement_store::{AnnouncementStore, MongoAnnouncementStore},
        db_init,
        dividend_yields::{DividendYieldClient, YieldFetcher},
        gse::{self, GseClient},
        market_cache::{MarketCache, MongoCacheStore},
        memory_store::{MemoryAlertStore, MemoryAnnouncementStore, MemoryUserStore},
        notifier::{LogSender, NotificationSender, Notifier, OutboxSender},
        quote_fetcher::QuoteFetcher,
        user_store::{MongoUserStore, UserStore},
    },
    AppState,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = config::load();

    let http = gse::build_http_client(&settings).expect("Failed to build HTTP client");

    let alerts: Arc<dyn AlertStore>;
    let users: Arc<dyn UserStore>;
    let announcements: Arc<dyn AnnouncementStore>;
    let mut sender: Arc<dyn NotificationSender> = Arc::new(LogSender);
    let mut cache = MarketCache::in_memory();

    match settings.store_backend {
        StoreBackend::Mongo => {
            let client = Client::with_uri_str(&settings.mongodb_uri)
                .await
                .expect("Failed to connect to MongoDB");
            let db = client.database(&settings.mongodb_db);

            if let Err(e) = db_init::ensure_indexes(&db).await {
                tracing::warn!(error = %e, "failed to ensure indexes");
            }

            alerts = Arc::new(MongoAlertStore::new(&db));
            users = Arc::new(MongoUserStore::new(&db));
            announcements = Arc::new(MongoAnnouncementStore::new(&db));
            cache = MarketCache::new(Arc::new(MongoCacheStore::new(&db)));
            if settings.notification_sink == NotificationSink::Outbox {
                sender = Arc::new(OutboxSender::new(&db));
            }
        }
        StoreBackend::Memory => {
            tracing::warn!("using in-memory stores, nothing will be persisted");
            alerts = Arc::new(MemoryAlertStore::new());
            users = Arc::new(MemoryUserStore::new());
            announcements = Arc::new(MemoryAnnouncementStore::new());
        }
    }

    if !settings.cache_enabled {
        tracing::info!("market data cache is disabled");
        cache = MarketCache::disabled();
    }

    let quotes = QuoteFetcher::new(
        Arc::new(GseClient::direct(http.clone(), &settings.gse_base_url)),
        Arc::new(GseClient::mirrored(
            http.clone(),
            &settings.proxy_url,
            &settings.gse_base_url,
        )),
        cache.clone(),
        &settings,
    );
    let yields = YieldFetcher::new(
        Arc::new(DividendYieldClient::new(http, &settings.dividend_yields_url)),
        cache,
        &settings,
    );
    let notifier = Notifier::new(users.clone(), sender, settings.notify_timeout);

    let state = AppState {
        settings: Arc::new(settings),
        alerts,
        users,
        announcements,
        quotes,
        yields,
        notifier,
    };

    {
        let quotes = state.quotes.clone();
        let symbols = state.settings.warmup_symbols.clone();
        tokio::spawn(async move { quotes.warmup(&symbols).await });
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let monitors = alert_monitor::spawn_monitors(state, shutdown_rx);
    tracing::info!(monitors = monitors.len(), "alert engine running");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }

    tracing::info!("shutting down, waiting for in-flight ticks");
    let _ = shutdown_tx.send(true);
    for handle in monitors {
        let _ = handle.await;
    }
}
