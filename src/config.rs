use std::{env, str::FromStr, time::Duration};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Mongo,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationSink {
    Outbox,
    Log,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub mongodb_uri: String,
    pub mongodb_db: String,
    pub store_backend: StoreBackend,

    // upstream market data
    pub gse_base_url: String,
    pub proxy_url: String,
    pub dividend_yields_url: String,
    pub http_timeout: Duration,
    pub http_pool_max_idle_per_host: usize,

    // cache
    pub cache_enabled: bool,
    pub stock_cache_ttl: Duration,
    pub fallback_cache_ttl: Duration,
    pub warmup_symbols: Vec<String>,

    // monitor cadences
    pub price_check_interval: Duration,
    pub yield_check_interval: Duration,
    pub dividend_sweep_interval: Duration,
    pub ipo_sweep_interval: Duration,
    pub max_concurrent_evaluations: usize,

    pub notify_timeout: Duration,
    pub notification_sink: NotificationSink,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mongodb_uri: "mongodb://localhost:27017".to_string(),
            mongodb_db: "shares_alert".to_string(),
            store_backend: StoreBackend::Mongo,
            gse_base_url: "https://dev.kwayisi.org/apis/gse".to_string(),
            proxy_url: "https://api.allorigins.win/raw?url=".to_string(),
            dividend_yields_url: "https://gse-dividends.onrender.com/stocks".to_string(),
            http_timeout: Duration::from_secs(10),
            http_pool_max_idle_per_host: 10,
            cache_enabled: true,
            stock_cache_ttl: Duration::from_secs(5 * 60),
            fallback_cache_ttl: Duration::from_secs(60),
            warmup_symbols: ["MTN", "ACCESS", "GCB", "TOTAL", "GOIL"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            price_check_interval: Duration::from_secs(30),
            yield_check_interval: Duration::from_secs(60 * 60),
            dividend_sweep_interval: Duration::from_secs(6 * 60 * 60),
            ipo_sweep_interval: Duration::from_secs(60 * 60),
            max_concurrent_evaluations: 8,
            notify_timeout: Duration::from_secs(10),
            notification_sink: NotificationSink::Outbox,
        }
    }
}

pub fn load() -> Settings {
    // Loads .env if present (no crash if missing)
    dotenvy::dotenv().ok();

    let d = Settings::default();

    let store_backend = match env::var("STORE_BACKEND").ok().as_deref() {
        Some("memory") => StoreBackend::Memory,
        _ => StoreBackend::Mongo,
    };

    let notification_sink = match env::var("NOTIFICATION_SINK").ok().as_deref() {
        Some("log") => NotificationSink::Log,
        _ => NotificationSink::Outbox,
    };

    let warmup_symbols = env::var("WARMUP_SYMBOLS")
        .map(|raw| parse_symbol_list(&raw))
        .unwrap_or(d.warmup_symbols);

    Settings {
        mongodb_uri: env_or("MONGODB_URI", d.mongodb_uri),
        mongodb_db: env_or("MONGODB_DB", d.mongodb_db),
        store_backend,
        gse_base_url: env_or("GSE_BASE_URL", d.gse_base_url),
        proxy_url: env_or("PROXY_URL", d.proxy_url),
        dividend_yields_url: env_or("DIVIDEND_YIELDS_URL", d.dividend_yields_url),
        http_timeout: secs_or("HTTP_TIMEOUT_SECS", d.http_timeout),
        http_pool_max_idle_per_host: parsed_or(
            "HTTP_POOL_MAX_IDLE_PER_HOST",
            d.http_pool_max_idle_per_host,
        ),
        cache_enabled: parsed_or("CACHE_ENABLED", d.cache_enabled),
        stock_cache_ttl: secs_or("STOCK_CACHE_TTL_SECS", d.stock_cache_ttl),
        fallback_cache_ttl: secs_or("FALLBACK_CACHE_TTL_SECS", d.fallback_cache_ttl),
        warmup_symbols,
        price_check_interval: interval_or("PRICE_CHECK_INTERVAL_SECS", d.price_check_interval),
        yield_check_interval: interval_or("YIELD_CHECK_INTERVAL_SECS", d.yield_check_interval),
        dividend_sweep_interval: interval_or("DIVIDEND_SWEEP_INTERVAL_SECS", d.dividend_sweep_interval),
        ipo_sweep_interval: interval_or("IPO_SWEEP_INTERVAL_SECS", d.ipo_sweep_interval),
        max_concurrent_evaluations: parsed_or(
            "MAX_CONCURRENT_EVALUATIONS",
            d.max_concurrent_evaluations,
        )
        .max(1),
        notify_timeout: secs_or("NOTIFY_TIMEOUT_SECS", d.notify_timeout),
        notification_sink,
    }
}

fn env_or(key: &str, default: String) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(default)
}

fn parsed_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => match raw.trim().parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(key, value = %raw, "unparseable setting, using default");
                default
            }
        },
        _ => default,
    }
}

fn secs_or(key: &str, default: Duration) -> Duration {
    Duration::from_secs(parsed_or(key, default.as_secs()))
}

// a zero period would stop that monitor for good
fn interval_or(key: &str, default: Duration) -> Duration {
    positive_or(key, secs_or(key, default), default)
}

fn positive_or(key: &str, value: Duration, default: Duration) -> Duration {
    if value.is_zero() {
        tracing::warn!(key, "interval must be positive, using default");
        default
    } else {
        value
    }
}

fn parse_symbol_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}
