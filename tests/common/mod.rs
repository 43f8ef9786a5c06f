#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use sharesalert::{
    config::Settings,
    error::EngineError,
    models::{
        quote::Company, Alert, AlertKind, DividendStock, Equity, LiveStock, NotificationRequest,
        User, UserPreferences,
    },
    services::{
        alert_store::AlertStore,
        dividend_yields::{YieldFetcher, YieldSource},
        gse::QuoteSource,
        market_cache::MarketCache,
        memory_store::{MemoryAlertStore, MemoryAnnouncementStore, MemoryUserStore},
        notifier::{NotificationSender, Notifier},
        quote_fetcher::QuoteFetcher,
    },
    AppState,
};

// ---------------- upstream fakes ----------------

pub struct FakeSource {
    name: &'static str,
    prices: Mutex<HashMap<String, f64>>,
    failing: AtomicBool,
    delay: Mutex<Option<Duration>>,
    calls: AtomicUsize,
}

impl FakeSource {
    pub fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            prices: Mutex::new(HashMap::new()),
            failing: AtomicBool::new(false),
            delay: Mutex::new(None),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn set_price(&self, symbol: &str, price: f64) {
        self.prices
            .lock()
            .unwrap()
            .insert(symbol.to_uppercase(), price);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn enter(&self) -> Result<(), EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(EngineError::upstream(self.name, "503 Service Unavailable"));
        }
        Ok(())
    }

    fn price_of(&self, symbol: &str) -> Result<f64, EngineError> {
        self.prices
            .lock()
            .unwrap()
            .get(&symbol.to_uppercase())
            .copied()
            .ok_or_else(|| EngineError::upstream(self.name, "404 Not Found"))
    }
}

#[async_trait]
impl QuoteSource for FakeSource {
    fn name(&self) -> &str {
        self.name
    }

    async fn live(&self, symbol: &str) -> Result<LiveStock, EngineError> {
        self.enter().await?;
        let price = self.price_of(symbol)?;
        Ok(LiveStock {
            name: symbol.to_uppercase(),
            price,
            change: 0.10,
            volume: 1_000,
        })
    }

    async fn live_all(&self) -> Result<Vec<LiveStock>, EngineError> {
        self.enter().await?;
        let mut all: Vec<LiveStock> = self
            .prices
            .lock()
            .unwrap()
            .iter()
            .map(|(name, price)| LiveStock {
                name: name.clone(),
                price: *price,
                change: 0.0,
                volume: 0,
            })
            .collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    async fn equity(&self, symbol: &str) -> Result<Equity, EngineError> {
        self.enter().await?;
        let price = self.price_of(symbol)?;
        Ok(Equity {
            capital: 1_000_000.0,
            company: Company {
                name: format!("{} Plc", symbol.to_uppercase()),
                sector: "Banks".to_string(),
                industry: "Banking".to_string(),
                ..Company::default()
            },
            dps: Some(0.2),
            eps: None,
            name: symbol.to_uppercase(),
            price,
            shares: 1_000,
        })
    }
}

pub struct FakeYieldSource {
    yields: Mutex<HashMap<String, f64>>,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl FakeYieldSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            yields: Mutex::new(HashMap::new()),
            failing: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn set_yield(&self, symbol: &str, value: f64) {
        self.yields
            .lock()
            .unwrap()
            .insert(symbol.to_uppercase(), value);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl YieldSource for FakeYieldSource {
    async fn fetch_yields(&self) -> Result<Vec<DividendStock>, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(EngineError::upstream("dividend-yields", "502 Bad Gateway"));
        }
        Ok(self
            .yields
            .lock()
            .unwrap()
            .iter()
            .map(|(symbol, y)| DividendStock {
                symbol: symbol.clone(),
                name: symbol.clone(),
                dividend_yield: *y,
                price: String::new(),
                sector: String::new(),
            })
            .collect())
    }
}

// ---------------- notification fakes ----------------

#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<NotificationRequest>>,
    attempts: AtomicUsize,
    failing: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl RecordingSender {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        let s = Self::default();
        s.failing.store(true, Ordering::SeqCst);
        Arc::new(s)
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<NotificationRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub fn attempts_for(&self, alert_id: ObjectId) -> usize {
        self.sent()
            .iter()
            .filter(|r| r.alert.id == alert_id)
            .count()
    }
}

#[async_trait]
impl NotificationSender for RecordingSender {
    async fn send(&self, request: &NotificationRequest) -> Result<(), EngineError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
        // recorded either way so tests can see what was attempted
        self.sent.lock().unwrap().push(request.clone());
        if self.failing.load(Ordering::SeqCst) {
            return Err(EngineError::Notification("smtp: connection refused".into()));
        }
        Ok(())
    }
}

// ---------------- store fakes ----------------

/// Delegates to a memory store but refuses tracked-value writes.
pub struct ReadOnlyAlertStore {
    pub inner: Arc<MemoryAlertStore>,
}

#[async_trait]
impl AlertStore for ReadOnlyAlertStore {
    async fn list_active(&self) -> Result<Vec<Alert>, EngineError> {
        self.inner.list_active().await
    }

    async fn list_active_by_kind(&self, kind: AlertKind) -> Result<Vec<Alert>, EngineError> {
        self.inner.list_active_by_kind(kind).await
    }

    async fn list_notifiable_by_kind(&self, kind: AlertKind) -> Result<Vec<Alert>, EngineError> {
        self.inner.list_notifiable_by_kind(kind).await
    }

    async fn update_tracked_fields(&self, _alert: &Alert) -> Result<(), EngineError> {
        Err(EngineError::Store("write concern timeout".into()))
    }

    async fn mark_triggered(&self, id: ObjectId) -> Result<bool, EngineError> {
        self.inner.mark_triggered(id).await
    }
}

// ---------------- harness ----------------

pub fn test_settings() -> Settings {
    Settings {
        http_timeout: Duration::from_secs(2),
        notify_timeout: Duration::from_secs(2),
        max_concurrent_evaluations: 4,
        ..Settings::default()
    }
}

pub struct Harness {
    pub state: AppState,
    pub alerts: Arc<MemoryAlertStore>,
    pub users: Arc<MemoryUserStore>,
    pub announcements: Arc<MemoryAnnouncementStore>,
    pub primary: Arc<FakeSource>,
    pub secondary: Arc<FakeSource>,
    pub yields: Arc<FakeYieldSource>,
    pub sender: Arc<RecordingSender>,
    pub user: User,
}

pub struct HarnessBuilder {
    settings: Settings,
    cache: MarketCache,
    sender: Arc<RecordingSender>,
    alert_store: Option<Arc<dyn AlertStore>>,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self {
            settings: test_settings(),
            // ticks must see fresh fakes unless a test opts into caching
            cache: MarketCache::disabled(),
            sender: RecordingSender::new(),
            alert_store: None,
        }
    }

    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn cache(mut self, cache: MarketCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn sender(mut self, sender: Arc<RecordingSender>) -> Self {
        self.sender = sender;
        self
    }

    pub fn alert_store(mut self, store: Arc<dyn AlertStore>) -> Self {
        self.alert_store = Some(store);
        self
    }

    pub async fn build(self) -> Harness {
        let alerts = Arc::new(MemoryAlertStore::new());
        let users = Arc::new(MemoryUserStore::new());
        let announcements = Arc::new(MemoryAnnouncementStore::new());
        let primary = FakeSource::new("primary");
        let secondary = FakeSource::new("mirror");
        let yields = FakeYieldSource::new();

        let user = User {
            id: ObjectId::new(),
            email: "ama@example.com".to_string(),
            name: Some("Ama".to_string()),
        };
        users.insert_user(user.clone()).await;

        let quotes = QuoteFetcher::new(
            primary.clone(),
            secondary.clone(),
            self.cache.clone(),
            &self.settings,
        );
        let yield_fetcher = YieldFetcher::new(yields.clone(), self.cache, &self.settings);
        let notifier = Notifier::new(users.clone(), self.sender.clone(), self.settings.notify_timeout);

        let alert_store: Arc<dyn AlertStore> = match self.alert_store {
            Some(s) => s,
            None => alerts.clone(),
        };

        let state = AppState {
            settings: Arc::new(self.settings),
            alerts: alert_store,
            users: users.clone(),
            announcements: announcements.clone(),
            quotes,
            yields: yield_fetcher,
            notifier,
        };

        Harness {
            state,
            alerts,
            users,
            announcements,
            primary,
            secondary,
            yields,
            sender: self.sender,
            user,
        }
    }
}

impl Harness {
    pub async fn new() -> Self {
        HarnessBuilder::new().build().await
    }

    /// Inserts an alert owned by the harness user.
    pub async fn add_alert(&self, symbol: &str, kind: AlertKind, setup: impl FnOnce(&mut Alert)) -> Alert {
        let mut alert = Alert::new(self.user.id, symbol, kind);
        setup(&mut alert);
        self.alerts.insert(alert.clone()).await;
        alert
    }

    pub async fn disable_notifications(&self) {
        self.users
            .set_preferences(UserPreferences {
                user_id: self.user.id,
                email_notifications: false,
                push_notifications: false,
                notification_frequency: None,
            })
            .await;
    }
}
