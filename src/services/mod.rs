pub mod db_init;
pub mod gse;
pub mod market_cache;
pub mod mock_data;

pub mod alert_store;
pub mod announcement_store;
pub mod memory_store;
pub mod user_store;

pub mod dividend_yields;
pub mod quote_fetcher;

pub mod alert_monitor;
pub mod announcements;
pub mod notifier;
pub mod policies;
