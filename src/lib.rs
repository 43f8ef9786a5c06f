//! Library entrypoint for SharesAlert.
//!
//! The binary wires Mongo-backed stores into [`AppState`]; tests under
//! `tests/` build the same state from the in-memory stores and fakes.

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod models;
pub mod services;

use services::{
    alert_store::AlertStore, announcement_store::AnnouncementStore,
    dividend_yields::YieldFetcher, notifier::Notifier, quote_fetcher::QuoteFetcher,
    user_store::UserStore,
};

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<config::Settings>,
    pub alerts: Arc<dyn AlertStore>,
    pub users: Arc<dyn UserStore>,
    pub announcements: Arc<dyn AnnouncementStore>,
    pub quotes: QuoteFetcher,
    pub yields: YieldFetcher,
    pub notifier: Notifier,
}
