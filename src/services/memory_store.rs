//! In-process stores for `STORE_BACKEND=memory` and for tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use tokio::sync::RwLock;

use crate::{
    error::EngineError,
    models::{
        Alert, AlertKind, AlertStatus, DividendAnnouncement, DividendStatus, IpoAnnouncement,
        IpoStatus, User, UserPreferences,
    },
    services::{alert_store::AlertStore, announcement_store::AnnouncementStore, user_store::UserStore},
};

#[derive(Default)]
pub struct MemoryAlertStore {
    alerts: RwLock<HashMap<ObjectId, Alert>>,
}

impl MemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, alert: Alert) {
        self.alerts.write().await.insert(alert.id, alert);
    }

    pub async fn get(&self, id: ObjectId) -> Option<Alert> {
        self.alerts.read().await.get(&id).cloned()
    }

    /// User-driven status change (pause, delete, re-activate).
    pub async fn set_status(&self, id: ObjectId, status: AlertStatus) {
        if let Some(a) = self.alerts.write().await.get_mut(&id) {
            a.status = status;
            a.updated_at = Utc::now().timestamp();
        }
    }

    async fn filtered(&self, keep: impl Fn(&Alert) -> bool) -> Vec<Alert> {
        let mut items: Vec<Alert> = self
            .alerts
            .read()
            .await
            .values()
            .filter(|a| keep(*a))
            .cloned()
            .collect();
        items.sort_by_key(|a| a.created_at);
        items
    }
}

#[async_trait]
impl AlertStore for MemoryAlertStore {
    async fn list_active(&self) -> Result<Vec<Alert>, EngineError> {
        Ok(self.filtered(|a| a.status == AlertStatus::Active).await)
    }

    async fn list_active_by_kind(&self, kind: AlertKind) -> Result<Vec<Alert>, EngineError> {
        Ok(self
            .filtered(|a| a.status == AlertStatus::Active && a.kind == kind)
            .await)
    }

    async fn list_notifiable_by_kind(&self, kind: AlertKind) -> Result<Vec<Alert>, EngineError> {
        Ok(self
            .filtered(|a| {
                a.kind == kind
                    && matches!(a.status, AlertStatus::Active | AlertStatus::Triggered)
            })
            .await)
    }

    async fn update_tracked_fields(&self, alert: &Alert) -> Result<(), EngineError> {
        let mut alerts = self.alerts.write().await;
        let stored = alerts
            .get_mut(&alert.id)
            .ok_or_else(|| EngineError::NotFound(format!("alert {}", alert.id)))?;

        stored.apply_tracked(alert.tracked());
        stored.updated_at = Utc::now().timestamp();
        Ok(())
    }

    async fn mark_triggered(&self, id: ObjectId) -> Result<bool, EngineError> {
        let mut alerts = self.alerts.write().await;
        match alerts.get_mut(&id) {
            Some(a) if a.status == AlertStatus::Active => {
                let now = Utc::now().timestamp();
                a.status = AlertStatus::Triggered;
                a.triggered_at = Some(now);
                a.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<ObjectId, User>>,
    prefs: RwLock<HashMap<ObjectId, UserPreferences>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_user(&self, user: User) {
        self.users.write().await.insert(user.id, user);
    }

    pub async fn set_preferences(&self, prefs: UserPreferences) {
        self.prefs.write().await.insert(prefs.user_id, prefs);
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn get_user(&self, id: ObjectId) -> Result<User, EngineError> {
        self.users
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("user {id}")))
    }

    async fn get_preferences(
        &self,
        user_id: ObjectId,
    ) -> Result<Option<UserPreferences>, EngineError> {
        Ok(self.prefs.read().await.get(&user_id).cloned())
    }
}

#[derive(Default)]
pub struct MemoryAnnouncementStore {
    dividends: RwLock<HashMap<ObjectId, DividendAnnouncement>>,
    ipos: RwLock<HashMap<ObjectId, IpoAnnouncement>>,
}

impl MemoryAnnouncementStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn dividend(&self, id: ObjectId) -> Option<DividendAnnouncement> {
        self.dividends.read().await.get(&id).cloned()
    }

    pub async fn ipo(&self, id: ObjectId) -> Option<IpoAnnouncement> {
        self.ipos.read().await.get(&id).cloned()
    }
}

#[async_trait]
impl AnnouncementStore for MemoryAnnouncementStore {
    async fn create_dividend(&self, dividend: &DividendAnnouncement) -> Result<(), EngineError> {
        self.dividends
            .write()
            .await
            .insert(dividend.id, dividend.clone());
        Ok(())
    }

    async fn list_upcoming_dividends(&self) -> Result<Vec<DividendAnnouncement>, EngineError> {
        let mut items: Vec<DividendAnnouncement> = self
            .dividends
            .read()
            .await
            .values()
            .filter(|d| d.status == DividendStatus::Announced)
            .cloned()
            .collect();
        items.sort_by_key(|d| d.payment_date);
        Ok(items)
    }

    async fn update_dividend_status(
        &self,
        id: ObjectId,
        status: DividendStatus,
    ) -> Result<(), EngineError> {
        let mut dividends = self.dividends.write().await;
        let d = dividends
            .get_mut(&id)
            .ok_or_else(|| EngineError::NotFound(format!("dividend {id}")))?;
        d.status = status;
        d.updated_at = Utc::now().timestamp();
        Ok(())
    }

    async fn create_ipo(&self, ipo: &IpoAnnouncement) -> Result<(), EngineError> {
        self.ipos.write().await.insert(ipo.id, ipo.clone());
        Ok(())
    }

    async fn list_upcoming_ipos(&self) -> Result<Vec<IpoAnnouncement>, EngineError> {
        let mut items: Vec<IpoAnnouncement> = self
            .ipos
            .read()
            .await
            .values()
            .filter(|i| i.status == IpoStatus::Announced)
            .cloned()
            .collect();
        items.sort_by_key(|i| i.listing_date);
        Ok(items)
    }

    async fn update_ipo_status(&self, id: ObjectId, status: IpoStatus) -> Result<(), EngineError> {
        let mut ipos = self.ipos.write().await;
        let ipo = ipos
            .get_mut(&id)
            .ok_or_else(|| EngineError::NotFound(format!("ipo {id}")))?;
        ipo.status = status;
        ipo.updated_at = Utc::now().timestamp();
        Ok(())
    }
}
