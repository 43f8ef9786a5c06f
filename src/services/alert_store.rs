use async_trait::async_trait;
use chrono::Utc;
use futures_util::StreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, Document},
    Collection, Database,
};

use crate::{
    error::EngineError,
    models::{Alert, AlertKind, AlertStatus},
};

/// What the engine needs from alert persistence.
#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn list_active(&self) -> Result<Vec<Alert>, EngineError>;

    async fn list_active_by_kind(&self, kind: AlertKind) -> Result<Vec<Alert>, EngineError>;

    /// Active or already triggered, i.e. not paused or deleted by the user.
    async fn list_notifiable_by_kind(&self, kind: AlertKind) -> Result<Vec<Alert>, EngineError>;

    /// Writes `current_price`, `current_yield` and `last_yield`.
    async fn update_tracked_fields(&self, alert: &Alert) -> Result<(), EngineError>;

    /// Returns true if the alert was newly triggered, false if it was no
    /// longer active.
    async fn mark_triggered(&self, id: ObjectId) -> Result<bool, EngineError>;
}

#[derive(Clone)]
pub struct MongoAlertStore {
    col: Collection<Alert>,
}

impl MongoAlertStore {
    pub fn new(db: &Database) -> Self {
        Self {
            col: db.collection::<Alert>("alerts"),
        }
    }

    async fn find_all(&self, filter: Document) -> Result<Vec<Alert>, EngineError> {
        let mut cursor = self.col.find(filter, None).await?;

        let mut items: Vec<Alert> = Vec::new();
        while let Some(res) = cursor.next().await {
            items.push(res?);
        }

        Ok(items)
    }
}

#[async_trait]
impl AlertStore for MongoAlertStore {
    async fn list_active(&self) -> Result<Vec<Alert>, EngineError> {
        self.find_all(doc! { "status": AlertStatus::Active.as_str() })
            .await
    }

    async fn list_active_by_kind(&self, kind: AlertKind) -> Result<Vec<Alert>, EngineError> {
        self.find_all(doc! {
            "status": AlertStatus::Active.as_str(),
            "alert_type": kind.as_str(),
        })
        .await
    }

    async fn list_notifiable_by_kind(&self, kind: AlertKind) -> Result<Vec<Alert>, EngineError> {
        self.find_all(doc! {
            "status": { "$in": [AlertStatus::Active.as_str(), AlertStatus::Triggered.as_str()] },
            "alert_type": kind.as_str(),
        })
        .await
    }

    async fn update_tracked_fields(&self, alert: &Alert) -> Result<(), EngineError> {
        let now = Utc::now().timestamp();

        self.col
            .update_one(
                doc! { "_id": alert.id },
                doc! { "$set": {
                    "current_price": alert.current_price,
                    "current_yield": alert.current_yield,
                    "last_yield": alert.last_yield,
                    "updated_at": now,
                } },
                None,
            )
            .await?;

        Ok(())
    }

    async fn mark_triggered(&self, id: ObjectId) -> Result<bool, EngineError> {
        let now = Utc::now().timestamp();

        let res = self
            .col
            .update_one(
                doc! { "_id": id, "status": AlertStatus::Active.as_str() },
                doc! { "$set": {
                    "status": AlertStatus::Triggered.as_str(),
                    "triggered_at": now,
                    "updated_at": now,
                } },
                None,
            )
            .await?;

        Ok(res.matched_count > 0)
    }
}
