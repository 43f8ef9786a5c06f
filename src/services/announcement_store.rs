use async_trait::async_trait;
use chrono::Utc;
use futures_util::StreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, Document},
    options::FindOptions,
    Collection, Database,
};
use serde::de::DeserializeOwned;

use crate::{
    error::EngineError,
    models::{DividendAnnouncement, DividendStatus, IpoAnnouncement, IpoStatus},
};

/// Dividend and IPO announcement records.
///
/// "Upcoming" means still in the `announced` state, whatever the date:
/// the sweeps need exactly the records whose date has already passed.
#[async_trait]
pub trait AnnouncementStore: Send + Sync {
    async fn create_dividend(&self, dividend: &DividendAnnouncement) -> Result<(), EngineError>;
    async fn list_upcoming_dividends(&self) -> Result<Vec<DividendAnnouncement>, EngineError>;
    async fn update_dividend_status(
        &self,
        id: ObjectId,
        status: DividendStatus,
    ) -> Result<(), EngineError>;

    async fn create_ipo(&self, ipo: &IpoAnnouncement) -> Result<(), EngineError>;
    async fn list_upcoming_ipos(&self) -> Result<Vec<IpoAnnouncement>, EngineError>;
    async fn update_ipo_status(&self, id: ObjectId, status: IpoStatus) -> Result<(), EngineError>;
}

#[derive(Clone)]
pub struct MongoAnnouncementStore {
    dividends: Collection<DividendAnnouncement>,
    ipos: Collection<IpoAnnouncement>,
}

impl MongoAnnouncementStore {
    pub fn new(db: &Database) -> Self {
        Self {
            dividends: db.collection::<DividendAnnouncement>("dividends"),
            ipos: db.collection::<IpoAnnouncement>("ipos"),
        }
    }
}

async fn list_announced<T>(col: &Collection<T>, date_field: &str) -> Result<Vec<T>, EngineError>
where
    T: DeserializeOwned + Unpin + Send + Sync,
{
    let mut sort = Document::new();
    sort.insert(date_field, 1);
    let find_opts = FindOptions::builder().sort(sort).build();
    let mut cursor = col.find(doc! { "status": "announced" }, find_opts).await?;

    let mut items = Vec::new();
    while let Some(res) = cursor.next().await {
        items.push(res?);
    }
    Ok(items)
}

#[async_trait]
impl AnnouncementStore for MongoAnnouncementStore {
    async fn create_dividend(&self, dividend: &DividendAnnouncement) -> Result<(), EngineError> {
        self.dividends.insert_one(dividend, None).await?;
        Ok(())
    }

    async fn list_upcoming_dividends(&self) -> Result<Vec<DividendAnnouncement>, EngineError> {
        list_announced(&self.dividends, "payment_date").await
    }

    async fn update_dividend_status(
        &self,
        id: ObjectId,
        status: DividendStatus,
    ) -> Result<(), EngineError> {
        let status = mongodb::bson::to_bson(&status)
            .map_err(|e| EngineError::Store(e.to_string()))?;
        self.dividends
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "status": status, "updated_at": Utc::now().timestamp() } },
                None,
            )
            .await?;
        Ok(())
    }

    async fn create_ipo(&self, ipo: &IpoAnnouncement) -> Result<(), EngineError> {
        self.ipos.insert_one(ipo, None).await?;
        Ok(())
    }

    async fn list_upcoming_ipos(&self) -> Result<Vec<IpoAnnouncement>, EngineError> {
        list_announced(&self.ipos, "listing_date").await
    }

    async fn update_ipo_status(&self, id: ObjectId, status: IpoStatus) -> Result<(), EngineError> {
        let status =
            mongodb::bson::to_bson(&status).map_err(|e| EngineError::Store(e.to_string()))?;
        self.ipos
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "status": status, "updated_at": Utc::now().timestamp() } },
                None,
            )
            .await?;
        Ok(())
    }
}
