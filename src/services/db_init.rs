use std::time::Duration;

use mongodb::{bson::doc, options::IndexOptions, Database, IndexModel};

use crate::error::EngineError;

pub async fn ensure_indexes(db: &Database) -> Result<(), EngineError> {
    // alerts: monitor scans by (status, alert_type)
    {
        let col = db.collection::<mongodb::bson::Document>("alerts");
        let model = IndexModel::builder()
            .keys(doc! { "status": 1, "alert_type": 1 })
            .build();

        col.create_index(model, None).await?;
    }

    // dividends / ipos: sweeps read announced records by date
    {
        let col = db.collection::<mongodb::bson::Document>("dividends");
        let model = IndexModel::builder()
            .keys(doc! { "status": 1, "payment_date": 1 })
            .build();

        col.create_index(model, None).await?;
    }

    {
        let col = db.collection::<mongodb::bson::Document>("ipos");
        let model = IndexModel::builder()
            .keys(doc! { "status": 1, "listing_date": 1 })
            .build();

        col.create_index(model, None).await?;
    }

    // user_preferences: one record per user
    {
        let col = db.collection::<mongodb::bson::Document>("user_preferences");
        let model = IndexModel::builder()
            .keys(doc! { "user_id": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        col.create_index(model, None).await?;
    }

    // market_cache: let the server drop expired entries
    {
        let col = db.collection::<mongodb::bson::Document>("market_cache");
        let model = IndexModel::builder()
            .keys(doc! { "expires_at": 1 })
            .options(
                IndexOptions::builder()
                    .expire_after(Duration::from_secs(0))
                    .build(),
            )
            .build();

        let _ = col.create_index(model, None).await;
    }

    Ok(())
}
