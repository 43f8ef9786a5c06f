use async_trait::async_trait;
use mongodb::{
    bson::{doc, oid::ObjectId},
    Collection, Database,
};

use crate::{
    error::EngineError,
    models::{User, UserPreferences},
};

#[async_trait]
pub trait UserStore: Send + Sync {
    /// `NotFound` when the user no longer exists.
    async fn get_user(&self, id: ObjectId) -> Result<User, EngineError>;

    /// `None` when the user never saved preferences.
    async fn get_preferences(&self, user_id: ObjectId)
        -> Result<Option<UserPreferences>, EngineError>;
}

#[derive(Clone)]
pub struct MongoUserStore {
    users: Collection<User>,
    prefs: Collection<UserPreferences>,
}

impl MongoUserStore {
    pub fn new(db: &Database) -> Self {
        Self {
            users: db.collection::<User>("users"),
            prefs: db.collection::<UserPreferences>("user_preferences"),
        }
    }
}

#[async_trait]
impl UserStore for MongoUserStore {
    async fn get_user(&self, id: ObjectId) -> Result<User, EngineError> {
        self.users
            .find_one(doc! { "_id": id }, None)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("user {id}")))
    }

    async fn get_preferences(
        &self,
        user_id: ObjectId,
    ) -> Result<Option<UserPreferences>, EngineError> {
        Ok(self
            .prefs
            .find_one(doc! { "user_id": user_id }, None)
            .await?)
    }
}
