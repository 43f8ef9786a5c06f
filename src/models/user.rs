use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub email: String,

    #[serde(default)]
    pub name: Option<String>,
}

impl User {
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(n) if !n.trim().is_empty() => n,
            _ => &self.email,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPreferences {
    pub user_id: ObjectId,

    #[serde(default = "default_true")]
    pub email_notifications: bool,
    #[serde(default)]
    pub push_notifications: bool,
    // "immediate" | "daily" | "weekly"
    #[serde(default)]
    pub notification_frequency: Option<String>,
}

fn default_true() -> bool {
    true
}
