use mongodb::bson::DateTime as BsonDateTime;
use serde::{Deserialize, Serialize};

/// Dedup record: one row per (user, content hash). Inserted when a question
/// is served, never updated, membership tests only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeenQuestion {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub content_hash: String,
    pub first_seen_at: BsonDateTime,
}

impl SeenQuestion {
    pub fn record_id(user_id: &str, content_hash: &str) -> String {
        format!("{}:{}", user_id, content_hash)
    }
}
