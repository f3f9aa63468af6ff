use chrono::Utc;
use mongodb::bson::doc;
use mongodb::{Collection, Database};

use crate::error::ApiError;
use crate::models::{next_score, Difficulty, SkillRecord, SKILL_DEFAULT};
use crate::utils::mongo::is_duplicate_key;
use crate::utils::time::chrono_to_bson;

/// Per (user, topic) adaptive skill score and its update rule.
pub struct SkillService {
    mongo: Database,
}

impl SkillService {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    fn collection(&self) -> Collection<SkillRecord> {
        self.mongo.collection("skill_records")
    }

    /// Bounded score, creating the default record lazily on first access.
    pub async fn get_skill(&self, user_id: &str, topic: &str) -> Result<i32, ApiError> {
        let id = SkillRecord::record_id(user_id, topic);
        if let Some(record) = self.collection().find_one(doc! { "_id": &id }).await? {
            return Ok(record.score);
        }

        let record = SkillRecord::default_for(user_id, topic, Utc::now());
        match self.collection().insert_one(&record).await {
            Ok(_) => {}
            // Lost a creation race: the other writer also wrote the default.
            Err(e) if is_duplicate_key(&e) => {}
            Err(e) => return Err(e.into()),
        }
        Ok(SKILL_DEFAULT)
    }

    /// EWMA update after a scored solo session. A session with zero answers
    /// leaves the score untouched. Duels never call this.
    pub async fn update_skill(
        &self,
        user_id: &str,
        topic: &str,
        correct_count: u32,
        total_count: u32,
    ) -> Result<i32, ApiError> {
        let old_score = self.get_skill(user_id, topic).await?;
        if total_count == 0 {
            return Ok(old_score);
        }

        let new_score = next_score(old_score, correct_count, total_count);
        self.collection()
            .update_one(
                doc! { "_id": SkillRecord::record_id(user_id, topic) },
                doc! { "$set": {
                    "score": new_score,
                    "updated_at": chrono_to_bson(Utc::now()),
                }},
            )
            .await?;

        tracing::info!(
            "Skill updated for {} on {}: {} -> {} ({}/{} correct)",
            user_id,
            topic,
            old_score,
            new_score,
            correct_count,
            total_count
        );
        Ok(new_score)
    }

    /// Shared difficulty band for a duel's question set, drawn once from the
    /// average of both participants' scores.
    pub async fn band_for_pair(
        &self,
        user_a: &str,
        user_b: &str,
        topic: &str,
    ) -> Result<Difficulty, ApiError> {
        let a = self.get_skill(user_a, topic).await?;
        let b = self.get_skill(user_b, topic).await?;
        Ok(Difficulty::band_for((a + b) / 2))
    }
}
