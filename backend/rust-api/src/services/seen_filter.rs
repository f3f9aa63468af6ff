use chrono::Utc;
use mongodb::bson::doc;
use mongodb::{Collection, Database};

use crate::error::ApiError;
use crate::metrics::QUESTIONS_PROVISIONED_TOTAL;
use crate::models::{Difficulty, Question, SeenQuestion};
use crate::services::question_provider::QuestionProvider;
use crate::utils::mongo::is_duplicate_key;
use crate::utils::time::chrono_to_bson;

/// Generation attempts before giving up on novelty and serving a repeat.
pub const MAX_PROVISION_ATTEMPTS: usize = 10;

/// Per-user dedup over previously served question content.
pub struct SeenFilter {
    mongo: Database,
}

impl SeenFilter {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    fn collection(&self) -> Collection<SeenQuestion> {
        self.mongo.collection("seen_questions")
    }

    pub async fn has_seen(&self, user_id: &str, content_hash: &str) -> Result<bool, ApiError> {
        let found = self
            .collection()
            .find_one(doc! { "_id": SeenQuestion::record_id(user_id, content_hash) })
            .await?;
        Ok(found.is_some())
    }

    /// Idempotent insert: a duplicate (user, hash) pair is a silent no-op.
    pub async fn mark_seen(&self, user_id: &str, content_hash: &str) -> Result<(), ApiError> {
        let record = SeenQuestion {
            id: SeenQuestion::record_id(user_id, content_hash),
            user_id: user_id.to_string(),
            content_hash: content_hash.to_string(),
            first_seen_at: chrono_to_bson(Utc::now()),
        };
        match self.collection().insert_one(&record).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Generate until a question the user has not seen comes back, marking it
    /// seen before returning. After `MAX_PROVISION_ATTEMPTS` the last
    /// candidate is served anyway: a repeat beats an unanswerable request.
    pub async fn provision_unseen(
        &self,
        provider: &dyn QuestionProvider,
        user_id: &str,
        topic: &str,
        band: Difficulty,
    ) -> Result<Question, ApiError> {
        let mut last_candidate: Option<Question> = None;

        for attempt in 1..=MAX_PROVISION_ATTEMPTS {
            let candidate = provider.generate(topic, band).await?;
            let hash = candidate.content_hash();

            if !self.has_seen(user_id, &hash).await? {
                self.mark_seen(user_id, &hash).await?;
                QUESTIONS_PROVISIONED_TOTAL
                    .with_label_values(&["unseen"])
                    .inc();
                return Ok(candidate);
            }

            tracing::debug!(
                "Seen-question hit for user {} on attempt {}/{}",
                user_id,
                attempt,
                MAX_PROVISION_ATTEMPTS
            );
            last_candidate = Some(candidate);
        }

        QUESTIONS_PROVISIONED_TOTAL
            .with_label_values(&["repeat"])
            .inc();
        tracing::warn!(
            "Exhausted {} generation attempts for user {} topic {}; serving a repeat",
            MAX_PROVISION_ATTEMPTS,
            user_id,
            topic
        );
        // The loop always ran at least once, so a candidate exists.
        last_candidate.ok_or_else(|| ApiError::conflict("question generator produced no candidate"))
    }
}
