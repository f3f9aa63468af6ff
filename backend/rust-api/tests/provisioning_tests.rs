mod common;

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use uuid::Uuid;

use duelground_api::models::{Difficulty, Question};
use duelground_api::services::question_provider::QuestionProvider;
use duelground_api::services::seen_filter::{SeenFilter, MAX_PROVISION_ATTEMPTS};

/// Generator double that always produces the same question.
struct FixedQuestionProvider {
    stem: String,
    calls: AtomicUsize,
}

impl FixedQuestionProvider {
    fn new(stem: String) -> Self {
        Self {
            stem,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl QuestionProvider for FixedQuestionProvider {
    async fn generate(&self, _topic: &str, _difficulty: Difficulty) -> anyhow::Result<Question> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Question::Single {
            stem: self.stem.clone(),
            options: [
                "41".to_string(),
                "42".to_string(),
                "43".to_string(),
                "44".to_string(),
            ],
            correct_answer: "42".to_string(),
            explanation: "Six sevens are forty-two.".to_string(),
        })
    }
}

async fn test_database() -> mongodb::Database {
    let config = common::test_config();
    let client = mongodb::Client::with_uri_str(&config.mongo_uri)
        .await
        .expect("Failed to connect to test MongoDB");
    client.database(&config.mongo_database)
}

#[tokio::test]
async fn exhausted_generation_degrades_to_a_repeat() {
    let filter = SeenFilter::new(test_database().await);
    let user = format!("repeat-user-{}", Uuid::new_v4());
    let provider = FixedQuestionProvider::new(format!("Only question {}", Uuid::new_v4()));

    let first = filter
        .provision_unseen(&provider, &user, "Algebra Basics", Difficulty::Medium)
        .await
        .unwrap();
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

    // Every further attempt collides with the seen set; after the attempt
    // budget the repeat is served rather than failing the request.
    let second = filter
        .provision_unseen(&provider, &user, "Algebra Basics", Difficulty::Medium)
        .await
        .unwrap();
    assert_eq!(second.content_hash(), first.content_hash());
    assert_eq!(
        provider.calls.load(Ordering::SeqCst),
        1 + MAX_PROVISION_ATTEMPTS
    );
}

#[tokio::test]
async fn repeats_are_scoped_to_the_user() {
    let filter = SeenFilter::new(test_database().await);
    let first_user = format!("user-{}", Uuid::new_v4());
    let second_user = format!("user-{}", Uuid::new_v4());
    let provider = FixedQuestionProvider::new(format!("Shared question {}", Uuid::new_v4()));

    filter
        .provision_unseen(&provider, &first_user, "Algebra Basics", Difficulty::Easy)
        .await
        .unwrap();

    // A different user has not seen it; one generation call suffices.
    filter
        .provision_unseen(&provider, &second_user, "Algebra Basics", Difficulty::Easy)
        .await
        .unwrap();
    assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn mark_seen_is_idempotent() {
    let filter = SeenFilter::new(test_database().await);
    let user = format!("user-{}", Uuid::new_v4());

    filter.mark_seen(&user, "abc123").await.unwrap();
    filter.mark_seen(&user, "abc123").await.unwrap();

    assert!(filter.has_seen(&user, "abc123").await.unwrap());
    assert!(!filter.has_seen(&user, "def456").await.unwrap());
}
