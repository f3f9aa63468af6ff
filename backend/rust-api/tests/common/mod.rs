#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use std::env;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

use duelground_api::config::Config;
use duelground_api::models::{Difficulty, Question};
use duelground_api::services::question_provider::QuestionProvider;
use duelground_api::services::reward_hooks::RewardHooks;
use duelground_api::{create_router, AppState};

/// Generator double: every call produces a fresh four-option question whose
/// correct answer is "42". The per-instance nonce keeps content distinct
/// across parallel test runs.
pub struct StubQuestionProvider {
    nonce: String,
    counter: AtomicUsize,
}

impl Default for StubQuestionProvider {
    fn default() -> Self {
        Self {
            nonce: Uuid::new_v4().to_string(),
            counter: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl QuestionProvider for StubQuestionProvider {
    async fn generate(&self, topic: &str, difficulty: Difficulty) -> Result<Question> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(Question::Single {
            stem: format!(
                "[{} {} #{} {}] What is 6 x 7?",
                topic,
                difficulty.as_str(),
                n,
                self.nonce
            ),
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

/// Economy double recording outcome calls instead of performing HTTP.
#[derive(Default)]
pub struct RecordingRewardHooks {
    pub wins: Mutex<Vec<(String, String, String)>>,
    pub draws: Mutex<Vec<(String, String, String)>>,
}

#[async_trait]
impl RewardHooks for RecordingRewardHooks {
    async fn on_duel_win(&self, winner: &str, loser: &str, topic: &str) -> Result<()> {
        self.wins.lock().unwrap().push((
            winner.to_string(),
            loser.to_string(),
            topic.to_string(),
        ));
        Ok(())
    }

    async fn on_duel_draw(&self, a: &str, b: &str, topic: &str) -> Result<()> {
        self.draws
            .lock()
            .unwrap()
            .push((a.to_string(), b.to_string(), topic.to_string()));
        Ok(())
    }
}

pub struct TestContext {
    pub app: Router,
    pub mongo: mongodb::Database,
    pub redis: redis::Client,
    pub hooks: Arc<RecordingRewardHooks>,
}

pub fn test_config() -> Config {
    dotenvy::from_filename(".env.test").ok();
    Config {
        mongo_uri: env::var("MONGO_URI")
            .unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
        redis_uri: env::var("REDIS_URI")
            .unwrap_or_else(|_| "redis://127.0.0.1:6379/0".to_string()),
        mongo_database: env::var("MONGO_DATABASE")
            .unwrap_or_else(|_| "duelground_test".to_string()),
        // Doubles are injected below; these endpoints are never contacted.
        generator_api_url: "http://localhost:9".to_string(),
        economy_api_url: "http://localhost:9".to_string(),
    }
}

pub async fn create_test_app() -> TestContext {
    // Initialize tracing for tests
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let config = test_config();

    let mongo_client = mongodb::Client::with_uri_str(&config.mongo_uri)
        .await
        .expect("Failed to connect to test MongoDB");

    let redis_client =
        redis::Client::open(config.redis_uri.clone()).expect("Failed to create test Redis client");

    let hooks = Arc::new(RecordingRewardHooks::default());
    let app_state = AppState::with_collaborators(
        config.clone(),
        mongo_client.clone(),
        redis_client.clone(),
        Arc::new(StubQuestionProvider::default()),
        hooks.clone(),
    )
    .await
    .expect("Failed to initialize test app state");

    TestContext {
        app: create_router(Arc::new(app_state)),
        mongo: mongo_client.database(&config.mongo_database),
        redis: redis_client,
        hooks,
    }
}

pub fn unique_user(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4())
}

pub async fn post_json(
    app: &Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    split_response(response).await
}

pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    split_response(response).await
}

async fn split_response(response: axum::response::Response) -> (StatusCode, serde_json::Value) {
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    // Error responses carry a plain-text body; report those as null.
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}
