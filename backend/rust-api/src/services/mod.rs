use crate::config::Config;
use mongodb::{Client as MongoClient, Database};
use redis::aio::ConnectionManager;
use std::sync::Arc;

use question_provider::{HttpQuestionProvider, QuestionProvider};
use reward_hooks::{HttpRewardHooks, RewardHooks};

pub struct AppState {
    pub config: Config,
    pub mongo: Database,
    pub redis: ConnectionManager,
    pub question_provider: Arc<dyn QuestionProvider>,
    pub reward_hooks: Arc<dyn RewardHooks>,
}

impl AppState {
    pub async fn new(
        config: Config,
        mongo_client: MongoClient,
        redis_client: redis::Client,
    ) -> anyhow::Result<Self> {
        let question_provider =
            Arc::new(HttpQuestionProvider::new(config.generator_api_url.clone()));
        let reward_hooks = Arc::new(HttpRewardHooks::new(config.economy_api_url.clone()));
        Self::with_collaborators(
            config,
            mongo_client,
            redis_client,
            question_provider,
            reward_hooks,
        )
        .await
    }

    /// Construction with injected collaborators; tests substitute doubles for
    /// the generator and the economy hooks here.
    pub async fn with_collaborators(
        config: Config,
        mongo_client: MongoClient,
        redis_client: redis::Client,
        question_provider: Arc<dyn QuestionProvider>,
        reward_hooks: Arc<dyn RewardHooks>,
    ) -> anyhow::Result<Self> {
        let mongo = mongo_client.database(&config.mongo_database);

        tracing::info!("Attempting to connect to Redis...");

        // Create ConnectionManager with longer timeout
        let redis = tokio::time::timeout(
            std::time::Duration::from_secs(30),
            ConnectionManager::new(redis_client),
        )
        .await
        .map_err(|_| anyhow::anyhow!("Redis connection timeout after 30s"))??;

        tracing::info!("Redis ConnectionManager created, testing with PING...");

        // Test connection
        let mut conn = redis.clone();
        tokio::time::timeout(
            std::time::Duration::from_secs(5),
            redis::cmd("PING").query_async::<String>(&mut conn),
        )
        .await
        .map_err(|_| anyhow::anyhow!("Redis PING timeout after 5s"))??;

        tracing::info!("Redis connection established successfully");

        Ok(Self {
            config,
            mongo,
            redis,
            question_provider,
            reward_hooks,
        })
    }
}

pub mod duel_service;
pub mod presence_service;
pub mod question_provider;
pub mod reward_hooks;
pub mod seen_filter;
pub mod skill_service;
pub mod solo_service;
