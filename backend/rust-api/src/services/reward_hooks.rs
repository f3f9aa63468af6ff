use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

/// Economy side effects of a duel outcome (coin grants, win-count
/// aggregation). Implemented by the external economy subsystem; callers treat
/// failures as logging events, never as a reason to roll back a finalize.
#[async_trait]
pub trait RewardHooks: Send + Sync {
    async fn on_duel_win(&self, winner: &str, loser: &str, topic: &str) -> Result<()>;
    async fn on_duel_draw(&self, a: &str, b: &str, topic: &str) -> Result<()>;
}

pub struct HttpRewardHooks {
    http_client: Client,
    base_url: String,
}

impl HttpRewardHooks {
    pub fn new(base_url: String) -> Self {
        Self {
            http_client: Client::new(),
            base_url,
        }
    }

    async fn post_outcome(&self, payload: serde_json::Value) -> Result<()> {
        let url = format!("{}/internal/duel_outcome", self.base_url);

        let response = self
            .http_client
            .post(&url)
            .json(&payload)
            .timeout(std::time::Duration::from_secs(5))
            .send()
            .await
            .context("Failed to call economy API")?;

        if !response.status().is_success() {
            return Err(anyhow!("Economy API returned error {}", response.status()));
        }
        Ok(())
    }
}

#[async_trait]
impl RewardHooks for HttpRewardHooks {
    async fn on_duel_win(&self, winner: &str, loser: &str, topic: &str) -> Result<()> {
        self.post_outcome(json!({
            "outcome": "win",
            "winner": winner,
            "loser": loser,
            "topic": topic,
        }))
        .await
    }

    async fn on_duel_draw(&self, a: &str, b: &str, topic: &str) -> Result<()> {
        self.post_outcome(json!({
            "outcome": "draw",
            "players": [a, b],
            "topic": topic,
        }))
        .await
    }
}
