use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::models::{Difficulty, Question};

/// Opaque question generator. Pure with respect to service state; content may
/// differ across calls for the same inputs.
#[async_trait]
pub trait QuestionProvider: Send + Sync {
    async fn generate(&self, topic: &str, difficulty: Difficulty) -> Result<Question>;
}

#[derive(Debug, Serialize)]
struct GenerateQuestionRequest<'a> {
    topic: &'a str,
    difficulty: Difficulty,
}

/// Generator backed by the content-generation HTTP API.
pub struct HttpQuestionProvider {
    http_client: Client,
    base_url: String,
}

impl HttpQuestionProvider {
    pub fn new(base_url: String) -> Self {
        Self {
            http_client: Client::new(),
            base_url,
        }
    }
}

#[async_trait]
impl QuestionProvider for HttpQuestionProvider {
    async fn generate(&self, topic: &str, difficulty: Difficulty) -> Result<Question> {
        let url = format!("{}/internal/generate_question", self.base_url);

        tracing::debug!(
            "Calling question generator: {} topic={} difficulty={}",
            url,
            topic,
            difficulty.as_str()
        );

        let response = self
            .http_client
            .post(&url)
            .json(&GenerateQuestionRequest { topic, difficulty })
            .timeout(std::time::Duration::from_secs(5))
            .send()
            .await
            .context("Failed to call question generator API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!(
                "Question generator returned error {}: {}",
                status,
                error_text
            ));
        }

        let question: Question = response
            .json()
            .await
            .context("Failed to parse question generator response")?;

        Ok(question)
    }
}
