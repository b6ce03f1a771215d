//! QnA Maker `generateAnswer` client.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::error::{ConfigError, RetrievalError};

use super::{KnowledgeBase, QnaAnswer};

/// A hosted QnA Maker knowledge base.
pub struct QnaMakerClient {
    name: String,
    kb_id: String,
    host: String,
    endpoint_key: SecretString,
    client: reqwest::Client,
}

impl QnaMakerClient {
    pub fn new(
        name: &str,
        kb_id: &str,
        host: &str,
        endpoint_key: SecretString,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                key: format!("knowledge base {name}"),
                message: format!("Failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            name: name.to_string(),
            kb_id: kb_id.to_string(),
            host: host.trim_end_matches('/').to_string(),
            endpoint_key,
            client,
        })
    }

    fn url(&self) -> String {
        format!("{}/knowledgebases/{}/generateAnswer", self.host, self.kb_id)
    }
}

#[async_trait]
impl KnowledgeBase for QnaMakerClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn answer(
        &self,
        question: &str,
        top_n: usize,
        threshold: f64,
    ) -> Result<Vec<QnaAnswer>, RetrievalError> {
        let body = serde_json::json!({
            "question": question,
            "top": top_n,
            "scoreThreshold": threshold * 100.0,
        });

        let resp = self
            .client
            .post(self.url())
            .header(
                "Authorization",
                format!("EndpointKey {}", self.endpoint_key.expose_secret()),
            )
            .json(&body)
            .send()
            .await
            .map_err(|e| RetrievalError::RequestFailed {
                kb: self.name.clone(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(kb = %self.name, status = ?status, "QnA Maker request failed");
            return Err(RetrievalError::BadStatus {
                kb: self.name.clone(),
                status: status.as_u16(),
            });
        }

        let parsed: GenerateAnswerResponse =
            resp.json().await.map_err(|e| RetrievalError::InvalidResponse {
                kb: self.name.clone(),
                reason: e.to_string(),
            })?;
        let answers = parsed.into_answers(top_n);
        tracing::debug!(kb = %self.name, count = answers.len(), "QnA Maker answered");
        Ok(answers)
    }
}

#[derive(Debug, Deserialize)]
struct GenerateAnswerResponse {
    #[serde(default)]
    answers: Vec<RawAnswer>,
}

#[derive(Debug, Deserialize)]
struct RawAnswer {
    answer: String,
    /// 0–100.
    score: f64,
    /// -1 marks the service's "no good match" placeholder.
    #[serde(default)]
    id: Option<i64>,
}

impl GenerateAnswerResponse {
    fn into_answers(self, top_n: usize) -> Vec<QnaAnswer> {
        let mut answers: Vec<QnaAnswer> = self
            .answers
            .into_iter()
            .filter(|a| a.id != Some(-1))
            .map(|a| QnaAnswer::new(a.answer, (a.score / 100.0).clamp(0.0, 1.0)))
            .collect();
        answers.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        answers.truncate(top_n);
        answers
    }
}
