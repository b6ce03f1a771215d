//! Knowledge bases — FAQ and chit-chat answer retrieval.

pub mod qna_maker;
pub mod static_kb;

pub use qna_maker::QnaMakerClient;
pub use static_kb::{FaqEntry, StaticKnowledgeBase};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::KnowledgeBaseConfig;
use crate::error::{ConfigError, RetrievalError};

/// One candidate answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QnaAnswer {
    pub answer: String,
    /// Normalized to 0.0..=1.0.
    pub confidence: f64,
}

impl QnaAnswer {
    pub fn new(answer: impl Into<String>, confidence: f64) -> Self {
        Self {
            answer: answer.into(),
            confidence,
        }
    }
}

/// A question-answering service.
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    fn name(&self) -> &str;

    /// Up to `top_n` answers, best first. Implementations may pre-filter on
    /// `threshold`, but callers must not rely on it.
    async fn answer(
        &self,
        question: &str,
        top_n: usize,
        threshold: f64,
    ) -> Result<Vec<QnaAnswer>, RetrievalError>;
}

/// The highest-confidence non-empty answer at or above `threshold`.
pub fn best_answer(answers: &[QnaAnswer], threshold: f64) -> Option<&QnaAnswer> {
    answers
        .iter()
        .filter(|a| !a.answer.trim().is_empty())
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
        .filter(|a| a.confidence >= threshold)
}

/// Build a knowledge base from configuration; unconfigured means empty.
pub async fn create_knowledge_base(
    config: Option<&KnowledgeBaseConfig>,
    fallback_name: &str,
    timeout: Duration,
) -> Result<Arc<dyn KnowledgeBase>, ConfigError> {
    match config {
        Some(KnowledgeBaseConfig::QnaMaker {
            name,
            kb_id,
            host,
            endpoint_key,
        }) => {
            tracing::info!(kb = %name, "Using QnA Maker knowledge base");
            Ok(Arc::new(QnaMakerClient::new(
                name,
                kb_id,
                host,
                endpoint_key.clone(),
                timeout,
            )?))
        }
        Some(KnowledgeBaseConfig::File { name, path }) => {
            let kb = StaticKnowledgeBase::load(name, path)
                .await
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            tracing::info!(kb = %name, entries = kb.len(), "Loaded knowledge base file");
            Ok(Arc::new(kb))
        }
        None => {
            tracing::info!(kb = fallback_name, "Knowledge base not configured; it will find no answers");
            Ok(Arc::new(StaticKnowledgeBase::empty(fallback_name)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn best_answer_respects_threshold() {
        let answers = vec![QnaAnswer::new("Low", 0.3)];
        assert!(best_answer(&answers, 0.5).is_none());

        let answers = vec![QnaAnswer::new("Exactly", 0.5)];
        assert_eq!(best_answer(&answers, 0.5).unwrap().answer, "Exactly");
    }

    #[test]
    fn best_answer_picks_highest_confidence() {
        let answers = vec![QnaAnswer::new("ok", 0.6), QnaAnswer::new("best", 0.9)];
        assert_eq!(best_answer(&answers, 0.5).unwrap().answer, "best");
    }

    #[test]
    fn empty_inputs_have_no_answer() {
        assert!(best_answer(&[], 0.5).is_none());
        assert!(best_answer(&[QnaAnswer::new("  ", 0.99)], 0.5).is_none());
    }

    #[tokio::test]
    async fn unconfigured_kb_is_empty() {
        let kb = create_knowledge_base(None, "rma-faq", Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(kb.name(), "rma-faq");
        assert!(kb.answer("anything", 1, 0.5).await.unwrap().is_empty());
    }
}
