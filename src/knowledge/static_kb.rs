//! File-backed knowledge base scored by word overlap.

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RetrievalError;

use super::{KnowledgeBase, QnaAnswer};

/// One FAQ entry: alternative phrasings and their answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaqEntry {
    pub questions: Vec<String>,
    pub answer: String,
}

/// Knowledge base held in memory, usually loaded from a JSON array of
/// [`FaqEntry`].
#[derive(Debug)]
pub struct StaticKnowledgeBase {
    name: String,
    entries: Vec<FaqEntry>,
}

impl StaticKnowledgeBase {
    pub fn new(name: &str, entries: Vec<FaqEntry>) -> Self {
        Self {
            name: name.to_string(),
            entries,
        }
    }

    /// A knowledge base that never answers.
    pub fn empty(name: &str) -> Self {
        Self::new(name, Vec::new())
    }

    pub async fn load(name: &str, path: &Path) -> Result<Self, RetrievalError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| RetrievalError::Load {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        let entries: Vec<FaqEntry> =
            serde_json::from_str(&raw).map_err(|e| RetrievalError::Load {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self::new(name, entries))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Best Jaccard similarity between the question and any phrasing of `entry`.
    fn score(question: &HashSet<String>, entry: &FaqEntry) -> f64 {
        entry
            .questions
            .iter()
            .map(|q| jaccard(question, &tokens(q)))
            .fold(0.0, f64::max)
    }
}

fn tokens(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 1)
        .map(str::to_lowercase)
        .collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

#[async_trait]
impl KnowledgeBase for StaticKnowledgeBase {
    fn name(&self) -> &str {
        &self.name
    }

    async fn answer(
        &self,
        question: &str,
        top_n: usize,
        threshold: f64,
    ) -> Result<Vec<QnaAnswer>, RetrievalError> {
        let asked = tokens(question);
        let mut answers: Vec<QnaAnswer> = self
            .entries
            .iter()
            .map(|e| QnaAnswer::new(e.answer.clone(), Self::score(&asked, e)))
            .filter(|a| a.confidence >= threshold)
            .collect();
        answers.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        answers.truncate(top_n);
        Ok(answers)
    }
}
