//! Offline regex recognizer.
//!
//! Rules are tried in order; the first whose intent pattern matches wins and
//! its entity patterns pull values out of the text. Nothing matching yields
//! the `None` intent. Good enough for local runs without a hosted model.

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use crate::error::RecognitionError;

use super::{
    IntentClassification, PRODUCT_ENTITY, Recognizer, TICKET_ID_ENTITY, labels,
};

/// Extracts one entity type via the first capture group of `regex`.
#[derive(Debug, Clone)]
pub struct EntityRule {
    pub entity: String,
    pub regex: Regex,
}

/// Maps text matching `regex` to `intent`.
#[derive(Debug, Clone)]
pub struct IntentRule {
    pub intent: String,
    pub regex: Regex,
    pub entities: Vec<EntityRule>,
}

/// Regex-rule recognizer.
pub struct PatternRecognizer {
    rules: Vec<IntentRule>,
}

impl PatternRecognizer {
    pub fn new(rules: Vec<IntentRule>) -> Self {
        Self { rules }
    }

    /// Rules covering the RMA bot's intents.
    pub fn default_rules() -> Self {
        let product = EntityRule {
            entity: PRODUCT_ENTITY.into(),
            regex: Regex::new(r"(?i)\bfor\s+(?:an?\s+|the\s+|my\s+)?(\w[\w\- ]*?)\s*[.!?]*$")
                .unwrap(),
        };
        let ticket_id = EntityRule {
            entity: TICKET_ID_ENTITY.into(),
            regex: Regex::new(r"(?i)\b(NTL\d{5}|\d{5,})\b").unwrap(),
        };

        let rules = vec![
            IntentRule {
                intent: labels::CREATE_TICKET.into(),
                regex: Regex::new(
                    r"(?i)\b(create|open|start|file|submit|new|make)\b.*?\b(rma|return|ticket)\b",
                )
                .unwrap(),
                entities: vec![product],
            },
            IntentRule {
                intent: labels::LIST_TICKETS.into(),
                regex: Regex::new(r"(?i)\b(list|show|all|my)\b.*?\b(rmas|tickets)\b").unwrap(),
                entities: Vec::new(),
            },
            IntentRule {
                intent: labels::LOOKUP_TICKET.into(),
                regex: Regex::new(
                    r"(?i)\b(look\s*up|find|check|status|show|track)\b.*?\b(rma|ticket)\b",
                )
                .unwrap(),
                entities: vec![ticket_id],
            },
            IntentRule {
                intent: labels::CHIT_CHAT.into(),
                regex: Regex::new(
                    r"(?i)^\s*(hi|hello|hey|thanks|thank you|good (morning|afternoon|evening)|how are you|who are you)\b",
                )
                .unwrap(),
                entities: Vec::new(),
            },
            IntentRule {
                intent: labels::FAQ.into(),
                regex: Regex::new(
                    r"(?i)\b(how|what|when|where|why|can|do|does|is|which)\b.*?\b(rma|returns?|refunds?|warranty|shipping|ship|label|exchange)\b",
                )
                .unwrap(),
                entities: Vec::new(),
            },
        ];
        Self::new(rules)
    }

    /// Classify synchronously.
    pub fn classify_text(&self, text: &str) -> IntentClassification {
        let Some(rule) = self.rules.iter().find(|r| r.regex.is_match(text)) else {
            return IntentClassification::new(labels::NONE);
        };

        let mut classification = IntentClassification::new(rule.intent.clone());
        classification.score = Some(1.0);
        for entity in &rule.entities {
            for caps in entity.regex.captures_iter(text) {
                if let Some(value) = caps.get(1).map(|m| m.as_str().trim()).filter(|v| !v.is_empty()) {
                    classification = classification.with_entity(&entity.entity, value);
                }
            }
        }
        debug!(
            intent = %classification.top_intent,
            entities = classification.entities.len(),
            "Pattern rule matched"
        );
        classification
    }
}

#[async_trait]
impl Recognizer for PatternRecognizer {
    fn name(&self) -> &str {
        "pattern"
    }

    async fn classify(&self, text: &str) -> Result<IntentClassification, RecognitionError> {
        Ok(self.classify_text(text))
    }
}
