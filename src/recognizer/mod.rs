//! Intent recognition — the external classifier and the intent enum the
//! dispatcher matches on.

pub mod luis;
pub mod pattern;

pub use luis::LuisRecognizer;
pub use pattern::PatternRecognizer;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::RecognizerConfig;
use crate::error::{ConfigError, RecognitionError};

/// Entity carrying the product to return.
pub const PRODUCT_ENTITY: &str = "Product";
/// Entity carrying an RMA ticket id.
pub const TICKET_ID_ENTITY: &str = "RmaNumber";

/// Recognizer intent labels.
pub mod labels {
    pub const CREATE_TICKET: &str = "CreateRmaTicket";
    pub const LOOKUP_TICKET: &str = "LookupRmaTicket";
    pub const LIST_TICKETS: &str = "ListRmaTickets";
    pub const FAQ: &str = "q_RosyBot_RMA_FAQ";
    pub const CHIT_CHAT: &str = "q_RosyBot_Chit_Chat";
    pub const NONE: &str = "None";
}

/// Entity type name -> extracted values, in utterance order.
pub type EntityMap = HashMap<String, Vec<String>>;

/// Classifier output for one utterance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntentClassification {
    pub top_intent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default)]
    pub entities: EntityMap,
}

impl IntentClassification {
    pub fn new(top_intent: impl Into<String>) -> Self {
        Self {
            top_intent: top_intent.into(),
            ..Default::default()
        }
    }

    pub fn with_entity(mut self, entity: &str, value: impl Into<String>) -> Self {
        self.entities
            .entry(entity.to_string())
            .or_default()
            .push(value.into());
        self
    }

    pub fn intent(&self) -> Intent {
        Intent::from_label(&self.top_intent)
    }
}

/// Intents the bot knows how to handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    CreateTicket,
    LookupTicket,
    ListTickets,
    Faq,
    ChitChat,
    None,
    /// A label this bot has no handler for.
    Unrecognized(String),
}

impl Intent {
    pub fn from_label(label: &str) -> Self {
        match label {
            labels::CREATE_TICKET => Self::CreateTicket,
            labels::LOOKUP_TICKET => Self::LookupTicket,
            labels::LIST_TICKETS => Self::ListTickets,
            labels::FAQ => Self::Faq,
            labels::CHIT_CHAT => Self::ChitChat,
            labels::NONE | "" => Self::None,
            other => Self::Unrecognized(other.to_string()),
        }
    }
}

/// Values extracted for `entity`, or `None` when the type is missing or empty.
pub fn find_entities<'a>(entity: &str, entities: &'a EntityMap) -> Option<&'a [String]> {
    entities
        .get(entity)
        .map(Vec::as_slice)
        .filter(|values| !values.is_empty())
}

/// An intent/entity classifier.
#[async_trait]
pub trait Recognizer: Send + Sync {
    fn name(&self) -> &str;

    async fn classify(&self, text: &str) -> Result<IntentClassification, RecognitionError>;
}

/// Build the recognizer named by configuration.
pub fn create_recognizer(
    config: &RecognizerConfig,
    timeout: Duration,
) -> Result<Arc<dyn Recognizer>, ConfigError> {
    match config {
        RecognizerConfig::Luis {
            app_id,
            endpoint,
            endpoint_key,
        } => {
            tracing::info!("Using LUIS recognizer (app: {})", app_id);
            Ok(Arc::new(LuisRecognizer::new(
                app_id,
                endpoint,
                endpoint_key.clone(),
                timeout,
            )?))
        }
        RecognizerConfig::Pattern => {
            tracing::info!("Using offline pattern recognizer");
            Ok(Arc::new(PatternRecognizer::default_rules()))
        }
    }
}
