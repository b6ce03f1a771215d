//! LUIS v2 endpoint client.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::error::{ConfigError, RecognitionError};

use super::{EntityMap, IntentClassification, Recognizer};

const SERVICE: &str = "luis";

/// Calls a hosted LUIS app's prediction endpoint.
pub struct LuisRecognizer {
    app_id: String,
    endpoint: String,
    endpoint_key: SecretString,
    client: reqwest::Client,
}

impl LuisRecognizer {
    pub fn new(
        app_id: &str,
        endpoint: &str,
        endpoint_key: SecretString,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                key: "LUIS_ENDPOINT".into(),
                message: format!("Failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            app_id: app_id.to_string(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            endpoint_key,
            client,
        })
    }

    fn url(&self) -> String {
        format!("{}/luis/v2.0/apps/{}", self.endpoint, self.app_id)
    }
}

#[async_trait]
impl Recognizer for LuisRecognizer {
    fn name(&self) -> &str {
        SERVICE
    }

    async fn classify(&self, text: &str) -> Result<IntentClassification, RecognitionError> {
        let resp = self
            .client
            .get(self.url())
            .query(&[
                ("q", text),
                ("verbose", "true"),
                ("subscription-key", self.endpoint_key.expose_secret()),
            ])
            .send()
            .await
            .map_err(|e| RecognitionError::RequestFailed {
                service: SERVICE.into(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(status = ?status, "LUIS request failed");
            return Err(RecognitionError::BadStatus {
                service: SERVICE.into(),
                status: status.as_u16(),
            });
        }

        let body: LuisResponse = resp.json().await.map_err(|e| RecognitionError::InvalidResponse {
            service: SERVICE.into(),
            reason: e.to_string(),
        })?;
        let classification = body.into_classification()?;
        tracing::debug!(
            intent = %classification.top_intent,
            score = ?classification.score,
            entities = classification.entities.len(),
            "LUIS classified message"
        );
        Ok(classification)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LuisResponse {
    query: String,
    top_scoring_intent: Option<LuisIntent>,
    #[serde(default)]
    intents: Vec<LuisIntent>,
    #[serde(default)]
    entities: Vec<LuisEntity>,
}

#[derive(Debug, Clone, Deserialize)]
struct LuisIntent {
    intent: String,
    score: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LuisEntity {
    entity: String,
    #[serde(rename = "type")]
    entity_type: String,
    start_index: Option<usize>,
    end_index: Option<usize>,
}

impl LuisResponse {
    fn into_classification(self) -> Result<IntentClassification, RecognitionError> {
        let top = match self.top_scoring_intent {
            Some(top) => top,
            None => self
                .intents
                .iter()
                .max_by(|a, b| a.score.unwrap_or(0.0).total_cmp(&b.score.unwrap_or(0.0)))
                .cloned()
                .ok_or_else(|| RecognitionError::InvalidResponse {
                    service: SERVICE.into(),
                    reason: "response has no intents".into(),
                })?,
        };

        let mut entities = EntityMap::new();
        for entity in &self.entities {
            let value = original_text(&self.query, entity).unwrap_or_else(|| entity.entity.clone());
            entities
                .entry(entity.entity_type.clone())
                .or_default()
                .push(value);
        }

        Ok(IntentClassification {
            top_intent: top.intent,
            score: top.score,
            entities,
        })
    }
}

/// LUIS lower-cases `entity`; recover the user's casing from the inclusive
/// character span in the query.
fn original_text(query: &str, entity: &LuisEntity) -> Option<String> {
    let (start, end) = (entity.start_index?, entity.end_index?);
    if end < start {
        return None;
    }
    let text: String = query.chars().skip(start).take(end - start + 1).collect();
    (text.chars().count() == end - start + 1).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: serde_json::Value) -> Result<IntentClassification, RecognitionError> {
        serde_json::from_value::<LuisResponse>(json)
            .unwrap()
            .into_classification()
    }

    #[test]
    fn parses_top_intent_and_entities() {
        let c = parse(serde_json::json!({
            "query": "create an RMA ticket for a Laptop",
            "topScoringIntent": { "intent": "CreateRmaTicket", "score": 0.97 },
            "entities": [
                { "entity": "laptop", "type": "Product", "startIndex": 27, "endIndex": 32, "score": 0.9 }
            ]
        }))
        .unwrap();
        assert_eq!(c.top_intent, "CreateRmaTicket");
        assert_eq!(c.score, Some(0.97));
        assert_eq!(c.entities["Product"], ["Laptop"]);
    }

    #[test]
    fn falls_back_to_best_scored_intent() {
        let c = parse(serde_json::json!({
            "query": "lookup ticket NTL12345",
            "intents": [
                { "intent": "None", "score": 0.1 },
                { "intent": "LookupRmaTicket", "score": 0.8 }
            ],
            "entities": [
                { "entity": "ntl12345", "type": "RmaNumber" }
            ]
        }))
        .unwrap();
        assert_eq!(c.top_intent, "LookupRmaTicket");
        // No span: keep LUIS's normalized text.
        assert_eq!(c.entities["RmaNumber"], ["ntl12345"]);
    }

    #[test]
    fn no_intents_is_invalid() {
        let err = parse(serde_json::json!({ "query": "hi" })).unwrap_err();
        assert!(matches!(err, RecognitionError::InvalidResponse { .. }));
    }

    #[test]
    fn span_past_end_is_ignored() {
        let entity = LuisEntity {
            entity: "x".into(),
            entity_type: "Product".into(),
            start_index: Some(2),
            end_index: Some(10),
        };
        assert!(original_text("abc", &entity).is_none());
    }

    #[test]
    fn url_trims_trailing_slash() {
        let r = LuisRecognizer::new(
            "app-1",
            "https://westus.api.cognitive.microsoft.com/",
            SecretString::from("key"),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            r.url(),
            "https://westus.api.cognitive.microsoft.com/luis/v2.0/apps/app-1"
        );
    }
}
