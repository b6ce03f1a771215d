//! Configuration types.
//!
//! Everything is read from the environment at startup. Collaborator sections
//! are optional: without LUIS settings the offline pattern recognizer is used,
//! and a knowledge base can come from QnA Maker or a local JSON file.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Account id the bot uses on channels that don't assign one.
pub const DEFAULT_BOT_ID: &str = "rosy-bot";

/// Number of answers requested from a knowledge base.
pub const QNA_TOP_N: usize = 1;

/// Answers scoring below this are treated as "no answer".
pub const QNA_CONFIDENCE_THRESHOLD: f64 = 0.5;

/// Bot configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Bot name for identification.
    pub name: String,
    /// The bot's own account id; members with this id are not greeted.
    pub bot_id: String,
    /// Conversation state database. `None` keeps state in memory.
    pub db_path: Option<PathBuf>,
    pub recognizer: RecognizerConfig,
    pub faq: Option<KnowledgeBaseConfig>,
    pub chit_chat: Option<KnowledgeBaseConfig>,
    /// Answers below this confidence are rejected.
    pub confidence_threshold: f64,
    /// Timeout applied to recognizer and knowledge-base HTTP calls.
    pub request_timeout: Duration,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: "rosy".to_string(),
            bot_id: DEFAULT_BOT_ID.to_string(),
            db_path: None,
            recognizer: RecognizerConfig::Pattern,
            faq: None,
            chit_chat: None,
            confidence_threshold: QNA_CONFIDENCE_THRESHOLD,
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Which recognizer classifies messages.
#[derive(Debug, Clone)]
pub enum RecognizerConfig {
    /// Hosted LUIS v2 app.
    Luis {
        app_id: String,
        endpoint: String,
        endpoint_key: SecretString,
    },
    /// Offline regex rules.
    Pattern,
}

/// Where a knowledge base lives.
#[derive(Debug, Clone)]
pub enum KnowledgeBaseConfig {
    /// Hosted QnA Maker knowledge base.
    QnaMaker {
        name: String,
        kb_id: String,
        host: String,
        endpoint_key: SecretString,
    },
    /// JSON file of question/answer pairs.
    File { name: String, path: PathBuf },
}

impl KnowledgeBaseConfig {
    pub fn name(&self) -> &str {
        match self {
            Self::QnaMaker { name, .. } | Self::File { name, .. } => name,
        }
    }
}

impl BotConfig {
    /// Build configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let name = std::env::var("ROSY_NAME").unwrap_or(defaults.name);
        let bot_id = std::env::var("ROSY_BOT_ID").unwrap_or(defaults.bot_id);
        let db_path = std::env::var("ROSY_DB_PATH").ok().map(PathBuf::from);

        let confidence_threshold = match std::env::var("ROSY_CONFIDENCE_THRESHOLD") {
            Ok(raw) => parse_threshold("ROSY_CONFIDENCE_THRESHOLD", &raw)?,
            Err(_) => defaults.confidence_threshold,
        };

        let request_timeout = match std::env::var("ROSY_REQUEST_TIMEOUT_SECS") {
            Ok(raw) => parse_timeout("ROSY_REQUEST_TIMEOUT_SECS", &raw)?,
            Err(_) => defaults.request_timeout,
        };

        Ok(Self {
            name,
            bot_id,
            db_path,
            recognizer: recognizer_from_env()?,
            faq: knowledge_base_from_env("QNA_FAQ", "rma-faq")?,
            chit_chat: knowledge_base_from_env("QNA_CHITCHAT", "chit-chat")?,
            confidence_threshold,
            request_timeout,
        })
    }
}

fn parse_threshold(key: &str, raw: &str) -> Result<f64, ConfigError> {
    let value: f64 = raw.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("'{raw}' is not a number"),
    })?;
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{value} is outside 0.0..=1.0"),
        });
    }
    Ok(value)
}

fn parse_timeout(key: &str, raw: &str) -> Result<Duration, ConfigError> {
    let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("'{raw}' is not a whole number of seconds"),
    })?;
    if secs == 0 {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "timeout must be at least one second".into(),
        });
    }
    Ok(Duration::from_secs(secs))
}

fn recognizer_from_env() -> Result<RecognizerConfig, ConfigError> {
    let Ok(app_id) = std::env::var("LUIS_APP_ID") else {
        return Ok(RecognizerConfig::Pattern);
    };
    if app_id.trim().is_empty() {
        return Err(ConfigError::MissingRequired {
            key: "LUIS_APP_ID".into(),
            hint: "Set it to the LUIS application id or unset it to use the pattern recognizer."
                .into(),
        });
    }
    let endpoint = std::env::var("LUIS_ENDPOINT")
        .unwrap_or_else(|_| "https://westus.api.cognitive.microsoft.com".to_string());
    let key = std::env::var("LUIS_ENDPOINT_KEY")
        .map_err(|_| ConfigError::MissingEnvVar("LUIS_ENDPOINT_KEY".into()))?;
    Ok(RecognizerConfig::Luis {
        app_id,
        endpoint,
        endpoint_key: SecretString::from(key),
    })
}

/// Read `{prefix}_KB_ID`/`{prefix}_HOST`/`{prefix}_ENDPOINT_KEY`, or `{prefix}_FILE`.
fn knowledge_base_from_env(
    prefix: &str,
    name: &str,
) -> Result<Option<KnowledgeBaseConfig>, ConfigError> {
    if let Ok(kb_id) = std::env::var(format!("{prefix}_KB_ID")) {
        let host_key = format!("{prefix}_HOST");
        let host = std::env::var(&host_key).map_err(|_| ConfigError::MissingRequired {
            key: host_key,
            hint: "QnA Maker knowledge bases need a host URL.".into(),
        })?;
        let key_var = format!("{prefix}_ENDPOINT_KEY");
        let key = std::env::var(&key_var).map_err(|_| ConfigError::MissingEnvVar(key_var))?;
        return Ok(Some(KnowledgeBaseConfig::QnaMaker {
            name: name.to_string(),
            kb_id,
            host,
            endpoint_key: SecretString::from(key),
        }));
    }

    Ok(std::env::var(format!("{prefix}_FILE"))
        .ok()
        .map(|path| KnowledgeBaseConfig::File {
            name: name.to_string(),
            path: PathBuf::from(path),
        }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_offline_recognizer() {
        let config = BotConfig::default();
        assert!(matches!(config.recognizer, RecognizerConfig::Pattern));
        assert_eq!(config.confidence_threshold, 0.5);
        assert_eq!(config.bot_id, DEFAULT_BOT_ID);
        assert!(config.faq.is_none());
    }

    #[test]
    fn threshold_must_be_a_probability() {
        assert_eq!(parse_threshold("K", "0.75").unwrap(), 0.75);
        assert!(matches!(
            parse_threshold("K", "1.5"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            parse_threshold("K", "high"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn timeout_must_parse() {
        assert_eq!(parse_timeout("K", "30").unwrap(), Duration::from_secs(30));
        assert!(matches!(
            parse_timeout("K", "thirty"),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "K"
        ));
        assert!(matches!(
            parse_timeout("K", "0"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            parse_timeout("K", "-5"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn knowledge_base_name() {
        let kb = KnowledgeBaseConfig::File {
            name: "rma-faq".into(),
            path: PathBuf::from("faq.json"),
        };
        assert_eq!(kb.name(), "rma-faq");
    }
}
