//! Per-conversation state: the session key, the in-progress form, and the
//! conversation's tickets.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::tickets::TicketBook;

/// Field values gathered by a form, keyed by field name.
pub type Collected = BTreeMap<String, String>;

/// Identifies one conversation (optionally narrowed to one user).
///
/// Every state read and write during a turn goes through the key derived
/// from the incoming activity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionKey {
    pub channel: String,
    pub conversation_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl SessionKey {
    pub fn new(channel: &str, conversation_id: &str) -> Self {
        Self {
            channel: channel.to_string(),
            conversation_id: conversation_id.to_string(),
            user_id: None,
        }
    }

    /// Narrow the key to a single user within the conversation.
    pub fn for_user(mut self, user_id: &str) -> Self {
        self.user_id = Some(user_id.to_string());
        self
    }

    /// Store key for a named property of this conversation.
    pub fn storage_key(&self, property: &str) -> String {
        format!("{self}#{property}")
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.channel, self.conversation_id)?;
        if let Some(ref user) = self.user_id {
            write!(f, "/{user}")?;
        }
        Ok(())
    }
}

/// An in-progress multi-step form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSession {
    /// Waterfall this form runs.
    pub dialog_id: String,
    /// Zero-based cursor into the waterfall's steps.
    pub step_index: usize,
    pub collected: Collected,
    /// Field the last prompt asked for, while waiting on a reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub awaiting: Option<String>,
}

impl FormSession {
    pub fn new(dialog_id: &str, seed: Collected) -> Self {
        Self {
            dialog_id: dialog_id.to_string(),
            step_index: 0,
            collected: seed,
            awaiting: None,
        }
    }

    pub fn is_awaiting_reply(&self) -> bool {
        self.awaiting.is_some()
    }
}

/// Everything persisted for one conversation.
///
/// Loaded in full at the start of a turn and written back once at the end.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    /// The active form, if any. At most one per conversation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form: Option<FormSession>,
    #[serde(default)]
    pub tickets: TicketBook,
    /// Set on load when a stored form could not be read and was dropped.
    #[serde(skip)]
    pub form_reset: bool,
}

impl ConversationState {
    pub fn has_active_form(&self) -> bool {
        self.form.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_display_and_storage_key() {
        let key = SessionKey::new("cli", "conv-1");
        assert_eq!(key.to_string(), "cli/conv-1");
        assert_eq!(key.storage_key("conversation"), "cli/conv-1#conversation");

        let user_key = key.for_user("alice");
        assert_eq!(user_key.to_string(), "cli/conv-1/alice");
    }

    #[test]
    fn new_form_starts_at_step_zero() {
        let mut seed = Collected::new();
        seed.insert("productName".into(), "laptop".into());
        let form = FormSession::new("rma_ticket", seed);
        assert_eq!(form.step_index, 0);
        assert_eq!(form.collected["productName"], "laptop");
        assert!(!form.is_awaiting_reply());
    }

    #[test]
    fn form_reset_flag_is_not_persisted() {
        let state = ConversationState {
            form_reset: true,
            ..Default::default()
        };
        let json = serde_json::to_value(&state).unwrap();
        assert!(json.get("form_reset").is_none());
        assert!(json.get("form").is_none());

        let back: ConversationState = serde_json::from_value(json).unwrap();
        assert!(!back.form_reset);
        assert!(!back.has_active_form());
    }

    #[test]
    fn state_serde_roundtrip_with_form() {
        let mut form = FormSession::new("rma_ticket", Collected::new());
        form.step_index = 1;
        form.awaiting = Some("reason".into());
        let state = ConversationState {
            form: Some(form),
            ..Default::default()
        };
        let json = serde_json::to_string(&state).unwrap();
        let back: ConversationState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
