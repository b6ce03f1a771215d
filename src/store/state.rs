//! Loading and saving `ConversationState` through a `StateStore`.

use serde_json::Value;
use tracing::warn;

use crate::dialog::{ConversationState, FormSession, SessionKey};
use crate::error::DatabaseError;
use crate::tickets::TicketBook;

use super::traits::StateStore;

/// Property name the whole conversation state is stored under.
pub const CONVERSATION_PROPERTY: &str = "conversation";

/// Load the state for `key`, defaulting when nothing was stored.
///
/// A stored form that no longer parses is dropped and `form_reset` is set so
/// the caller can tell the user. Unreadable tickets are an error.
pub async fn load_conversation(
    store: &dyn StateStore,
    key: &SessionKey,
) -> Result<ConversationState, DatabaseError> {
    let Some(value) = store.get(key, CONVERSATION_PROPERTY).await? else {
        return Ok(ConversationState::default());
    };
    decode_state(key, value)
}

/// Write the whole state for `key` in one call.
pub async fn save_conversation(
    store: &dyn StateStore,
    key: &SessionKey,
    state: &ConversationState,
) -> Result<(), DatabaseError> {
    let value =
        serde_json::to_value(state).map_err(|e| DatabaseError::Serialization(e.to_string()))?;
    store.set(key, CONVERSATION_PROPERTY, &value).await
}

fn decode_state(key: &SessionKey, value: Value) -> Result<ConversationState, DatabaseError> {
    let mut fields = match value {
        Value::Object(fields) => fields,
        Value::Null => return Ok(ConversationState::default()),
        other => {
            return Err(DatabaseError::Serialization(format!(
                "conversation state for {key} is not an object: {other}"
            )));
        }
    };

    let tickets: TicketBook = match fields.remove("tickets") {
        Some(raw) => serde_json::from_value(raw)
            .map_err(|e| DatabaseError::Serialization(format!("tickets for {key}: {e}")))?,
        None => TicketBook::default(),
    };

    let mut form_reset = false;
    let form = match fields.remove("form") {
        None | Some(Value::Null) => None,
        Some(raw) => match serde_json::from_value::<FormSession>(raw) {
            Ok(form) => Some(form),
            Err(e) => {
                warn!(key = %key, "Dropping unreadable form session: {}", e);
                form_reset = true;
                None
            }
        },
    };

    Ok(ConversationState {
        form,
        tickets,
        form_reset,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialog::Collected;
    use crate::store::MemoryStore;
    use crate::tickets::TicketRecord;
    use serde_json::json;

    fn key() -> SessionKey {
        SessionKey::new("cli", "c1")
    }

    #[tokio::test]
    async fn missing_state_is_default() {
        let store = MemoryStore::new();
        let state = load_conversation(&store, &key()).await.unwrap();
        assert_eq!(state, ConversationState::default());
    }

    #[tokio::test]
    async fn save_then_load() {
        let store = MemoryStore::new();
        let mut state = ConversationState::default();
        state
            .tickets
            .add(TicketRecord::new("laptop", Some("cracked screen")).unwrap());
        state.form = Some(FormSession::new("rma_ticket", Collected::new()));

        save_conversation(&store, &key(), &state).await.unwrap();
        let back = load_conversation(&store, &key()).await.unwrap();
        assert_eq!(back, state);
    }

    #[tokio::test]
    async fn unreadable_form_is_dropped_and_flagged() {
        let store = MemoryStore::new();
        store
            .set(
                &key(),
                CONVERSATION_PROPERTY,
                &json!({ "form": { "dialog_id": 7 }, "tickets": [] }),
            )
            .await
            .unwrap();

        let state = load_conversation(&store, &key()).await.unwrap();
        assert!(state.form.is_none());
        assert!(state.form_reset);
        assert!(state.tickets.is_empty());
    }

    #[tokio::test]
    async fn unreadable_tickets_are_an_error() {
        let store = MemoryStore::new();
        store
            .set(&key(), CONVERSATION_PROPERTY, &json!({ "tickets": "nope" }))
            .await
            .unwrap();
        let err = load_conversation(&store, &key()).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Serialization(_)));
    }
}
