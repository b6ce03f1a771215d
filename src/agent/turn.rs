//! Turn controller — one activity in, the replies for it out.
//!
//! Message turns load the conversation state, run the dispatcher and save the
//! state at most once. Replies are handed back only after the save.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::channels::{ActivityKind, ChannelAccount, IncomingMessage, OutgoingResponse};
use crate::dialog::{ConversationState, IntentDispatcher, SessionKey, TurnContext, messages};
use crate::error::{Error, TurnError};
use crate::store::{StateStore, load_conversation, save_conversation};
use crate::telemetry::events;

pub struct TurnController {
    store: Arc<dyn StateStore>,
    dispatcher: IntentDispatcher,
    in_flight: Mutex<HashSet<SessionKey>>,
}

/// Marks a key busy until dropped.
pub(crate) struct TurnGuard<'a> {
    in_flight: &'a Mutex<HashSet<SessionKey>>,
    key: SessionKey,
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        let mut keys = self.in_flight.lock().unwrap_or_else(|p| p.into_inner());
        keys.remove(&self.key);
    }
}

impl TurnController {
    pub fn new(store: Arc<dyn StateStore>, dispatcher: IntentDispatcher) -> Self {
        Self {
            store,
            dispatcher,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn dispatcher(&self) -> &IntentDispatcher {
        &self.dispatcher
    }

    /// Claim `key` for one turn. Fails if a turn for it is already running.
    pub(crate) fn claim(&self, key: &SessionKey) -> Result<TurnGuard<'_>, TurnError> {
        let mut keys = self.in_flight.lock().unwrap_or_else(|p| p.into_inner());
        if !keys.insert(key.clone()) {
            return Err(TurnError::ConcurrentTurn(key.to_string()));
        }
        Ok(TurnGuard {
            in_flight: &self.in_flight,
            key: key.clone(),
        })
    }

    /// Process one activity.
    ///
    /// Recognizer, knowledge-base and store failures become the generic
    /// apology; nothing is saved for such a turn.
    pub async fn on_turn(&self, activity: &IncomingMessage) -> Result<Vec<OutgoingResponse>, Error> {
        match &activity.kind {
            ActivityKind::Message { .. } => match self.message_turn(activity).await {
                Ok(replies) => Ok(replies),
                Err(e @ (Error::Recognition(_) | Error::Retrieval(_) | Error::Database(_))) => {
                    warn!(key = %activity.session_key(), "Turn failed: {}", e);
                    Ok(vec![OutgoingResponse::text(messages::GENERIC_FAILURE_MESSAGE)])
                }
                Err(e) => Err(e),
            },
            ActivityKind::ConversationUpdate { members_added } => {
                Ok(welcome_new_members(members_added, &activity.recipient_id))
            }
            ActivityKind::Other { name } => {
                debug!(activity = %name, "Ignoring activity");
                Ok(Vec::new())
            }
        }
    }

    async fn message_turn(&self, activity: &IncomingMessage) -> Result<Vec<OutgoingResponse>, Error> {
        let key = activity.session_key();
        let _guard = self.claim(&key)?;

        let mut state = load_conversation(self.store.as_ref(), &key).await?;
        let loaded = state.clone();
        let mut ctx = TurnContext::new(activity);

        if state.form_reset {
            self.dispatcher
                .telemetry()
                .track_event(events::FORM_RESET, &[("reason", "unreadable")]);
            ctx.send(messages::FORM_RESTARTED_MESSAGE);
        }

        self.dispatcher.handle_turn(&mut ctx, &mut state).await?;

        if needs_save(&loaded, &state) {
            save_conversation(self.store.as_ref(), &key, &state).await?;
        } else {
            debug!(key = %key, "State unchanged, skipping save");
        }

        Ok(ctx.into_replies())
    }
}

fn needs_save(loaded: &ConversationState, current: &ConversationState) -> bool {
    current.form_reset || loaded != current
}

fn welcome_new_members(members: &[ChannelAccount], bot_id: &str) -> Vec<OutgoingResponse> {
    members
        .iter()
        .filter(|m| m.id != bot_id)
        .map(|m| {
            debug!(member = %m.id, "Welcoming new member");
            messages::welcome_response()
        })
        .collect()
}
