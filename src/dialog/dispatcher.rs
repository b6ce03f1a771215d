//! Intent dispatcher — routes one message turn.
//!
//! While a form is active every message goes to the waterfall engine and the
//! recognizer is never called. Otherwise the recognizer runs exactly once and
//! its top intent picks the handler.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::QNA_TOP_N;
use crate::error::{DialogError, Error};
use crate::knowledge::{KnowledgeBase, best_answer};
use crate::recognizer::{
    IntentClassification, Intent, PRODUCT_ENTITY, Recognizer, TICKET_ID_ENTITY, find_entities,
};
use crate::telemetry::{Telemetry, events};
use crate::tickets::TicketRecord;

use super::context::TurnContext;
use super::messages;
use super::session::{Collected, ConversationState};
use super::ticket_dialog::{PRODUCT_FIELD, REASON_FIELD, RMA_TICKET_DIALOG, rma_ticket_waterfall};
use super::waterfall::{WaterfallEngine, WaterfallStatus};

/// Collaborators the dispatcher calls out to.
pub struct DispatcherDeps {
    pub recognizer: Arc<dyn Recognizer>,
    pub faq: Arc<dyn KnowledgeBase>,
    pub chit_chat: Arc<dyn KnowledgeBase>,
    pub telemetry: Arc<dyn Telemetry>,
}

/// Single-turn router. Holds no per-conversation state.
pub struct IntentDispatcher {
    deps: DispatcherDeps,
    engine: WaterfallEngine<TicketRecord>,
    confidence_threshold: f64,
}

impl IntentDispatcher {
    pub fn new(deps: DispatcherDeps, confidence_threshold: f64) -> Self {
        let mut engine = WaterfallEngine::new();
        engine.register(RMA_TICKET_DIALOG, rma_ticket_waterfall());
        Self {
            deps,
            engine,
            confidence_threshold,
        }
    }

    pub fn telemetry(&self) -> &Arc<dyn Telemetry> {
        &self.deps.telemetry
    }

    /// Handle one message turn, mutating `state` in place.
    ///
    /// Recognizer and knowledge-base failures are returned as errors; the
    /// caller must then discard `state` rather than persist it.
    pub async fn handle_turn(
        &self,
        ctx: &mut TurnContext<'_>,
        state: &mut ConversationState,
    ) -> Result<(), Error> {
        if state.has_active_form() {
            self.continue_form(ctx, state);
            return Ok(());
        }

        let classification = self.deps.recognizer.classify(ctx.text()).await?;
        let intent = classification.intent();
        debug!(key = %ctx.key(), intent = ?intent, "Dispatching message");

        match intent {
            Intent::CreateTicket => {
                self.deps.telemetry.track_event(events::RMA_TICKET_INTENT, &[]);
                self.create_ticket(&classification, ctx, state);
            }
            Intent::LookupTicket => {
                self.deps.telemetry.track_event(events::RMA_TICKET_INTENT, &[]);
                lookup_ticket(&classification, ctx, state);
            }
            Intent::ListTickets => {
                self.deps.telemetry.track_event(events::RMA_TICKET_INTENT, &[]);
                ctx.send(state.tickets.readout());
            }
            Intent::Faq => {
                self.deps.telemetry.track_event(events::RMA_FAQ_INTENT, &[]);
                self.answer_from(self.deps.faq.as_ref(), ctx).await?;
            }
            Intent::ChitChat => {
                self.deps.telemetry.track_event(events::CHITCHAT_INTENT, &[]);
                self.answer_from(self.deps.chit_chat.as_ref(), ctx).await?;
            }
            Intent::None | Intent::Unrecognized(_) => {
                self.deps.telemetry.track_event(
                    events::UNKNOWN_INTENT,
                    &[("label", classification.top_intent.as_str())],
                );
                ctx.send(messages::CONFUSED_MESSAGE);
                ctx.send(messages::GUIDANCE_MESSAGE);
            }
        }
        Ok(())
    }

    fn create_ticket(
        &self,
        classification: &IntentClassification,
        ctx: &mut TurnContext<'_>,
        state: &mut ConversationState,
    ) {
        let Some(product) = find_entities(PRODUCT_ENTITY, &classification.entities)
            .and_then(|values| values.first())
        else {
            ctx.send(messages::NO_PRODUCT_MESSAGE);
            return;
        };

        let mut seed = Collected::new();
        seed.insert(PRODUCT_FIELD.to_string(), product.clone());
        let status = self
            .engine
            .begin(RMA_TICKET_DIALOG, seed, &mut state.form, ctx);
        self.apply_status(status, ctx, state);
    }

    fn continue_form(&self, ctx: &mut TurnContext<'_>, state: &mut ConversationState) {
        let status = self.engine.resume(&mut state.form, ctx);
        self.apply_status(status, ctx, state);
    }

    fn apply_status(
        &self,
        status: Result<WaterfallStatus<TicketRecord>, DialogError>,
        ctx: &mut TurnContext<'_>,
        state: &mut ConversationState,
    ) {
        match status {
            Ok(WaterfallStatus::Waiting) => {}
            Ok(WaterfallStatus::Complete(ticket)) => {
                let stored = state.tickets.add(ticket);
                self.deps.telemetry.track_event(
                    events::TICKET_CREATED,
                    &[
                        ("ticket_id", stored.ticket_id.as_str()),
                        ("product", stored.product_name.as_str()),
                    ],
                );
                let summary = stored.to_summary();
                ctx.send(messages::NEW_TICKET_HEADER);
                ctx.send(summary);
            }
            Ok(WaterfallStatus::Cancelled) => {
                ctx.send(messages::TICKET_CANCELLED_MESSAGE);
            }
            Err(DialogError::Validation { field, reason }) => {
                debug!(field = %field, reason = %reason, "Form validation failed");
                state.form = None;
                ctx.send(validation_message(&field));
            }
            Err(e) => {
                warn!(key = %ctx.key(), "Resetting form session: {}", e);
                self.deps
                    .telemetry
                    .track_event(events::FORM_RESET, &[("reason", "corrupted")]);
                state.form = None;
                ctx.send(messages::FORM_RESTARTED_MESSAGE);
            }
        }
    }

    async fn answer_from(
        &self,
        kb: &dyn KnowledgeBase,
        ctx: &mut TurnContext<'_>,
    ) -> Result<(), Error> {
        let answers = kb
            .answer(ctx.text(), QNA_TOP_N, self.confidence_threshold)
            .await?;
        match best_answer(&answers, self.confidence_threshold) {
            Some(best) => {
                debug!(kb = kb.name(), confidence = best.confidence, "Answer found");
                ctx.send(best.answer.clone());
            }
            None => ctx.send(messages::NO_ANSWER_MESSAGE),
        }
        Ok(())
    }
}

/// Reply for a form that finished without a value for `field`.
fn validation_message(field: &str) -> String {
    match field {
        PRODUCT_FIELD => messages::NO_PRODUCT_MESSAGE.to_string(),
        REASON_FIELD => messages::missing_value("reason"),
        other => messages::missing_value(other),
    }
}

fn lookup_ticket(
    classification: &IntentClassification,
    ctx: &mut TurnContext<'_>,
    state: &ConversationState,
) {
    let Some(ticket_id) = find_entities(TICKET_ID_ENTITY, &classification.entities)
        .and_then(|values| values.first())
    else {
        ctx.send(messages::SPECIFY_TICKET_MESSAGE);
        return;
    };

    match state.tickets.get(ticket_id) {
        Some(ticket) => {
            ctx.send(messages::TICKET_STATUS_HEADER);
            ctx.send(ticket.to_detail());
        }
        None => ctx.send(messages::ticket_not_found(ticket_id)),
    }
}
