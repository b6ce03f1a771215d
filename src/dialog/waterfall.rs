//! Waterfall engine — runs an ordered list of steps across turns.
//!
//! The engine owns no per-conversation state. Callers pass the
//! conversation's form slot (`Option<FormSession>`) in; the engine computes
//! the next session on a copy and only writes it back once every step for
//! the turn has run without error.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::error::DialogError;

use super::context::TurnContext;
use super::session::{Collected, FormSession};
use super::step::{StepFn, StepOutcome};

/// Replies that abandon the active form.
const CANCEL_REPLIES: &[&str] = &["cancel", "stop", "quit", "never mind", "nevermind"];

/// Builds the domain record once the final step completes.
pub type FinishFn<R> = fn(&Collected) -> Result<R, DialogError>;

/// A registered waterfall definition.
pub struct Waterfall<R> {
    steps: Vec<StepFn>,
    finish: FinishFn<R>,
}

impl<R> Waterfall<R> {
    pub fn new(steps: Vec<StepFn>, finish: FinishFn<R>) -> Self {
        Self { steps, finish }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Where the form stands after a turn.
#[derive(Debug, Clone, PartialEq)]
pub enum WaterfallStatus<R> {
    /// A prompt was sent; the form waits for the next reply.
    Waiting,
    /// The final step completed and produced a record. The form is cleared.
    Complete(R),
    /// The user abandoned the form. The form is cleared.
    Cancelled,
}

/// Registry of waterfall definitions plus the stepping logic.
pub struct WaterfallEngine<R> {
    dialogs: HashMap<String, Waterfall<R>>,
}

impl<R> WaterfallEngine<R> {
    pub fn new() -> Self {
        Self {
            dialogs: HashMap::new(),
        }
    }

    /// Register a waterfall under `dialog_id`, replacing any earlier one.
    pub fn register(&mut self, dialog_id: &str, waterfall: Waterfall<R>) {
        debug!(dialog = dialog_id, steps = waterfall.len(), "Registered waterfall");
        self.dialogs.insert(dialog_id.to_string(), waterfall);
    }

    /// Start a form at step 0 with `seed` pre-filled.
    ///
    /// Fails with `FormAlreadyActive` if the slot already holds a form.
    pub fn begin(
        &self,
        dialog_id: &str,
        seed: Collected,
        form: &mut Option<FormSession>,
        ctx: &mut TurnContext<'_>,
    ) -> Result<WaterfallStatus<R>, DialogError> {
        if let Some(active) = form.as_ref() {
            return Err(DialogError::FormAlreadyActive(active.dialog_id.clone()));
        }
        let waterfall = self
            .dialogs
            .get(dialog_id)
            .ok_or_else(|| DialogError::UnknownDialog(dialog_id.to_string()))?;

        info!(dialog = dialog_id, key = %ctx.key(), "Beginning form");
        let session = FormSession::new(dialog_id, seed);
        self.run(waterfall, session, None, form, ctx)
    }

    /// Feed the current message to the step the active form is waiting on.
    pub fn resume(
        &self,
        form: &mut Option<FormSession>,
        ctx: &mut TurnContext<'_>,
    ) -> Result<WaterfallStatus<R>, DialogError> {
        let session = form.clone().ok_or(DialogError::NoActiveForm)?;
        let waterfall = self.dialogs.get(&session.dialog_id).ok_or_else(|| {
            DialogError::CorruptedSession {
                dialog_id: session.dialog_id.clone(),
                step_index: session.step_index,
                reason: "dialog is not registered".into(),
            }
        })?;
        if session.step_index >= waterfall.len() {
            return Err(corrupted(&session, waterfall.len()));
        }

        let reply = ctx.text().to_string();
        if is_cancel_reply(&reply) {
            info!(dialog = %session.dialog_id, key = %ctx.key(), "Form cancelled by user");
            *form = None;
            return Ok(WaterfallStatus::Cancelled);
        }

        debug!(
            dialog = %session.dialog_id,
            step = session.step_index,
            "Resuming form"
        );
        self.run(waterfall, session, Some(reply.as_str()), form, ctx)
    }

    /// Step until a prompt, completion, or error. Commits to `form`/`ctx` only on success.
    fn run(
        &self,
        waterfall: &Waterfall<R>,
        mut session: FormSession,
        mut reply: Option<&str>,
        form: &mut Option<FormSession>,
        ctx: &mut TurnContext<'_>,
    ) -> Result<WaterfallStatus<R>, DialogError> {
        loop {
            let step = waterfall
                .steps
                .get(session.step_index)
                .ok_or_else(|| corrupted(&session, waterfall.len()))?;

            match step(&session.collected, reply.take()) {
                StepOutcome::Prompt { text, field } => {
                    debug!(
                        dialog = %session.dialog_id,
                        step = session.step_index,
                        field = %field,
                        "Step prompted"
                    );
                    session.awaiting = Some(field);
                    *form = Some(session);
                    ctx.send(text);
                    return Ok(WaterfallStatus::Waiting);
                }
                StepOutcome::Advance(collected) => {
                    session.collected = collected;
                    session.step_index += 1;
                    session.awaiting = None;
                }
                StepOutcome::Complete(collected) => {
                    let record = (waterfall.finish)(&collected)?;
                    info!(dialog = %session.dialog_id, "Form complete");
                    *form = None;
                    return Ok(WaterfallStatus::Complete(record));
                }
            }
        }
    }
}

impl<R> Default for WaterfallEngine<R> {
    fn default() -> Self {
        Self::new()
    }
}

fn corrupted(session: &FormSession, len: usize) -> DialogError {
    DialogError::CorruptedSession {
        dialog_id: session.dialog_id.clone(),
        step_index: session.step_index,
        reason: format!("waterfall has {len} steps"),
    }
}

/// Whether a reply abandons the active form.
pub fn is_cancel_reply(reply: &str) -> bool {
    let normalized = reply.trim().trim_end_matches(['.', '!']).to_lowercase();
    CANCEL_REPLIES.contains(&normalized.as_str())
}
