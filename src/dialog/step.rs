//! Step function protocol.

use super::session::Collected;

/// What a waterfall step decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Ask the user a question; the form waits on this step for a reply.
    Prompt { text: String, field: String },
    /// Move to the next step with the updated fields.
    Advance(Collected),
    /// The form is done.
    Complete(Collected),
}

impl StepOutcome {
    pub fn prompt(text: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Prompt {
            text: text.into(),
            field: field.into(),
        }
    }
}

/// A single waterfall step.
///
/// Receives the fields collected so far and, when the form is resuming on this
/// step, the user's reply. Steps reached by chaining within a turn get `None`.
pub type StepFn = fn(&Collected, Option<&str>) -> StepOutcome;

/// Common step body: fill `field` from the reply, keep an existing value, or
/// ask `prompt`.
///
/// A blank reply counts as no reply, so the prompt is issued again.
pub fn fill_field(
    collected: &Collected,
    reply: Option<&str>,
    field: &str,
    prompt: impl FnOnce() -> String,
) -> StepOutcome {
    if let Some(answer) = reply.map(str::trim).filter(|r| !r.is_empty()) {
        let mut next = collected.clone();
        next.insert(field.to_string(), answer.to_string());
        return StepOutcome::Advance(next);
    }
    let already_filled = collected.get(field).is_some_and(|v| !v.trim().is_empty());
    if already_filled && reply.is_none() {
        return StepOutcome::Advance(collected.clone());
    }
    StepOutcome::prompt(prompt(), field)
}
