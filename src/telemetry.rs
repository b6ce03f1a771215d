//! Telemetry — named events reported by the turn pipeline.
//!
//! Injected into the dispatcher rather than held globally. Create it before
//! the first turn and call [`Telemetry::flush`] once on shutdown.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

/// Event names emitted by the bot.
pub mod events {
    pub const RMA_TICKET_INTENT: &str = "rma_ticket_intent";
    pub const RMA_FAQ_INTENT: &str = "rma_faq_intent";
    pub const CHITCHAT_INTENT: &str = "chitchat_intent";
    pub const UNKNOWN_INTENT: &str = "unknown_intent";
    pub const TICKET_CREATED: &str = "ticket_created";
    pub const FORM_RESET: &str = "form_reset";
}

/// Sink for telemetry events.
#[async_trait]
pub trait Telemetry: Send + Sync {
    fn track_event(&self, name: &str, properties: &[(&str, &str)]);

    /// Push out anything buffered.
    async fn flush(&self);
}

/// Writes events to the tracing subscriber and keeps per-event counts.
#[derive(Default)]
pub struct TracingTelemetry {
    counts: Mutex<BTreeMap<String, u64>>,
}

impl TracingTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times `name` has been tracked.
    pub fn count(&self, name: &str) -> u64 {
        self.counts
            .lock()
            .map(|c| c.get(name).copied().unwrap_or(0))
            .unwrap_or(0)
    }
}

#[async_trait]
impl Telemetry for TracingTelemetry {
    fn track_event(&self, name: &str, properties: &[(&str, &str)]) {
        if let Ok(mut counts) = self.counts.lock() {
            *counts.entry(name.to_string()).or_insert(0) += 1;
        }
        tracing::info!(event = name, properties = ?properties, "telemetry");
    }

    async fn flush(&self) {
        let summary = match self.counts.lock() {
            Ok(counts) => counts.clone(),
            Err(_) => return,
        };
        tracing::info!(events = ?summary, "Telemetry flushed");
    }
}
