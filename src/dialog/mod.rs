//! Dialog layer: turn context, form sessions, the waterfall engine, and the
//! intent dispatcher that ties them to the recognizer and knowledge bases.

pub mod context;
pub mod dispatcher;
pub mod messages;
pub mod session;
pub mod step;
pub mod ticket_dialog;
pub mod waterfall;

pub use context::TurnContext;
pub use dispatcher::{DispatcherDeps, IntentDispatcher};
pub use session::{Collected, ConversationState, FormSession, SessionKey};
pub use step::{StepFn, StepOutcome};
pub use waterfall::{Waterfall, WaterfallEngine, WaterfallStatus};
