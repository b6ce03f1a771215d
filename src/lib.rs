//! Rosy — an RMA support bot.
//!
//! Routes utterances to ticket creation, ticket lookup, FAQ and chit-chat
//! handlers, and keeps multi-turn form state per conversation.

pub mod agent;
pub mod channels;
pub mod config;
pub mod dialog;
pub mod error;
pub mod knowledge;
pub mod recognizer;
pub mod store;
pub mod telemetry;
pub mod tickets;
