//! RMA tickets — the record a completed ticket form produces.

pub mod book;
pub mod model;

pub use book::TicketBook;
pub use model::{TicketRecord, TicketStatus, generate_ticket_id};
