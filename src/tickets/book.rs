//! The per-conversation list of tickets.

use serde::{Deserialize, Serialize};

use super::model::{TicketRecord, generate_ticket_id};

/// Tickets created in one conversation, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketBook {
    tickets: Vec<TicketRecord>,
}

impl TicketBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TicketRecord> {
        self.tickets.iter()
    }

    /// Add a ticket, regenerating its id if it collides with an existing one.
    ///
    /// Returns the stored ticket.
    pub fn add(&mut self, mut ticket: TicketRecord) -> &TicketRecord {
        while self.get(&ticket.ticket_id).is_some() {
            ticket.ticket_id = generate_ticket_id();
        }
        self.tickets.push(ticket);
        &self.tickets[self.tickets.len() - 1]
    }

    /// Exact, case-insensitive lookup by ticket id.
    pub fn get(&self, ticket_id: &str) -> Option<&TicketRecord> {
        self.tickets.iter().find(|t| t.matches_id(ticket_id))
    }

    /// Numbered readout of every ticket.
    pub fn readout(&self) -> String {
        if self.tickets.is_empty() {
            return "You have not created any RMA tickets.".to_string();
        }
        self.tickets
            .iter()
            .enumerate()
            .map(|(i, t)| format!("{}. {}", i + 1, t.to_summary()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
