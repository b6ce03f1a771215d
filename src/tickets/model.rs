//! RMA ticket record and its renderings.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::DialogError;

/// Prefix on every generated ticket id.
pub const TICKET_ID_PREFIX: &str = "NTL";

/// Lifecycle of an RMA ticket. Only `Created` is set by the bot itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Created,
    InProgress,
    Shipped,
    Closed,
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "Created"),
            Self::InProgress => write!(f, "In progress"),
            Self::Shipped => write!(f, "Shipped"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

/// A return-merchandise ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketRecord {
    pub ticket_id: String,
    pub product_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
}

impl TicketRecord {
    /// Create a ticket with a freshly generated id.
    ///
    /// Fails with a validation error when the product name is blank.
    pub fn new(product_name: &str, reason: Option<&str>) -> Result<Self, DialogError> {
        let product_name = product_name.trim();
        if product_name.is_empty() {
            return Err(DialogError::Validation {
                field: "productName".into(),
                reason: "no product name provided".into(),
            });
        }
        Ok(Self {
            ticket_id: generate_ticket_id(),
            product_name: product_name.to_string(),
            reason: reason
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(String::from),
            status: TicketStatus::Created,
            created_at: Utc::now(),
        })
    }

    /// Whether `id` names this ticket, ignoring case.
    pub fn matches_id(&self, id: &str) -> bool {
        self.ticket_id.eq_ignore_ascii_case(id.trim())
    }

    /// One-line summary: `NTL12345: laptop - Created`.
    pub fn to_summary(&self) -> String {
        format!("{}: {} - {}", self.ticket_id, self.product_name, self.status)
    }

    /// Multi-line status readout used for lookups.
    pub fn to_detail(&self) -> String {
        let mut lines = vec![
            format!("Ticket: {}", self.ticket_id),
            format!("Product: {}", self.product_name),
        ];
        if let Some(ref reason) = self.reason {
            lines.push(format!("Reason: {}", reason));
        }
        lines.push(format!(
            "Date requested: {}",
            self.created_at.format("%Y-%m-%d %H:%M UTC")
        ));
        lines.push(format!("Status: {}", self.status));
        lines.join("\n")
    }
}

/// `NTL` followed by five digits in 10000..=99999.
pub fn generate_ticket_id() -> String {
    let n: u32 = rand::thread_rng().gen_range(10_000..=99_999);
    format!("{TICKET_ID_PREFIX}{n}")
}
