//! User-facing text.

use crate::channels::{Attachment, OutgoingResponse};

pub const GREETING_MESSAGE: &str = "Hi, I'm Rosy the bot!";

pub const GUIDANCE_MESSAGE: &str = "You can ask me FAQs or tell me to 'create an RMA ticket for a laptop' or 'Lookup RMA ticket NTL12345'";

pub const CONFUSED_MESSAGE: &str = "I don't understand. Can you please rephrase?";

pub const NO_PRODUCT_MESSAGE: &str = "No product name provided. Please try again.";

pub const SPECIFY_TICKET_MESSAGE: &str = "Please specify a ticket ID";

pub const NEW_TICKET_HEADER: &str = "Here is the status of your new RMA ticket:";

pub const TICKET_STATUS_HEADER: &str = "Here is the status of your RMA ticket:";

pub const TICKET_CANCELLED_MESSAGE: &str = "Okay, I've cancelled your RMA ticket.";

pub const NO_ANSWER_MESSAGE: &str = "No answer found in the knowledge base.";

pub const FORM_RESTARTED_MESSAGE: &str =
    "Sorry, something went wrong with your RMA ticket form, so I've restarted it.";

pub const GENERIC_FAILURE_MESSAGE: &str = "Sorry, something went wrong. Please try again later.";

const GREETING_CARD: &str = include_str!("../../assets/greeting_card.json");

pub fn ticket_not_found(ticket_id: &str) -> String {
    format!("I couldn't find an RMA ticket with the ID {ticket_id}")
}

pub fn missing_value(what: &str) -> String {
    format!("No {what} provided. Please try again.")
}

/// Welcome payload sent to members joining a conversation.
pub fn welcome_response() -> OutgoingResponse {
    let response = OutgoingResponse::text(format!("{GREETING_MESSAGE}\n{GUIDANCE_MESSAGE}"));
    match serde_json::from_str(GREETING_CARD) {
        Ok(card) => response.with_attachment(Attachment::adaptive_card(card)),
        Err(e) => {
            tracing::warn!("Greeting card is not valid JSON, sending text only: {}", e);
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn welcome_has_card_and_fallback_text() {
        let welcome = welcome_response();
        assert!(welcome.content.starts_with(GREETING_MESSAGE));
        assert_eq!(welcome.attachments.len(), 1);
        assert_eq!(welcome.attachments[0].content_type, Attachment::ADAPTIVE_CARD);
        assert_eq!(welcome.attachments[0].content["type"], "AdaptiveCard");
    }

    #[test]
    fn not_found_names_the_id() {
        assert_eq!(
            ticket_not_found("NTL99999"),
            "I couldn't find an RMA ticket with the ID NTL99999"
        );
    }
}
