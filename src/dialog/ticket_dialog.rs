//! The RMA ticket form: product, then reason, then create.

use crate::error::DialogError;
use crate::tickets::TicketRecord;

use super::session::Collected;
use super::step::{StepOutcome, fill_field};
use super::waterfall::Waterfall;

/// Dialog id of the ticket waterfall.
pub const RMA_TICKET_DIALOG: &str = "rma_ticket";

pub const PRODUCT_FIELD: &str = "productName";
pub const REASON_FIELD: &str = "reason";

/// The ticket waterfall definition.
pub fn rma_ticket_waterfall() -> Waterfall<TicketRecord> {
    Waterfall::new(vec![product_step, reason_step, create_step], build_ticket)
}

fn product_step(collected: &Collected, reply: Option<&str>) -> StepOutcome {
    fill_field(collected, reply, PRODUCT_FIELD, || {
        "What product would you like to return?".to_string()
    })
}

fn reason_step(collected: &Collected, reply: Option<&str>) -> StepOutcome {
    fill_field(collected, reply, REASON_FIELD, || {
        let product = collected
            .get(PRODUCT_FIELD)
            .map(String::as_str)
            .unwrap_or("product");
        format!("What is the reason you are returning the {product}?")
    })
}

fn create_step(collected: &Collected, _reply: Option<&str>) -> StepOutcome {
    StepOutcome::Complete(collected.clone())
}

fn build_ticket(collected: &Collected) -> Result<TicketRecord, DialogError> {
    let product = collected
        .get(PRODUCT_FIELD)
        .ok_or_else(|| DialogError::Validation {
            field: PRODUCT_FIELD.into(),
            reason: "no product name provided".into(),
        })?;
    TicketRecord::new(product, collected.get(REASON_FIELD).map(String::as_str))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tickets::TicketStatus;

    fn seeded(product: &str) -> Collected {
        let mut c = Collected::new();
        c.insert(PRODUCT_FIELD.into(), product.into());
        c
    }

    #[test]
    fn product_already_extracted_advances() {
        let c = seeded("laptop");
        assert_eq!(product_step(&c, None), StepOutcome::Advance(c.clone()));
    }

    #[test]
    fn reason_prompt_names_the_product() {
        let c = seeded("laptop");
        assert_eq!(
            reason_step(&c, None),
            StepOutcome::prompt("What is the reason you are returning the laptop?", REASON_FIELD)
        );
    }

    #[test]
    fn reason_reply_is_recorded() {
        let c = seeded("laptop");
        match reason_step(&c, Some("it's defective")) {
            StepOutcome::Advance(next) => {
                assert_eq!(next[REASON_FIELD], "it's defective");
                assert_eq!(next[PRODUCT_FIELD], "laptop");
            }
            other => panic!("expected advance, got {other:?}"),
        }
    }

    #[test]
    fn finish_builds_created_ticket() {
        let mut c = seeded("laptop");
        c.insert(REASON_FIELD.into(), "it's defective".into());
        let ticket = build_ticket(&c).unwrap();
        assert_eq!(ticket.status, TicketStatus::Created);
        assert_eq!(ticket.reason.as_deref(), Some("it's defective"));
        assert!(ticket.ticket_id.starts_with("NTL"));
    }

    #[test]
    fn finish_without_product_fails_validation() {
        let err = build_ticket(&Collected::new()).unwrap_err();
        assert!(matches!(err, DialogError::Validation { .. }));
    }

    #[test]
    fn waterfall_has_three_steps() {
        assert_eq!(rma_ticket_waterfall().len(), 3);
    }
}
