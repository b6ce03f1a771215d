//! Turn context — the activity being handled plus the replies it produced.

use crate::channels::{IncomingMessage, OutgoingResponse};

use super::session::SessionKey;

/// Per-turn context handed to the dispatcher and the waterfall engine.
///
/// Replies are buffered in the order issued and delivered by the caller after
/// the turn's state has been persisted.
pub struct TurnContext<'a> {
    activity: &'a IncomingMessage,
    key: SessionKey,
    replies: Vec<OutgoingResponse>,
}

impl<'a> TurnContext<'a> {
    pub fn new(activity: &'a IncomingMessage) -> Self {
        Self {
            key: activity.session_key(),
            activity,
            replies: Vec::new(),
        }
    }

    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    /// Text of the incoming message, empty for non-message activities.
    pub fn text(&self) -> &str {
        self.activity.text().unwrap_or_default()
    }

    pub fn send(&mut self, text: impl Into<String>) {
        self.replies.push(OutgoingResponse::text(text));
    }

    pub fn replies(&self) -> &[OutgoingResponse] {
        &self.replies
    }

    pub fn into_replies(self) -> Vec<OutgoingResponse> {
        self.replies
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replies_keep_issue_order() {
        let msg = IncomingMessage::new("cli", "u", "hello");
        let mut ctx = TurnContext::new(&msg);
        ctx.send("one");
        ctx.send("two");
        assert_eq!(ctx.text(), "hello");
        assert_eq!(ctx.key().to_string(), "cli/u");
        let contents: Vec<String> = ctx.into_replies().into_iter().map(|r| r.content).collect();
        assert_eq!(contents, ["one", "two"]);
    }
}
