//! CLI channel — stdin/stdout REPL for local testing.

use async_trait::async_trait;
use futures::stream;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::channels::{
    Channel, ChannelAccount, IncomingMessage, MessageStream, OutgoingResponse,
};
use crate::error::ChannelError;

const CLI_USER: &str = "local-user";

/// A simple CLI channel that reads from stdin and writes to stdout.
///
/// Emits a member-added activity first so the bot greets the local user.
pub struct CliChannel {
    bot_id: String,
}

impl CliChannel {
    pub fn new(bot_id: impl Into<String>) -> Self {
        Self {
            bot_id: bot_id.into(),
        }
    }
}

#[async_trait]
impl Channel for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let bot_id = self.bot_id.clone();

        let join = IncomingMessage::members_added(
            "cli",
            CLI_USER,
            vec![ChannelAccount::new(bot_id.clone()), ChannelAccount::new(CLI_USER)],
        )
        .with_recipient(bot_id.clone());
        tx.send(join).map_err(|e| ChannelError::StartupFailed {
            name: "cli".into(),
            reason: e.to_string(),
        })?;

        tokio::spawn(async move {
            let stdin = tokio::io::stdin();
            let reader = BufReader::new(stdin);
            let mut lines = reader.lines();

            eprint!("> ");

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim().to_string();
                        if line.is_empty() {
                            eprint!("> ");
                            continue;
                        }
                        let msg = IncomingMessage::new("cli", CLI_USER, &line)
                            .with_recipient(bot_id.clone());
                        if tx.send(msg).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break, // EOF
                    Err(e) => {
                        tracing::error!("Error reading stdin: {}", e);
                        break;
                    }
                }
            }
        });

        let stream = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn respond(
        &self,
        _msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        // Cards can't render in a terminal; their text fallback is the content.
        println!("\n{}\n", response.content);
        eprint!("> ");
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}
