//! Main agent loop.
//!
//! Pulls activities off the merged channel stream and hands each to the
//! worker for its conversation. A worker owns a FIFO queue and runs one turn
//! at a time, delivering that turn's replies before taking the next, so a
//! conversation sees its turns in arrival order. Different conversations have
//! different workers and run concurrently.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::agent::turn::TurnController;
use crate::channels::{ChannelManager, IncomingMessage, OutgoingResponse};
use crate::dialog::{SessionKey, messages};
use crate::error::Error;

/// Queue handle for one conversation's worker.
struct ConversationWorker {
    tx: mpsc::UnboundedSender<IncomingMessage>,
    /// Activities queued or in progress. Only the loop increments it.
    pending: Arc<AtomicUsize>,
}

impl ConversationWorker {
    fn is_idle(&self) -> bool {
        self.pending.load(Ordering::Acquire) == 0
    }
}

/// The bot process: channels in, turn controller, channels out.
pub struct Agent {
    name: String,
    controller: Arc<TurnController>,
    channels: Arc<ChannelManager>,
}

impl Agent {
    pub fn new(name: impl Into<String>, controller: TurnController, channels: ChannelManager) -> Self {
        Self {
            name: name.into(),
            controller: Arc::new(controller),
            channels: Arc::new(channels),
        }
    }

    /// Run until Ctrl+C or until every channel stream ends.
    pub async fn run(self) -> Result<(), Error> {
        let mut message_stream = self.channels.start_all().await?;
        let mut workers: HashMap<SessionKey, ConversationWorker> = HashMap::new();
        let mut tasks = JoinSet::new();

        tracing::info!(
            channels = ?self.channels.names(),
            "Agent {} ready and listening",
            self.name
        );

        loop {
            let message = tokio::select! {
                biased;
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Ctrl+C received, shutting down...");
                    break;
                }
                msg = message_stream.next() => {
                    match msg {
                        Some(m) => m,
                        None => {
                            tracing::info!("All channel streams ended, shutting down...");
                            break;
                        }
                    }
                }
            };

            while let Some(finished) = tasks.try_join_next() {
                if let Err(e) = finished {
                    tracing::error!("Conversation worker failed: {}", e);
                }
            }

            self.enqueue(&mut workers, &mut tasks, message);
            prune_idle(&mut workers);
        }

        // Closing every queue lets each worker drain what it has and exit.
        drop(workers);
        while let Some(finished) = tasks.join_next().await {
            if let Err(e) = finished {
                tracing::error!("Conversation worker failed: {}", e);
            }
        }

        self.controller.dispatcher().telemetry().flush().await;
        self.channels.shutdown_all().await;
        tracing::info!("Agent {} stopped", self.name);
        Ok(())
    }

    /// Queue `message` behind earlier activities of its conversation.
    fn enqueue(
        &self,
        workers: &mut HashMap<SessionKey, ConversationWorker>,
        tasks: &mut JoinSet<()>,
        message: IncomingMessage,
    ) {
        let key = message.session_key();
        let message = match workers.get(&key) {
            Some(worker) => {
                worker.pending.fetch_add(1, Ordering::AcqRel);
                match worker.tx.send(message) {
                    Ok(()) => return,
                    Err(mpsc::error::SendError(message)) => {
                        tracing::warn!(key = %key, "Conversation worker gone, restarting it");
                        message
                    }
                }
            }
            None => message,
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let worker = ConversationWorker {
            tx,
            pending: Arc::new(AtomicUsize::new(1)),
        };
        tasks.spawn(run_worker(
            self.controller.clone(),
            self.channels.clone(),
            rx,
            worker.pending.clone(),
        ));
        if worker.tx.send(message).is_err() {
            tracing::error!(key = %key, "Conversation worker exited before its first turn");
            return;
        }
        tracing::debug!(key = %key, "Started conversation worker");
        workers.insert(key, worker);
    }
}

/// Drop the queues of conversations with nothing queued or running.
///
/// Only the loop sends, so an idle worker cannot receive anything between
/// the check and the drop; its `recv` then returns `None` and it exits.
fn prune_idle(workers: &mut HashMap<SessionKey, ConversationWorker>) {
    workers.retain(|_, worker| !worker.is_idle());
}

/// Run a conversation's turns one after another until its queue closes.
async fn run_worker(
    controller: Arc<TurnController>,
    channels: Arc<ChannelManager>,
    mut rx: mpsc::UnboundedReceiver<IncomingMessage>,
    pending: Arc<AtomicUsize>,
) {
    while let Some(message) = rx.recv().await {
        deliver_turn(&controller, &channels, &message).await;
        pending.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Run one turn and send its replies in order.
async fn deliver_turn(controller: &TurnController, channels: &ChannelManager, message: &IncomingMessage) {
    let key = message.session_key();
    let replies = match controller.on_turn(message).await {
        Ok(replies) => replies,
        Err(e) => {
            tracing::error!(key = %key, "Error handling message: {}", e);
            vec![OutgoingResponse::text(messages::GENERIC_FAILURE_MESSAGE)]
        }
    };

    for reply in replies {
        if let Err(e) = channels.respond(message, reply).await {
            tracing::warn!(key = %key, "Failed to deliver reply: {}", e);
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worker(pending: usize) -> (ConversationWorker, mpsc::UnboundedReceiver<IncomingMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = ConversationWorker {
            tx,
            pending: Arc::new(AtomicUsize::new(pending)),
        };
        (worker, rx)
    }

    #[tokio::test]
    async fn idle_worker_is_pruned_and_its_queue_closes() {
        let mut workers = HashMap::new();
        let (idle, mut idle_rx) = worker(0);
        let (busy, _busy_rx) = worker(2);
        workers.insert(SessionKey::new("cli", "idle"), idle);
        workers.insert(SessionKey::new("cli", "busy"), busy);

        prune_idle(&mut workers);

        assert!(!workers.contains_key(&SessionKey::new("cli", "idle")));
        assert!(workers.contains_key(&SessionKey::new("cli", "busy")));
        assert!(idle_rx.recv().await.is_none());
    }
}
