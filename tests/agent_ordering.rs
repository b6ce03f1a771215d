//! Turn ordering through the full agent loop.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream;

use rosy_bot::agent::{Agent, TurnController};
use rosy_bot::channels::{Channel, ChannelManager, IncomingMessage, MessageStream, OutgoingResponse};
use rosy_bot::dialog::{DispatcherDeps, IntentDispatcher};
use rosy_bot::error::{ChannelError, RecognitionError, RetrievalError};
use rosy_bot::knowledge::{KnowledgeBase, QnaAnswer, StaticKnowledgeBase};
use rosy_bot::recognizer::{IntentClassification, Recognizer, labels};
use rosy_bot::store::MemoryStore;
use rosy_bot::telemetry::TracingTelemetry;

type Log = Arc<Mutex<Vec<String>>>;

/// Channel that emits a fixed batch of activities and records replies.
struct BurstChannel {
    activities: Vec<IncomingMessage>,
    replies: Log,
}

#[async_trait]
impl Channel for BurstChannel {
    fn name(&self) -> &str {
        "burst"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        Ok(Box::pin(stream::iter(self.activities.clone())))
    }

    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        tokio::task::yield_now().await;
        self.replies
            .lock()
            .unwrap()
            .push(format!("{}:{}", msg.conversation_id, response.content));
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}

/// Classifies everything as FAQ and records the order it saw texts in.
struct RecordingRecognizer {
    seen: Log,
}

#[async_trait]
impl Recognizer for RecordingRecognizer {
    fn name(&self) -> &str {
        "recording"
    }

    async fn classify(&self, text: &str) -> Result<IntentClassification, RecognitionError> {
        self.seen.lock().unwrap().push(text.to_string());
        tokio::task::yield_now().await;
        Ok(IntentClassification::new(labels::FAQ))
    }
}

/// Answers every question with the question itself.
struct EchoKb;

#[async_trait]
impl KnowledgeBase for EchoKb {
    fn name(&self) -> &str {
        "echo"
    }

    async fn answer(
        &self,
        question: &str,
        _top_n: usize,
        _threshold: f64,
    ) -> Result<Vec<QnaAnswer>, RetrievalError> {
        tokio::task::yield_now().await;
        Ok(vec![QnaAnswer::new(question, 1.0)])
    }
}

async fn run_agent(activities: Vec<IncomingMessage>) -> (Vec<String>, Vec<String>) {
    let seen = Log::default();
    let replies = Log::default();

    let dispatcher = IntentDispatcher::new(
        DispatcherDeps {
            recognizer: Arc::new(RecordingRecognizer { seen: seen.clone() }),
            faq: Arc::new(EchoKb),
            chit_chat: Arc::new(StaticKnowledgeBase::empty("chit-chat")),
            telemetry: Arc::new(TracingTelemetry::new()),
        },
        0.5,
    );
    let controller = TurnController::new(Arc::new(MemoryStore::new()), dispatcher);
    let mut channels = ChannelManager::new();
    channels.add(Box::new(BurstChannel {
        activities,
        replies: replies.clone(),
    }));

    Agent::new("rosy-bot", controller, channels).run().await.unwrap();

    let seen = seen.lock().unwrap().clone();
    let replies = replies.lock().unwrap().clone();
    (seen, replies)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn burst_on_one_conversation_is_handled_in_arrival_order() {
    let texts: Vec<String> = (0..200).map(|i| format!("m{i}")).collect();
    let activities = texts
        .iter()
        .map(|t| IncomingMessage::new("burst", "u", t))
        .collect();

    let (seen, replies) = run_agent(activities).await;

    assert_eq!(seen, texts);
    let expected: Vec<String> = texts.iter().map(|t| format!("u:{t}")).collect();
    assert_eq!(replies, expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn interleaved_conversations_each_keep_their_order() {
    let activities = (0..100)
        .flat_map(|i| {
            [
                IncomingMessage::new("burst", "a", &format!("a{i}")),
                IncomingMessage::new("burst", "b", &format!("b{i}")),
            ]
        })
        .collect();

    let (seen, replies) = run_agent(activities).await;
    assert_eq!(seen.len(), 200);
    assert_eq!(replies.len(), 200);

    for conversation in ["a", "b"] {
        let expected: Vec<String> = (0..100).map(|i| format!("{conversation}:{conversation}{i}")).collect();
        let got: Vec<String> = replies
            .iter()
            .filter(|r| r.starts_with(&format!("{conversation}:")))
            .cloned()
            .collect();
        assert_eq!(got, expected);
    }
}
