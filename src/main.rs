use std::sync::Arc;

use anyhow::Context;

use rosy_bot::agent::{Agent, TurnController};
use rosy_bot::channels::{ChannelManager, CliChannel};
use rosy_bot::config::BotConfig;
use rosy_bot::dialog::{DispatcherDeps, IntentDispatcher};
use rosy_bot::knowledge::create_knowledge_base;
use rosy_bot::recognizer::create_recognizer;
use rosy_bot::store::{LibSqlStore, MemoryStore, StateStore};
use rosy_bot::telemetry::TracingTelemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = BotConfig::from_env().context("Invalid configuration")?;

    eprintln!("🤖 {} v{}", config.name, env!("CARGO_PKG_VERSION"));

    // ── State store ─────────────────────────────────────────────────────
    let store: Arc<dyn StateStore> = match &config.db_path {
        Some(path) => {
            let store = LibSqlStore::new_local(path)
                .await
                .with_context(|| format!("Failed to open database at {}", path.display()))?;
            eprintln!("   Database: {}", path.display());
            Arc::new(store)
        }
        None => {
            eprintln!("   Database: in-memory (set ROSY_DB_PATH to persist)");
            Arc::new(MemoryStore::new())
        }
    };

    // ── Collaborators ───────────────────────────────────────────────────
    let recognizer = create_recognizer(&config.recognizer, config.request_timeout)?;
    let faq = create_knowledge_base(config.faq.as_ref(), "rma-faq", config.request_timeout).await?;
    let chit_chat =
        create_knowledge_base(config.chit_chat.as_ref(), "chit-chat", config.request_timeout)
            .await?;
    eprintln!("   Recognizer: {}", recognizer.name());
    eprintln!("   Knowledge bases: {}, {}", faq.name(), chit_chat.name());
    eprintln!("   Type a message and press Enter. Ctrl+C to exit.\n");

    let dispatcher = IntentDispatcher::new(
        DispatcherDeps {
            recognizer,
            faq,
            chit_chat,
            telemetry: Arc::new(TracingTelemetry::new()),
        },
        config.confidence_threshold,
    );
    let controller = TurnController::new(store, dispatcher);

    // ── Channels ────────────────────────────────────────────────────────
    let mut channels = ChannelManager::new();
    channels.add(Box::new(CliChannel::new(config.bot_id.clone())));

    Agent::new(config.name, controller, channels).run().await?;
    Ok(())
}
