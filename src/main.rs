use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};

use host_concierge::config::{EngineConfig, MemoryLimits};
use host_concierge::engine::ReplyEngine;
use host_concierge::memory::{InMemoryStore, JsonFileStore, MemoryStore};
use host_concierge::places::{Place, StaticPlaceDirectory};
use host_concierge::templates::TemplateSet;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let template_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("CONCIERGE_TEMPLATES").ok())
        .context("usage: host-concierge <templates.json> (or set CONCIERGE_TEMPLATES)")?;

    let json = std::fs::read_to_string(&template_path)
        .with_context(|| format!("failed to read {template_path}"))?;
    let set = TemplateSet::from_json(&json)?;

    // Memory lives in a directory when CONCIERGE_MEMORY_DIR is set,
    // otherwise in process memory only.
    let memory: Arc<dyn MemoryStore> = match std::env::var("CONCIERGE_MEMORY_DIR") {
        Ok(dir) => {
            eprintln!("   Memory: {dir}");
            Arc::new(JsonFileStore::open(dir, MemoryLimits::default()).await?)
        }
        Err(_) => Arc::new(InMemoryStore::default()),
    };

    let places = StaticPlaceDirectory::new()
        .add(
            &["restaurant", "dinner", "eat", "seafood"],
            Place {
                name: "Stingaree".into(),
                area: Some("Crystal Beach".into()),
            },
        )
        .add(
            &["coffee", "breakfast", "brunch", "cafe"],
            Place {
                name: "The Daily Grind".into(),
                area: None,
            },
        );

    let engine = ReplyEngine::new(set, memory, EngineConfig::default())
        .with_places(Arc::new(places));

    eprintln!("🏠 Host Concierge v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Templates: {template_path}");
    eprintln!("   Type a guest message and press Enter. /quit to exit.\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if text == "/quit" {
            break;
        }

        let message =
            host_concierge::types::Message::new("cli-conversation", "cli-guest", text, "cli");
        let outcome = engine.decide_reply(message).await;
        if let Err(e) = &outcome.storage {
            eprintln!("(memory write failed: {e})");
        }
        println!(
            "[{} / {}] {}",
            outcome.record.intent,
            outcome.record.disposition.label(),
            outcome.record.rendered_text
        );
    }

    Ok(())
}
