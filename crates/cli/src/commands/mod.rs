//! Subcommand implementations and the shared agent wiring.

pub mod ask;
pub mod config_cmd;
pub mod gateway;

use neurocite_agent::Agent;
use neurocite_config::AppConfig;
use neurocite_core::event::EventBus;
use neurocite_providers::router::build_from_config;
use neurocite_retrieval::{JsonlCorpus, ProviderEmbedder, SqliteStructuredStore};
use neurocite_tools::{KnowledgeSources, ToolSettings, default_registry};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Load configuration, exiting early with setup help when no key is set.
pub fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if !config.has_api_key() && config.default_provider != "ollama" {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    NEUROCITE_API_KEY=sk-...   (generic)");
        eprintln!("    OPENAI_API_KEY=sk-...      (for OpenAI direct)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    Ok(config)
}

/// Build the agent: providers, the corpus, the compound store and the
/// tool registry, all shared read-only.
pub async fn build_agent(
    config: &AppConfig,
    event_bus: Arc<EventBus>,
) -> Result<Agent, Box<dyn std::error::Error>> {
    let router = build_from_config(config);
    let provider = router
        .chain(Duration::from_secs(config.agent.request_timeout_secs))
        .ok_or("No provider configured")?;

    let corpus = Arc::new(JsonlCorpus::open(Path::new(&config.retrieval.corpus_path))?);
    if corpus.is_empty() {
        warn!(path = %config.retrieval.corpus_path, "Corpus is empty; every answer will be low confidence");
    }

    let structured = Arc::new(SqliteStructuredStore::new(&config.warehouse.sqlite_path).await?);

    let sources = KnowledgeSources {
        embedder: Arc::new(ProviderEmbedder::new(
            provider.clone(),
            config.retrieval.embedding_model.clone(),
        )),
        index: corpus.clone(),
        documents: corpus.clone(),
        structured,
    };
    let settings = ToolSettings {
        top_k: config.agent.top_k,
        max_snippet_chars: config.agent.max_snippet_chars,
        lookup_limit: config.warehouse.lookup_limit,
    };
    let tools = Arc::new(default_registry(&sources, &settings));

    info!(
        provider = %config.default_provider,
        model = %config.default_model,
        documents = corpus.len(),
        tools = tools.len(),
        "Agent ready"
    );

    Ok(Agent::from_config(config, provider, tools, event_bus))
}
