//! `medirec recommend` — one recommendation session.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;

use crate::domain::models::{Role, UserProfile};
use crate::infrastructure::completion::{AnthropicClient, CompletionConfig};
use crate::infrastructure::config::Config;
use crate::infrastructure::embedding::build_embedder;
use crate::infrastructure::index::VectorIndex;
use crate::services::{AgentConfig, RecommendationAgent, ToolRegistry};

#[derive(Debug, Args)]
pub struct RecommendArgs {
    /// Six-digit patient id.
    #[arg(long)]
    pub id: String,

    #[arg(long)]
    pub gender: String,

    #[arg(long)]
    pub age: u32,

    /// Height, e.g. "172cm".
    #[arg(long)]
    pub height: String,

    /// Weight, e.g. "80kg".
    #[arg(long)]
    pub weight: String,

    #[arg(long)]
    pub medical_history: String,

    #[arg(long)]
    pub symptoms: String,

    /// Print the full session transcript after the answer.
    #[arg(long, default_value_t = false)]
    pub transcript: bool,
}

/// Reject incomplete profiles before a session starts; the core treats
/// validation as the caller's responsibility.
fn validate(args: &RecommendArgs) -> Result<()> {
    let required = [
        ("id", &args.id),
        ("gender", &args.gender),
        ("height", &args.height),
        ("weight", &args.weight),
        ("medical-history", &args.medical_history),
        ("symptoms", &args.symptoms),
    ];

    for (name, value) in required {
        if value.trim().is_empty() {
            bail!("--{name} must not be empty");
        }
    }
    if args.age == 0 {
        bail!("--age must be positive");
    }

    Ok(())
}

pub async fn execute(args: RecommendArgs, config: &Config) -> Result<()> {
    validate(&args)?;

    let embedder = build_embedder(config.embedding_model()?, config.embedding.cache_dir.clone())
        .context("failed to initialize the embedding model")?;

    let records = VectorIndex::load(&config.index.records_path, Arc::clone(&embedder))
        .await
        .context("failed to load the records index (run `medirec ingest` first)")?;
    let knowledge = VectorIndex::load(&config.index.knowledge_path, Arc::clone(&embedder))
        .await
        .context("failed to load the knowledge index (run `medirec ingest` first)")?;

    let api_key = std::env::var("ANTHROPIC_API_KEY")
        .context("ANTHROPIC_API_KEY must be set for recommendations")?;
    let client = AnthropicClient::new(CompletionConfig {
        api_key,
        base_url: config.completion.base_url.clone(),
        model: config.completion.model.clone(),
        timeout_secs: config.completion.timeout_secs,
        max_retries: config.completion.max_retries,
        initial_backoff_ms: config.completion.initial_backoff_ms,
        max_backoff_ms: config.completion.max_backoff_ms,
    })?;

    let registry = ToolRegistry::standard(Arc::new(records), Arc::new(knowledge));
    let agent = RecommendationAgent::new(
        Arc::new(client),
        registry,
        AgentConfig {
            max_iterations: config.agent.max_iterations,
            max_tokens: config.completion.max_tokens,
            temperature: config.completion.temperature,
        },
    );

    let profile = UserProfile {
        id: args.id.clone(),
        gender: args.gender.clone(),
        age: args.age,
        height: args.height.clone(),
        weight: args.weight.clone(),
        medical_history: args.medical_history.clone(),
        symptoms: args.symptoms.clone(),
    };

    let outcome = agent.run(&profile).await;

    println!("{}", outcome.answer);

    if args.transcript {
        println!("\n--- transcript ---");
        for message in outcome.transcript.messages() {
            let role = match message.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
                Role::Tool => "tool",
            };
            println!("[{role}] {:?}", message.content);
        }
    }

    Ok(())
}
