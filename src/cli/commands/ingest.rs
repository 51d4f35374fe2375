//! `medirec ingest` — offline index construction.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use crate::infrastructure::config::Config;
use crate::infrastructure::embedding::build_embedder;
use crate::services::IngestService;

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// JSON-Lines file of checkup records (one object per line).
    #[arg(long)]
    pub records: Option<PathBuf>,

    /// Plain-text disease knowledge document (blank-line-separated pages).
    #[arg(long)]
    pub knowledge: Option<PathBuf>,
}

pub async fn execute(args: IngestArgs, config: &Config) -> Result<()> {
    if args.records.is_none() && args.knowledge.is_none() {
        bail!("nothing to ingest: pass --records and/or --knowledge");
    }

    let embedder = build_embedder(config.embedding_model()?, config.embedding.cache_dir.clone())
        .context("failed to initialize the embedding model")?;
    let ingest = IngestService::new(embedder, config.chunking.clone())?;

    if let Some(records) = args.records {
        let index = ingest
            .build_records_index(&records, &config.index.records_path)
            .await
            .context("records index build failed")?;
        println!(
            "records index: {} chunks at {}",
            index.len().await?,
            config.index.records_path.display()
        );
    }

    if let Some(knowledge) = args.knowledge {
        let index = ingest
            .build_knowledge_index(&knowledge, &config.index.knowledge_path)
            .await
            .context("knowledge index build failed")?;
        println!(
            "knowledge index: {} chunks at {}",
            index.len().await?,
            config.index.knowledge_path.display()
        );
    }

    Ok(())
}
