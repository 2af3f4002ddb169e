//! CLI entry-point for tagging a document batch.

use std::{path::PathBuf, sync::Arc};

use anyhow::{ensure, Context, Result};
use clap::Args as ClapArgs;
use tracing::{info, instrument, warn};

use crate::{
    config::Settings,
    data::{documents, export, hints},
    ontology::OntologySnapshot,
    pipeline::{DocStatus, DocumentPipeline, PipelineOptions},
    tagging::encoder::{self, HashedNgramEncoder, TextEncoder},
};

/// Args for the `tag` sub-command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    /// Document batch (JSONL); defaults to documents.jsonl in DATA_DIR.
    #[arg(long)]
    pub input: Option<PathBuf>,
    /// Ontology definition; defaults to ONTOLOGY_PATH.
    #[arg(long)]
    pub ontology: Option<PathBuf>,
    /// Optional LLM hint file (JSONL).
    #[arg(long)]
    pub llm_hints: Option<PathBuf>,
    /// Tagged JSONL destination; a CSV lands alongside it.
    #[arg(long)]
    pub out: Option<PathBuf>,
    /// Skip the embedding tagger entirely.
    #[arg(long, default_value_t = false)]
    pub lexical_only: bool,
    /// Override MAX_TAGS_PER_DOC.
    #[arg(long)]
    pub max_tags: Option<usize>,
    /// Override EMBEDDING_THRESHOLD.
    #[arg(long)]
    pub threshold: Option<f32>,
    /// Override TAG_CONCURRENCY.
    #[arg(long)]
    pub concurrency: Option<usize>,
}

#[instrument(skip(settings))]
pub async fn run(args: Args, settings: Settings) -> Result<()> {
    let ontology_path = args
        .ontology
        .unwrap_or_else(|| settings.ontology_path.clone());
    let snapshot = Arc::new(
        OntologySnapshot::load(&ontology_path)
            .with_context(|| format!("loading ontology from {}", ontology_path.display()))?,
    );

    let input = args
        .input
        .unwrap_or_else(|| settings.join_data("documents.jsonl"));
    let docs = documents::read_documents(&input)?;

    let doc_hints = match &args.llm_hints {
        Some(path) => hints::read_hints(path, &snapshot)?,
        None => Default::default(),
    };

    let mut options = PipelineOptions::from_settings(&settings);
    options.lexical_only = args.lexical_only;
    if let Some(max_tags) = args.max_tags {
        options.max_tags = max_tags;
    }
    if let Some(threshold) = args.threshold {
        ensure!(
            (0.0..=1.0).contains(&threshold),
            "--threshold must lie in [0, 1], got {threshold}"
        );
        options.embedding_threshold = threshold;
    }
    if let Some(concurrency) = args.concurrency {
        options.concurrency = concurrency;
    }

    let encoder: Arc<dyn TextEncoder> = match encoder::load_encoder(&settings) {
        Ok(encoder) => encoder,
        Err(err) => {
            warn!(error = %err, "configured encoder unavailable; continuing with hashed n-grams");
            Arc::new(HashedNgramEncoder::new(settings.embedding_dimension))
        }
    };

    let pipeline = DocumentPipeline::build_with_fallback(snapshot, encoder, options);
    info!(
        documents = docs.len(),
        hinted = doc_hints.len(),
        version = pipeline.snapshot().version(),
        concurrency = pipeline.options().concurrency,
        "tagging batch"
    );
    let records = pipeline.tag_batch(&docs, &doc_hints).await;

    let jsonl_path = args.out.unwrap_or_else(|| settings.join_output("tagged.jsonl"));
    let csv_path = jsonl_path.with_extension("csv");
    export::write_jsonl(&records, &jsonl_path)?;
    export::write_csv(&records, &csv_path)?;

    let ok = records.iter().filter(|r| r.status == DocStatus::Ok).count();
    let degraded = records
        .iter()
        .filter(|r| r.status == DocStatus::Degraded)
        .count();
    let failed = records
        .iter()
        .filter(|r| r.status == DocStatus::Failed)
        .count();
    println!(
        "tagged {} documents: {ok} ok, {degraded} degraded, {failed} failed",
        records.len()
    );
    println!("outputs: {} and {}", jsonl_path.display(), csv_path.display());
    Ok(())
}
