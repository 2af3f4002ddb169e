//! Runtime configuration utilities for foa-tagger.

use std::{
    env,
    path::{Path, PathBuf},
};

use anyhow::{ensure, Context};
use serde::Deserialize;

/// Application configuration resolved from `.env` and defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Ontology definition file (YAML or JSON).
    pub ontology_path: PathBuf,
    /// Root folder for input document batches.
    pub data_dir: PathBuf,
    /// Root folder for tagging and evaluation artefacts.
    pub outputs_dir: PathBuf,
    /// Embedding backend identifier (`hashed-ngram`, or `fastembed` when
    /// compiled with the `embeddings` feature).
    pub embedding_backend: String,
    /// Vector width for the hashed n-gram backend.
    pub embedding_dimension: usize,
    /// Minimum cosine similarity for an embedding candidate.
    pub embedding_threshold: f32,
    /// Single-method confidence needed to survive fusion alone.
    pub high_confidence_cutoff: f32,
    /// Minimum lexical confidence worth emitting.
    pub lexical_floor: f32,
    /// Raw lexical score that saturates confidence at 1.0.
    pub lexical_cap: f32,
    /// Maximum fused tags kept per document.
    pub max_tags_per_doc: usize,
    /// Upper bound on one encoder call, in milliseconds.
    pub encode_timeout_ms: u64,
    /// Documents tagged concurrently in a batch run.
    pub tag_concurrency: usize,
}

impl Settings {
    /// Load configuration from environment with reasonable defaults.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let ontology_path = env::var("ONTOLOGY_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./config/ontology.yaml"));
        let data_dir = env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));
        let outputs_dir = env::var("OUTPUTS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./outputs"));
        let embedding_backend =
            env::var("EMBEDDING_BACKEND").unwrap_or_else(|_| "hashed-ngram".to_string());
        let embedding_dimension = parse_env("EMBEDDING_DIMENSION", 384usize);
        let embedding_threshold = parse_env("EMBEDDING_THRESHOLD", 0.35f32);
        let high_confidence_cutoff = parse_env("HIGH_CONFIDENCE_CUTOFF", 0.75f32);
        let lexical_floor = parse_env("LEXICAL_FLOOR", 0.15f32);
        let lexical_cap = parse_env("LEXICAL_CAP", 6.0f32);
        let max_tags_per_doc = parse_env("MAX_TAGS_PER_DOC", 10usize);
        let encode_timeout_ms = parse_env("ENCODE_TIMEOUT_MS", 5_000u64);
        let tag_concurrency = parse_env("TAG_CONCURRENCY", 4usize);

        for (name, value) in [
            ("EMBEDDING_THRESHOLD", embedding_threshold),
            ("HIGH_CONFIDENCE_CUTOFF", high_confidence_cutoff),
            ("LEXICAL_FLOOR", lexical_floor),
        ] {
            ensure!(
                (0.0..=1.0).contains(&value),
                "{name} must lie in [0, 1], got {value}"
            );
        }
        ensure!(lexical_cap > 0.0, "LEXICAL_CAP must be positive");
        ensure!(embedding_dimension > 0, "EMBEDDING_DIMENSION must be positive");
        ensure!(tag_concurrency > 0, "TAG_CONCURRENCY must be positive");

        std::fs::create_dir_all(&data_dir).context("creating data dir")?;
        std::fs::create_dir_all(&outputs_dir).context("creating outputs dir")?;

        Ok(Self {
            ontology_path,
            data_dir,
            outputs_dir,
            embedding_backend,
            embedding_dimension,
            embedding_threshold,
            high_confidence_cutoff,
            lexical_floor,
            lexical_cap,
            max_tags_per_doc,
            encode_timeout_ms,
            tag_concurrency,
        })
    }

    /// Convenience helper for derived input path segments.
    pub fn join_data<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        self.data_dir.join(path)
    }

    /// Convenience helper for derived output path segments.
    pub fn join_output<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        self.outputs_dir.join(path)
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
