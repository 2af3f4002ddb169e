//! Per-document tagging pipeline and batch orchestration.
//!
//! A [`DocumentPipeline`] is immutable for its lifetime and bound to one
//! ontology snapshot; reloading builds a fresh pipeline and swaps it
//! into the [`PipelineHandle`], so batches in flight finish on the
//! snapshot they started with.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
    time::Duration,
};

use chrono::{DateTime, Utc};
use futures::{stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::{task, time::timeout};
use tracing::{debug, warn};

use crate::{
    config::Settings,
    data::documents::DocumentRecord,
    ontology::OntologySnapshot,
    tagging::{
        embedding::{EmbeddingTagger, ReferenceTable},
        encoder::{EmbeddingUnavailableError, TextEncoder},
        fusion::{self, FusedTag, FusionConfig},
        lexical::LexicalTagger,
        TagCandidate,
    },
};

/// Outcome class for one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocStatus {
    /// Every configured method ran.
    Ok,
    /// Embedding was unavailable; tags are lexical/hint-only.
    Degraded,
    /// No trustworthy tags could be produced.
    Failed,
}

impl DocStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocStatus::Ok => "ok",
            DocStatus::Degraded => "degraded",
            DocStatus::Failed => "failed",
        }
    }
}

/// Final artefact for one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaggedRecord {
    pub doc_id: String,
    pub status: DocStatus,
    pub tags: Vec<FusedTag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub generated_at: DateTime<Utc>,
}

/// Tuning knobs lifted out of [`Settings`].
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub embedding_threshold: f32,
    pub high_confidence_cutoff: f32,
    pub lexical_floor: f32,
    pub lexical_cap: f32,
    pub max_tags: usize,
    pub encode_timeout: Duration,
    pub concurrency: usize,
    pub lexical_only: bool,
}

impl PipelineOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            embedding_threshold: settings.embedding_threshold,
            high_confidence_cutoff: settings.high_confidence_cutoff,
            lexical_floor: settings.lexical_floor,
            lexical_cap: settings.lexical_cap,
            max_tags: settings.max_tags_per_doc,
            encode_timeout: Duration::from_millis(settings.encode_timeout_ms),
            concurrency: settings.tag_concurrency,
            lexical_only: false,
        }
    }
}

enum EmbeddingMode {
    Enabled(Arc<EmbeddingTagger>),
    DisabledByConfig,
    Unavailable(String),
}

/// Immutable tagging unit for one ontology snapshot.
pub struct DocumentPipeline {
    snapshot: Arc<OntologySnapshot>,
    lexical: LexicalTagger,
    embedding: EmbeddingMode,
    options: PipelineOptions,
}

impl DocumentPipeline {
    /// Build taggers for a snapshot; fails when the reference table
    /// cannot be built and embedding was requested.
    pub fn build(
        snapshot: Arc<OntologySnapshot>,
        encoder: Arc<dyn TextEncoder>,
        options: PipelineOptions,
    ) -> Result<Self, EmbeddingUnavailableError> {
        let lexical = LexicalTagger::new(
            Arc::clone(&snapshot),
            options.lexical_floor,
            options.lexical_cap,
        );
        let embedding = if options.lexical_only {
            EmbeddingMode::DisabledByConfig
        } else {
            let table = ReferenceTable::build(&snapshot, encoder.as_ref())?;
            EmbeddingMode::Enabled(Arc::new(EmbeddingTagger::new(
                Arc::new(table),
                encoder,
                options.embedding_threshold,
            )))
        };
        Ok(Self {
            snapshot,
            lexical,
            embedding,
            options,
        })
    }

    /// Like [`DocumentPipeline::build`], but a reference-table failure
    /// degrades the whole run to lexical-only instead of erroring.
    pub fn build_with_fallback(
        snapshot: Arc<OntologySnapshot>,
        encoder: Arc<dyn TextEncoder>,
        options: PipelineOptions,
    ) -> Self {
        match Self::build(Arc::clone(&snapshot), encoder, options.clone()) {
            Ok(pipeline) => pipeline,
            Err(err) => {
                warn!(error = %err, "embedding backend unavailable; tagging lexical-only");
                let lexical = LexicalTagger::new(
                    Arc::clone(&snapshot),
                    options.lexical_floor,
                    options.lexical_cap,
                );
                Self {
                    snapshot,
                    lexical,
                    embedding: EmbeddingMode::Unavailable(err.to_string()),
                    options,
                }
            }
        }
    }

    pub fn snapshot(&self) -> &Arc<OntologySnapshot> {
        &self.snapshot
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Tag one document: lexical and embedding scoring overlap, then
    /// fusion joins them with any LLM hints supplied for the document.
    pub async fn tag_document(&self, doc: &DocumentRecord, hints: &[TagCandidate]) -> TaggedRecord {
        // Kick off the encoder on the blocking pool before lexical
        // scoring; the two have no data dependency.
        let handle = match &self.embedding {
            EmbeddingMode::Enabled(tagger) => {
                let tagger = Arc::clone(tagger);
                let text = doc.embedding_text();
                Some(task::spawn_blocking(move || tagger.score(&text, None)))
            }
            EmbeddingMode::DisabledByConfig | EmbeddingMode::Unavailable(_) => None,
        };
        let lexical = self.lexical.score(doc);

        let (embedding, mut status, mut error) = match (handle, &self.embedding) {
            (Some(handle), _) => match self.await_embed(handle).await {
                Ok(candidates) => (candidates, DocStatus::Ok, None),
                Err(err) => {
                    warn!(doc_id = %doc.doc_id, error = %err, "embedding failed; falling back to lexical-only");
                    (Vec::new(), DocStatus::Degraded, Some(err.to_string()))
                }
            },
            (None, EmbeddingMode::Unavailable(reason)) => {
                (Vec::new(), DocStatus::Degraded, Some(reason.clone()))
            }
            (None, _) => (Vec::new(), DocStatus::Ok, None),
        };

        let config = FusionConfig {
            high_confidence_cutoff: self.options.high_confidence_cutoff,
            max_tags: Some(self.options.max_tags),
        };
        let tags = match fusion::fuse(&self.snapshot, &lexical, &embedding, hints, &config) {
            Ok(tags) => tags,
            Err(err) => {
                status = DocStatus::Failed;
                error = Some(err.to_string());
                Vec::new()
            }
        };
        debug!(doc_id = %doc.doc_id, status = status.as_str(), tags = tags.len(), "tagged document");
        TaggedRecord {
            doc_id: doc.doc_id.clone(),
            status,
            tags,
            error,
            generated_at: Utc::now(),
        }
    }

    /// Join the spawned encoder call under the configured deadline.
    async fn await_embed(
        &self,
        handle: task::JoinHandle<Result<Vec<TagCandidate>, EmbeddingUnavailableError>>,
    ) -> Result<Vec<TagCandidate>, EmbeddingUnavailableError> {
        match timeout(self.options.encode_timeout, handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(EmbeddingUnavailableError::Backend {
                backend: "blocking-pool".to_string(),
                message: join_err.to_string(),
            }),
            Err(_) => Err(EmbeddingUnavailableError::Timeout {
                elapsed_ms: self.options.encode_timeout.as_millis() as u64,
            }),
        }
    }

    /// Tag a batch with bounded concurrency. One document's failure
    /// never takes down its siblings, and results come back sorted by
    /// document id regardless of completion order.
    pub async fn tag_batch(
        &self,
        docs: &[DocumentRecord],
        hints: &HashMap<String, Vec<TagCandidate>>,
    ) -> Vec<TaggedRecord> {
        let no_hints: Vec<TagCandidate> = Vec::new();
        let mut records: Vec<TaggedRecord> = stream::iter(docs)
            .map(|doc| {
                let doc_hints = hints.get(&doc.doc_id).unwrap_or(&no_hints);
                self.tag_document(doc, doc_hints)
            })
            .buffer_unordered(self.options.concurrency.max(1))
            .collect()
            .await;
        records.sort_by(|a, b| a.doc_id.cmp(&b.doc_id));
        records
    }
}

/// Shared slot for the active pipeline. A reload builds the successor
/// off to the side and swaps it in; readers keep whatever `Arc` they
/// already cloned.
pub struct PipelineHandle {
    current: RwLock<Arc<DocumentPipeline>>,
}

impl PipelineHandle {
    pub fn new(pipeline: Arc<DocumentPipeline>) -> Self {
        Self {
            current: RwLock::new(pipeline),
        }
    }

    /// Clone the active pipeline.
    pub fn current(&self) -> Arc<DocumentPipeline> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Install a successor, returning the pipeline it replaced.
    pub fn swap(&self, next: Arc<DocumentPipeline>) -> Arc<DocumentPipeline> {
        match self.current.write() {
            Ok(mut guard) => std::mem::replace(&mut *guard, next),
            Err(poisoned) => std::mem::replace(&mut *poisoned.into_inner(), next),
        }
    }
}
