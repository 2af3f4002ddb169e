//! Embedding tagger: cosine similarity against a precomputed reference
//! table, one row per ontology entry.

use std::sync::Arc;

use ndarray::{Array1, Array2};
use tracing::debug;

use crate::{
    ontology::{OntologySnapshot, TagId},
    tagging::{
        encoder::{EmbeddingUnavailableError, TextEncoder},
        Method, TagCandidate,
    },
};

/// L2-normalised reference vectors for one snapshot. Stamped with the
/// snapshot version and encoder id so stale tables are detectable.
#[derive(Debug)]
pub struct ReferenceTable {
    snapshot_version: u64,
    encoder_id: String,
    dimension: usize,
    ids: Vec<TagId>,
    matrix: Array2<f32>,
}

impl ReferenceTable {
    /// Embed every entry's surface forms into one reference row.
    pub fn build(
        snapshot: &OntologySnapshot,
        encoder: &dyn TextEncoder,
    ) -> Result<Self, EmbeddingUnavailableError> {
        let texts: Vec<String> = snapshot
            .entries()
            .iter()
            .map(|entry| entry.reference_text())
            .collect();
        let vectors = encoder.encode(&texts)?;
        let dimension = encoder.dimension();
        let mut flat = Vec::with_capacity(vectors.len() * dimension);
        for vector in &vectors {
            if vector.len() != dimension {
                return Err(EmbeddingUnavailableError::DimensionMismatch {
                    expected: dimension,
                    got: vector.len(),
                });
            }
            let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
            if norm > f32::EPSILON {
                flat.extend(vector.iter().map(|v| v / norm));
            } else {
                flat.extend(vector.iter().copied());
            }
        }
        let matrix = Array2::from_shape_vec((vectors.len(), dimension), flat).map_err(|err| {
            EmbeddingUnavailableError::Backend {
                backend: encoder.id().to_string(),
                message: err.to_string(),
            }
        })?;
        debug!(
            rows = snapshot.len(),
            dimension,
            version = snapshot.version(),
            "built reference table"
        );
        Ok(Self {
            snapshot_version: snapshot.version(),
            encoder_id: encoder.id().to_string(),
            dimension,
            ids: snapshot.entries().iter().map(|e| e.id.clone()).collect(),
            matrix,
        })
    }

    pub fn snapshot_version(&self) -> u64 {
        self.snapshot_version
    }

    pub fn encoder_id(&self) -> &str {
        &self.encoder_id
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Scores document text by cosine similarity to reference rows.
#[derive(Clone)]
pub struct EmbeddingTagger {
    table: Arc<ReferenceTable>,
    encoder: Arc<dyn TextEncoder>,
    threshold: f32,
}

impl EmbeddingTagger {
    pub fn new(table: Arc<ReferenceTable>, encoder: Arc<dyn TextEncoder>, threshold: f32) -> Self {
        Self {
            table,
            encoder,
            threshold,
        }
    }

    /// Embed `text` and emit one candidate per entry whose similarity is
    /// at or above the threshold, best first. Confidence is the
    /// similarity clipped to `[0, 1]`; ties at a `top_k` cut keep
    /// definition order.
    pub fn score(
        &self,
        text: &str,
        top_k: Option<usize>,
    ) -> Result<Vec<TagCandidate>, EmbeddingUnavailableError> {
        if self.table.is_empty() {
            return Ok(Vec::new());
        }
        let query_text = [text.to_string()];
        let encoded = self.encoder.encode(&query_text)?;
        let vector = encoded
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingUnavailableError::Backend {
                backend: self.encoder.id().to_string(),
                message: "encoder returned no vectors".to_string(),
            })?;
        if vector.len() != self.table.dimension {
            return Err(EmbeddingUnavailableError::DimensionMismatch {
                expected: self.table.dimension,
                got: vector.len(),
            });
        }
        let mut query = Array1::from_vec(vector);
        let norm = query.dot(&query).sqrt();
        if norm > f32::EPSILON {
            query.mapv_inplace(|v| v / norm);
        }

        let similarities = self.table.matrix.dot(&query);
        let mut scored: Vec<(usize, f32)> = similarities
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, similarity)| *similarity >= self.threshold)
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        if let Some(top_k) = top_k {
            scored.truncate(top_k);
        }
        Ok(scored
            .into_iter()
            .map(|(idx, similarity)| {
                TagCandidate::new(
                    self.table.ids[idx].clone(),
                    similarity.clamp(0.0, 1.0),
                    Method::Embedding,
                )
            })
            .collect())
    }
}
