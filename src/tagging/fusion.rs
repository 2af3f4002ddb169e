//! Fusion policy combining per-method candidates into final tags.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use thiserror::Error;

use crate::{
    ontology::{OntologySnapshot, TagId},
    tagging::{Method, TagCandidate},
};

/// Thresholds governing fusion decisions.
#[derive(Debug, Clone, Copy)]
pub struct FusionConfig {
    /// Confidence a single-method candidate needs to survive alone.
    pub high_confidence_cutoff: f32,
    /// Cap applied after ranking; `None` keeps everything.
    pub max_tags: Option<usize>,
}

/// A candidate named a tag the snapshot does not know. This signals a
/// stale cache or a tagger paired with the wrong snapshot, so the
/// document must fail rather than emit the tag.
#[derive(Debug, Error)]
#[error("candidate `{tag_id}` from {method} is absent from ontology snapshot v{snapshot_version}")]
pub struct FusionInputMismatchError {
    pub tag_id: TagId,
    pub method: Method,
    pub snapshot_version: u64,
}

/// Final fused tag for one document.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedTag {
    #[serde_as(as = "DisplayFromStr")]
    pub tag_id: TagId,
    pub confidence: f32,
    pub methods: Vec<Method>,
    pub agreement: bool,
}

#[derive(Default)]
struct MethodScores {
    lexical: Option<f32>,
    embedding: Option<f32>,
    llm: Option<f32>,
}

impl MethodScores {
    fn record(&mut self, method: Method, confidence: f32) {
        let slot = match method {
            Method::Lexical => &mut self.lexical,
            Method::Embedding => &mut self.embedding,
            Method::Llm => &mut self.llm,
        };
        *slot = Some(slot.map_or(confidence, |prev| prev.max(confidence)));
    }

    fn contributions(&self) -> Vec<(Method, f32)> {
        let mut out = Vec::new();
        if let Some(confidence) = self.lexical {
            out.push((Method::Lexical, confidence));
        }
        if let Some(confidence) = self.embedding {
            out.push((Method::Embedding, confidence));
        }
        if let Some(confidence) = self.llm {
            out.push((Method::Llm, confidence));
        }
        out
    }
}

/// Fuse per-method candidates for one document.
///
/// A tag proposed by two or more methods is kept at the maximum
/// contributing confidence with `agreement` set; this is how an LLM hint
/// promotes a borderline lexical or embedding candidate. A tag from a
/// single method survives only at or above the cutoff, and the bar is
/// uniform across methods, so an unsupported hint gets no special
/// treatment. Output is ordered by confidence descending, then tag id,
/// and truncated to `max_tags`.
pub fn fuse(
    snapshot: &OntologySnapshot,
    lexical: &[TagCandidate],
    embedding: &[TagCandidate],
    llm: &[TagCandidate],
    config: &FusionConfig,
) -> Result<Vec<FusedTag>, FusionInputMismatchError> {
    let mut grouped: BTreeMap<TagId, MethodScores> = BTreeMap::new();
    for candidate in lexical.iter().chain(embedding).chain(llm) {
        if !snapshot.contains(&candidate.tag_id) {
            return Err(FusionInputMismatchError {
                tag_id: candidate.tag_id.clone(),
                method: candidate.method,
                snapshot_version: snapshot.version(),
            });
        }
        grouped
            .entry(candidate.tag_id.clone())
            .or_default()
            .record(candidate.method, candidate.confidence.clamp(0.0, 1.0));
    }

    let mut fused = Vec::new();
    for (tag_id, scores) in grouped {
        let contributions = scores.contributions();
        let best = contributions
            .iter()
            .map(|(_, confidence)| *confidence)
            .fold(0.0f32, f32::max);
        if contributions.len() < 2 && best < config.high_confidence_cutoff {
            continue;
        }
        fused.push(FusedTag {
            tag_id,
            confidence: best,
            methods: contributions.iter().map(|(method, _)| *method).collect(),
            agreement: contributions.len() >= 2,
        });
    }

    fused.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.tag_id.cmp(&b.tag_id))
    });
    if let Some(max_tags) = config.max_tags {
        fused.truncate(max_tags);
    }
    Ok(fused)
}
