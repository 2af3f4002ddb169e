//! Optional LLM-proposed tag hints, one JSONL record per document.

use std::{collections::HashMap, fs, path::Path, str::FromStr};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    ontology::{OntologySnapshot, TagId},
    tagging::{Method, TagCandidate},
};

#[derive(Debug, Deserialize)]
struct HintRecord {
    doc_id: String,
    #[serde(default)]
    tags: Vec<HintTag>,
}

#[derive(Debug, Deserialize)]
struct HintTag {
    tag_id: String,
    confidence: f32,
}

/// Read hint records and convert them to LLM candidates.
///
/// Hints come from a model, so they get lenient treatment a gold file
/// would not: hints naming unknown tags are dropped with a warning
/// instead of poisoning fusion, and confidences are clamped to [0, 1].
pub fn read_hints(
    path: &Path,
    snapshot: &OntologySnapshot,
) -> Result<HashMap<String, Vec<TagCandidate>>> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("reading hints from {}", path.display()))?;
    let mut hints: HashMap<String, Vec<TagCandidate>> = HashMap::new();
    let mut dropped = 0usize;
    for (idx, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record: HintRecord = serde_json::from_str(line)
            .with_context(|| format!("parsing hint on line {} of {}", idx + 1, path.display()))?;
        let slot = hints.entry(record.doc_id).or_default();
        for hint in record.tags {
            match TagId::from_str(hint.tag_id.trim())
                .ok()
                .filter(|tag| snapshot.contains(tag))
            {
                Some(tag_id) => slot.push(TagCandidate::new(
                    tag_id,
                    hint.confidence.clamp(0.0, 1.0),
                    Method::Llm,
                )),
                None => {
                    dropped += 1;
                    warn!(tag = %hint.tag_id, line = idx + 1, "dropping hint for unknown tag");
                }
            }
        }
    }
    info!(path = %path.display(), documents = hints.len(), dropped, "read llm hints");
    Ok(hints)
}
