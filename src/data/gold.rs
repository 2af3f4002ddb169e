//! Gold-label sets for evaluation, JSON or CSV on disk.

use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    path::Path,
    str::FromStr,
};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::info;

use crate::ontology::{OntologySnapshot, TagId};

/// Jaro-Winkler score a near-miss needs before it is worth suggesting.
const SUGGESTION_FLOOR: f64 = 0.82;

/// One annotator's labels, keyed by document id.
#[derive(Debug, Clone, Default)]
pub struct GoldLabels {
    pub labels: BTreeMap<String, BTreeSet<TagId>>,
}

#[derive(Debug, Deserialize)]
struct GoldCsvRow {
    doc_id: String,
    tag_id: String,
}

impl GoldLabels {
    /// Load labels from `.csv` (doc_id,tag_id rows) or JSON (document to
    /// tag-path array). A label naming an unknown tag rejects the whole
    /// file, with the closest known path suggested.
    pub fn load(path: &Path, snapshot: &OntologySnapshot) -> Result<Self> {
        let mut labels: BTreeMap<String, BTreeSet<TagId>> = BTreeMap::new();
        if path.extension().and_then(|s| s.to_str()) == Some("csv") {
            let mut reader = csv::Reader::from_path(path)
                .with_context(|| format!("opening gold labels {}", path.display()))?;
            for row in reader.deserialize() {
                let row: GoldCsvRow =
                    row.with_context(|| format!("reading gold labels {}", path.display()))?;
                let tag = resolve_tag(&row.tag_id, snapshot)?;
                labels.entry(row.doc_id).or_default().insert(tag);
            }
        } else {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("reading gold labels {}", path.display()))?;
            let parsed: BTreeMap<String, Vec<String>> = serde_json::from_str(&raw)
                .with_context(|| format!("parsing gold labels {}", path.display()))?;
            for (doc_id, tags) in parsed {
                let set = labels.entry(doc_id).or_default();
                for raw_tag in tags {
                    set.insert(resolve_tag(&raw_tag, snapshot)?);
                }
            }
        }
        info!(path = %path.display(), documents = labels.len(), "loaded gold labels");
        Ok(Self { labels })
    }
}

fn resolve_tag(raw: &str, snapshot: &OntologySnapshot) -> Result<TagId> {
    let tag = TagId::from_str(raw.trim())
        .with_context(|| format!("gold label `{raw}` is not a category/name path"))?;
    if snapshot.contains(&tag) {
        return Ok(tag);
    }
    match snapshot.nearest_tag(raw) {
        Some((suggestion, score)) if score > SUGGESTION_FLOOR => {
            bail!("gold label `{raw}` is not in the ontology; did you mean `{suggestion}`?")
        }
        _ => bail!("gold label `{raw}` is not in the ontology"),
    }
}
