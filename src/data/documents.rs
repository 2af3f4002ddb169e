//! Input document batches in JSON Lines form.

use std::{collections::HashSet, fs, path::Path};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// One submission to the tagging engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub doc_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
}

impl DocumentRecord {
    /// Combined text handed to the embedding encoder.
    pub fn embedding_text(&self) -> String {
        let title = self.title.trim();
        let body = self.body.trim();
        if body.is_empty() {
            title.to_string()
        } else if title.is_empty() {
            body.to_string()
        } else {
            format!("{title}. {body}")
        }
    }
}

/// Read a JSONL document batch. Blank lines are skipped; a malformed
/// line or a repeated doc_id aborts the read with its line number.
pub fn read_documents(path: &Path) -> Result<Vec<DocumentRecord>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading documents from {}", path.display()))?;
    let mut documents = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    for (idx, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record: DocumentRecord = serde_json::from_str(line).with_context(|| {
            format!("parsing document on line {} of {}", idx + 1, path.display())
        })?;
        if record.doc_id.trim().is_empty() {
            bail!(
                "document on line {} of {} has an empty doc_id",
                idx + 1,
                path.display()
            );
        }
        if !seen.insert(record.doc_id.clone()) {
            bail!(
                "duplicate doc_id `{}` on line {} of {}",
                record.doc_id,
                idx + 1,
                path.display()
            );
        }
        documents.push(record);
    }
    info!(path = %path.display(), documents = documents.len(), "read document batch");
    Ok(documents)
}
