//! Tagged-output artefacts: JSONL for machines, CSV for spreadsheets.

use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    io::Write,
    path::Path,
};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::{ontology::TagId, pipeline::TaggedRecord};

/// Write one record per line; callers sort the batch beforehand.
pub fn write_jsonl(records: &[TaggedRecord], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file =
        fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    for record in records {
        let line = serde_json::to_string(record)?;
        writeln!(file, "{line}")?;
    }
    info!(path = %path.display(), records = records.len(), "wrote tagged jsonl");
    Ok(())
}

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    doc_id: &'a str,
    status: &'a str,
    tag_id: String,
    confidence: Option<f32>,
    methods: String,
    agreement: Option<bool>,
}

/// Flatten records to one row per (document, tag). Documents with no
/// tags still get a row with empty tag columns so the CSV covers the
/// whole batch, degraded and failed documents included.
pub fn write_csv(records: &[TaggedRecord], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    for record in records {
        if record.tags.is_empty() {
            writer.serialize(CsvRow {
                doc_id: &record.doc_id,
                status: record.status.as_str(),
                tag_id: String::new(),
                confidence: None,
                methods: String::new(),
                agreement: None,
            })?;
            continue;
        }
        for tag in &record.tags {
            writer.serialize(CsvRow {
                doc_id: &record.doc_id,
                status: record.status.as_str(),
                tag_id: tag.tag_id.to_string(),
                confidence: Some(tag.confidence),
                methods: tag
                    .methods
                    .iter()
                    .map(|method| method.as_str())
                    .collect::<Vec<_>>()
                    .join(";"),
                agreement: Some(tag.agreement),
            })?;
        }
    }
    writer.flush()?;
    info!(path = %path.display(), records = records.len(), "wrote tagged csv");
    Ok(())
}

/// Load tag sets back from a tagged JSONL artefact, keyed by document.
/// Failed documents come back with empty sets so evaluation charges
/// them the recall they missed.
pub fn read_predictions(path: &Path) -> Result<BTreeMap<String, BTreeSet<TagId>>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading predictions from {}", path.display()))?;
    let mut predictions = BTreeMap::new();
    for (idx, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record: TaggedRecord = serde_json::from_str(line).with_context(|| {
            format!("parsing prediction on line {} of {}", idx + 1, path.display())
        })?;
        let tags: BTreeSet<TagId> = record.tags.iter().map(|tag| tag.tag_id.clone()).collect();
        predictions.insert(record.doc_id, tags);
    }
    info!(path = %path.display(), documents = predictions.len(), "read predictions");
    Ok(predictions)
}
