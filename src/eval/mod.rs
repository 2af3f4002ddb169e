//! Evaluation harness: tag-level and document-level P/R/F1 plus
//! annotator agreement.

pub mod kappa;
pub mod metrics;

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    data::gold::GoldLabels,
    ontology::{Category, OntologySnapshot, TagId},
};

use metrics::{PrfCounts, PrfMetrics};

/// Pairwise agreement rollup for one category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryAgreement {
    /// Mean Cohen's kappa over annotator pairs.
    pub kappa: f64,
    /// Annotator pairs compared.
    pub pairs: usize,
    /// Total (document, entry) decisions across pairs.
    pub items: usize,
}

/// Full evaluation artefact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub generated_at: DateTime<Utc>,
    pub documents: usize,
    pub micro: PrfMetrics,
    pub macro_f1: f64,
    pub per_document: BTreeMap<String, PrfMetrics>,
    pub per_tag: BTreeMap<String, PrfMetrics>,
    pub kappa: BTreeMap<String, CategoryAgreement>,
}

/// Score predictions against one gold set.
///
/// Documents appearing on either side are evaluated; the side missing a
/// document contributes an empty tag set, so an untagged document still
/// costs recall. Per-tag rows cover every tag seen in predictions or
/// gold, and macro F1 is the unweighted mean over those rows.
pub fn evaluate(
    predicted: &BTreeMap<String, BTreeSet<TagId>>,
    gold: &GoldLabels,
) -> EvaluationReport {
    let empty = BTreeSet::new();
    let doc_ids: BTreeSet<&String> = predicted.keys().chain(gold.labels.keys()).collect();

    let mut per_document = BTreeMap::new();
    let mut per_tag_counts: BTreeMap<TagId, PrfCounts> = BTreeMap::new();
    let mut micro = PrfCounts::default();

    for doc_id in &doc_ids {
        let predicted_tags = predicted.get(doc_id.as_str()).unwrap_or(&empty);
        let gold_tags = gold.labels.get(doc_id.as_str()).unwrap_or(&empty);
        let counts = PrfCounts::from_sets(predicted_tags, gold_tags);
        micro.absorb(counts);
        per_document.insert((*doc_id).clone(), counts.metrics());

        for tag in predicted_tags.union(gold_tags) {
            let hit = predicted_tags.contains(tag);
            let wanted = gold_tags.contains(tag);
            let slot = per_tag_counts.entry(tag.clone()).or_default();
            match (hit, wanted) {
                (true, true) => slot.true_positives += 1,
                (true, false) => slot.false_positives += 1,
                (false, true) => slot.false_negatives += 1,
                (false, false) => {}
            }
        }
    }

    let macro_f1 = if per_tag_counts.is_empty() {
        0.0
    } else {
        per_tag_counts.values().map(PrfCounts::f1).sum::<f64>() / per_tag_counts.len() as f64
    };

    EvaluationReport {
        generated_at: Utc::now(),
        documents: doc_ids.len(),
        micro: micro.metrics(),
        macro_f1,
        per_document,
        per_tag: per_tag_counts
            .iter()
            .map(|(id, counts)| (id.to_string(), counts.metrics()))
            .collect(),
        kappa: BTreeMap::new(),
    }
}

/// Mean pairwise Cohen's kappa per category across annotator sets.
///
/// Each unordered pair is compared over the documents both annotated,
/// with one yes/no decision per (document, category entry). Categories
/// yielding no decisions are omitted.
pub fn annotator_agreement(
    snapshot: &OntologySnapshot,
    sets: &[GoldLabels],
) -> BTreeMap<String, CategoryAgreement> {
    let mut rollup = BTreeMap::new();
    if sets.len() < 2 {
        return rollup;
    }
    let empty = BTreeSet::new();
    for category in Category::ALL {
        let entry_ids: Vec<&TagId> = snapshot
            .list_entries(Some(category))
            .map(|entry| &entry.id)
            .collect();
        if entry_ids.is_empty() {
            continue;
        }
        let mut kappas = Vec::new();
        let mut items = 0usize;
        for i in 0..sets.len() {
            for j in (i + 1)..sets.len() {
                let shared: Vec<&String> = sets[i]
                    .labels
                    .keys()
                    .filter(|doc| sets[j].labels.contains_key(doc.as_str()))
                    .collect();
                if shared.is_empty() {
                    continue;
                }
                let mut decisions = Vec::with_capacity(shared.len() * entry_ids.len());
                for doc in &shared {
                    let left = sets[i].labels.get(doc.as_str()).unwrap_or(&empty);
                    let right = sets[j].labels.get(doc.as_str()).unwrap_or(&empty);
                    for id in &entry_ids {
                        decisions.push((left.contains(*id), right.contains(*id)));
                    }
                }
                items += decisions.len();
                kappas.push(kappa::cohen_kappa(&decisions));
            }
        }
        if kappas.is_empty() {
            continue;
        }
        rollup.insert(
            category.to_string(),
            CategoryAgreement {
                kappa: kappas.iter().sum::<f64>() / kappas.len() as f64,
                pairs: kappas.len(),
                items,
            },
        );
    }
    rollup
}
