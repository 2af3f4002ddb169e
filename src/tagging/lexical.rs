//! Whole-word lexical matcher over ontology surface forms.

use std::sync::Arc;

use regex::Regex;

use crate::{
    data::documents::DocumentRecord,
    ontology::OntologySnapshot,
    tagging::{Method, TagCandidate},
};

/// Weight applied to matches found in the title.
pub const TITLE_WEIGHT: f32 = 2.0;

/// Precompiled matcher for one ontology snapshot.
pub struct LexicalTagger {
    snapshot: Arc<OntologySnapshot>,
    matchers: Vec<EntryMatcher>,
    floor: f32,
    cap: f32,
}

struct EntryMatcher {
    entry: usize,
    patterns: Vec<Regex>,
}

impl LexicalTagger {
    /// Compile whole-word patterns for every entry in the snapshot.
    pub fn new(snapshot: Arc<OntologySnapshot>, floor: f32, cap: f32) -> Self {
        let matchers = snapshot
            .entries()
            .iter()
            .enumerate()
            .map(|(entry, e)| EntryMatcher {
                entry,
                patterns: e
                    .match_terms()
                    .iter()
                    .filter_map(|term| term_pattern(term))
                    .collect(),
            })
            .collect();
        Self {
            snapshot,
            matchers,
            floor,
            cap,
        }
    }

    pub fn snapshot(&self) -> &Arc<OntologySnapshot> {
        &self.snapshot
    }

    /// Score a document against every entry.
    ///
    /// The raw score is `2.0 * title_hits + body_hits` summed over all
    /// terms; confidence is `min(raw / cap, 1.0)`. Entries with no hit or
    /// a confidence under the floor are omitted, so a zero-confidence
    /// candidate is never emitted. Output is ordered best first, ties in
    /// definition order.
    pub fn score(&self, doc: &DocumentRecord) -> Vec<TagCandidate> {
        let mut candidates = Vec::new();
        for matcher in &self.matchers {
            let mut raw = 0.0f32;
            for pattern in &matcher.patterns {
                let title_hits = pattern.find_iter(&doc.title).count() as f32;
                let body_hits = pattern.find_iter(&doc.body).count() as f32;
                raw += TITLE_WEIGHT * title_hits + body_hits;
            }
            if raw <= 0.0 {
                continue;
            }
            let confidence = (raw / self.cap).min(1.0);
            if confidence < self.floor {
                continue;
            }
            let entry = &self.snapshot.entries()[matcher.entry];
            candidates.push(TagCandidate::new(
                entry.id.clone(),
                confidence,
                Method::Lexical,
            ));
        }
        candidates.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        candidates
    }
}

/// Case-insensitive whole-word pattern for one surface form. Boundaries
/// are asserted only next to word characters so terms with leading or
/// trailing punctuation still match; internal whitespace tolerates runs.
fn term_pattern(term: &str) -> Option<Regex> {
    let tokens: Vec<String> = term.split_whitespace().map(regex::escape).collect();
    if tokens.is_empty() {
        return None;
    }
    let escaped = tokens.join(r"\s+");
    let lead = if term.starts_with(word_char) { r"\b" } else { "" };
    let trail = if term.ends_with(word_char) { r"\b" } else { "" };
    Regex::new(&format!("(?i){lead}{escaped}{trail}")).ok()
}

fn word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
