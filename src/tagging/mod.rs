//! Hybrid tagging layer: lexical matching, embedding similarity, fusion.

pub mod embedding;
pub mod encoder;
pub mod fusion;
pub mod lexical;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

use crate::ontology::TagId;

/// Tagging method that produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    Lexical,
    Embedding,
    Llm,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Lexical => "lexical",
            Method::Embedding => "embedding",
            Method::Llm => "llm",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single-method tag proposal prior to fusion.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagCandidate {
    #[serde_as(as = "DisplayFromStr")]
    pub tag_id: TagId,
    pub confidence: f32,
    pub method: Method,
}

impl TagCandidate {
    pub fn new(tag_id: TagId, confidence: f32, method: Method) -> Self {
        Self {
            tag_id,
            confidence,
            method,
        }
    }
}
