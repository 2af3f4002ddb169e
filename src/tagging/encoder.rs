//! Text encoder backends behind a common trait.
//!
//! The default backend is a dependency-free hashed n-gram encoder so the
//! engine works offline; compiling with the `embeddings` feature adds a
//! MiniLM sentence encoder via fastembed.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Settings;

#[cfg(feature = "embeddings")]
use fastembed::TextEmbedding;

/// Failure raised by an embedding backend. Recoverable per document:
/// callers fall back to lexical-only fusion instead of aborting.
#[derive(Debug, Error)]
pub enum EmbeddingUnavailableError {
    #[error("embedding backend `{backend}` unavailable: {message}")]
    Backend { backend: String, message: String },
    #[error("encoder call exceeded {elapsed_ms} ms")]
    Timeout { elapsed_ms: u64 },
    #[error("encoder returned a {got}-dimensional vector, expected {expected}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// Deterministic text-to-vector backends.
pub trait TextEncoder: Send + Sync {
    /// Stable identifier recorded on reference tables.
    fn id(&self) -> &str;
    /// Output vector width.
    fn dimension(&self) -> usize;
    /// Encode a slice of texts into one vector each.
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingUnavailableError>;
}

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z0-9]+").expect("valid regex"));

/// Fallback encoder: token plus character-trigram bag with signed
/// feature hashing, L2-normalised. Deterministic across platforms.
pub struct HashedNgramEncoder {
    dimension: usize,
    id: String,
}

impl HashedNgramEncoder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            id: format!("hashed-ngram-v1/{dimension}"),
        }
    }

    fn encode_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        let lower = text.to_lowercase();
        for token in TOKEN_RE.find_iter(&lower) {
            let bytes = token.as_str().as_bytes();
            self.bump(&mut vector, bytes);
            if bytes.len() >= 3 {
                for gram in bytes.windows(3) {
                    self.bump(&mut vector, gram);
                }
            }
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }

    fn bump(&self, vector: &mut [f32], feature: &[u8]) {
        let hash = fnv1a(feature);
        let slot = (hash % self.dimension as u64) as usize;
        let sign = if hash & (1 << 63) == 0 { 1.0 } else { -1.0 };
        vector[slot] += sign;
    }
}

impl Default for HashedNgramEncoder {
    fn default() -> Self {
        Self::new(384)
    }
}

impl TextEncoder for HashedNgramEncoder {
    fn id(&self) -> &str {
        &self.id
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingUnavailableError> {
        Ok(texts.iter().map(|text| self.encode_one(text)).collect())
    }
}

/// 64-bit FNV-1a. `DefaultHasher` is not guaranteed stable across
/// releases, and reference tables must hash identically everywhere.
fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = 0xcbf2_9ce4_8422_2325u64;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

/// MiniLM sentence encoder backed by fastembed.
#[cfg(feature = "embeddings")]
pub struct FastembedEncoder {
    model: TextEmbedding,
    dimension: usize,
    id: String,
}

#[cfg(feature = "embeddings")]
impl FastembedEncoder {
    pub fn try_new() -> Result<Self, EmbeddingUnavailableError> {
        let model = TextEmbedding::try_new(Default::default()).map_err(fastembed_err)?;
        // The model default is all-MiniLM-L6-v2; probe rather than
        // hard-code the width.
        let probe = model.embed(vec!["probe"], None).map_err(fastembed_err)?;
        let dimension = probe.first().map(Vec::len).unwrap_or(0);
        if dimension == 0 {
            return Err(EmbeddingUnavailableError::Backend {
                backend: "fastembed".to_string(),
                message: "probe embedding came back empty".to_string(),
            });
        }
        Ok(Self {
            model,
            dimension,
            id: "fastembed/all-minilm-l6-v2".to_string(),
        })
    }
}

#[cfg(feature = "embeddings")]
fn fastembed_err<E: std::fmt::Display>(err: E) -> EmbeddingUnavailableError {
    EmbeddingUnavailableError::Backend {
        backend: "fastembed".to_string(),
        message: err.to_string(),
    }
}

#[cfg(feature = "embeddings")]
impl TextEncoder for FastembedEncoder {
    fn id(&self) -> &str {
        &self.id
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingUnavailableError> {
        let documents: Vec<&str> = texts.iter().map(String::as_str).collect();
        self.model.embed(documents, None).map_err(fastembed_err)
    }
}

/// Resolve the configured encoder backend.
pub fn load_encoder(settings: &Settings) -> Result<Arc<dyn TextEncoder>, EmbeddingUnavailableError> {
    match settings.embedding_backend.as_str() {
        "fastembed" => {
            #[cfg(feature = "embeddings")]
            {
                let encoder = FastembedEncoder::try_new()?;
                info!(
                    id = encoder.id(),
                    dimension = encoder.dimension(),
                    "loaded fastembed encoder"
                );
                return Ok(Arc::new(encoder));
            }
            #[cfg(not(feature = "embeddings"))]
            {
                warn!("EMBEDDING_BACKEND=fastembed but built without the `embeddings` feature; using hashed n-grams");
            }
        }
        "hashed-ngram" => {}
        other => {
            warn!(backend = other, "unknown embedding backend; using hashed n-grams");
        }
    }
    let encoder = HashedNgramEncoder::new(settings.embedding_dimension);
    info!(id = encoder.id(), "loaded hashed n-gram encoder");
    Ok(Arc::new(encoder))
}
