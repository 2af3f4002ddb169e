//! Tagging engine for funding opportunity announcements.
//!
//! Documents are scored by a lexical whole-word matcher and an embedding
//! tagger against a versioned ontology, fused into final tags, and
//! evaluated against gold labels. The [`cli`] module exposes the same
//! operations as sub-commands.

pub mod cli;
pub mod config;
pub mod data;
pub mod eval;
pub mod logging;
pub mod ontology;
pub mod pipeline;
pub mod tagging;
