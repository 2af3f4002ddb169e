//! Batch input/output: documents, gold labels, hints and exports.

pub mod documents;
pub mod export;
pub mod gold;
pub mod hints;
