//! On-disk ontology definition formats (YAML or JSON).

use std::{fs, path::Path};

use indexmap::IndexMap;
use serde::Deserialize;

use super::OntologyValidationError;

/// Raw definition file: category key to entry list, in authoring order.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct OntologyDefinition {
    pub categories: IndexMap<String, Vec<EntryDef>>,
}

/// One authored entry: either a bare name, or a mapping carrying
/// synonyms and child references.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum EntryDef {
    Name(String),
    Detailed {
        name: String,
        #[serde(default)]
        synonyms: Vec<String>,
        #[serde(default)]
        children: Vec<String>,
    },
}

impl EntryDef {
    pub fn name(&self) -> &str {
        match self {
            EntryDef::Name(name) => name,
            EntryDef::Detailed { name, .. } => name,
        }
    }

    pub fn synonyms(&self) -> &[String] {
        match self {
            EntryDef::Name(_) => &[],
            EntryDef::Detailed { synonyms, .. } => synonyms,
        }
    }

    pub fn children(&self) -> &[String] {
        match self {
            EntryDef::Name(_) => &[],
            EntryDef::Detailed { children, .. } => children,
        }
    }
}

/// Read a definition file, dispatching on extension: `.json` parses as
/// JSON, anything else as YAML.
pub fn read_definition(path: &Path) -> Result<OntologyDefinition, OntologyValidationError> {
    let raw = fs::read_to_string(path).map_err(|source| OntologyValidationError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if path.extension().and_then(|s| s.to_str()) == Some("json") {
        serde_json::from_str(&raw).map_err(|err| OntologyValidationError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    } else {
        serde_yaml::from_str(&raw).map_err(|err| OntologyValidationError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }
}

/// Parse an in-memory YAML definition.
pub fn parse_yaml(raw: &str) -> Result<OntologyDefinition, serde_yaml::Error> {
    serde_yaml::from_str(raw)
}
