//! Versioned tag ontology: categories, entries, synonyms and child links.
//!
//! Definitions are compiled into immutable [`OntologySnapshot`]s. A load
//! either validates completely or is rejected with the first
//! [`OntologyValidationError`]; callers holding an old snapshot are never
//! exposed to a half-applied update.

pub mod schema;

use std::{
    cmp::Ordering,
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
    sync::atomic::{AtomicU64, Ordering as AtomicOrdering},
};

use strsim::jaro_winkler;
use thiserror::Error;
use tracing::info;

use schema::OntologyDefinition;

/// Deepest allowed parent chain under a category root.
pub const MAX_CHILD_DEPTH: usize = 3;

/// Closed set of tag categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    ResearchDomains,
    Methods,
    Populations,
    SponsorThemes,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::ResearchDomains,
        Category::Methods,
        Category::Populations,
        Category::SponsorThemes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::ResearchDomains => "research_domains",
            Category::Methods => "methods",
            Category::Populations => "populations",
            Category::SponsorThemes => "sponsor_themes",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = OntologyValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "research_domains" => Ok(Category::ResearchDomains),
            "methods" => Ok(Category::Methods),
            "populations" => Ok(Category::Populations),
            "sponsor_themes" => Ok(Category::SponsorThemes),
            other => Err(OntologyValidationError::UnknownCategory {
                found: other.to_string(),
            }),
        }
    }
}

/// Stable tag identity, rendered as `category/name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TagId {
    category: Category,
    name: String,
}

impl TagId {
    pub fn new(category: Category, name: impl Into<String>) -> Self {
        Self {
            category,
            name: name.into(),
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.category, self.name)
    }
}

impl FromStr for TagId {
    type Err = OntologyValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || OntologyValidationError::InvalidTagId {
            value: s.to_string(),
        };
        let (category, name) = s.split_once('/').ok_or_else(invalid)?;
        let category = Category::from_str(category).map_err(|_| invalid())?;
        let name = name.trim();
        if name.is_empty() {
            return Err(invalid());
        }
        Ok(TagId::new(category, name))
    }
}

impl Ord for TagId {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.category.as_str(), self.name.as_str()).cmp(&(other.category.as_str(), other.name.as_str()))
    }
}

impl PartialOrd for TagId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// One validated vocabulary entry.
#[derive(Debug, Clone)]
pub struct OntologyEntry {
    pub id: TagId,
    pub synonyms: Vec<String>,
    pub children: Vec<TagId>,
}

impl OntologyEntry {
    /// Surface forms this entry matches on: the name with underscores
    /// spelled as spaces, then each synonym, case-insensitively deduped.
    pub fn match_terms(&self) -> Vec<String> {
        let mut terms = Vec::with_capacity(1 + self.synonyms.len());
        terms.push(self.id.name().replace('_', " "));
        for synonym in &self.synonyms {
            if !terms.iter().any(|t| t.eq_ignore_ascii_case(synonym)) {
                terms.push(synonym.clone());
            }
        }
        terms
    }

    /// Text embedded as this entry's reference vector.
    pub fn reference_text(&self) -> String {
        self.match_terms().join(" ")
    }
}

/// Validation failures that reject a definition wholesale.
#[derive(Debug, Error)]
pub enum OntologyValidationError {
    #[error("reading ontology file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing ontology file {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("unknown category `{found}` (expected one of research_domains, methods, populations, sponsor_themes)")]
    UnknownCategory { found: String },
    #[error("empty entry name under category `{category}`")]
    EmptyName { category: Category },
    #[error("duplicate entry `{tag_id}`")]
    DuplicateEntry { tag_id: TagId },
    #[error("duplicate synonym `{synonym}` on entry `{tag_id}`")]
    DuplicateSynonym { tag_id: TagId, synonym: String },
    #[error("duplicate child `{child}` on entry `{tag_id}`")]
    DuplicateChild { tag_id: TagId, child: TagId },
    #[error("entry `{tag_id}` references unknown child `{child}`")]
    UnresolvedChild { tag_id: TagId, child: TagId },
    #[error("child `{child}` claimed by both `{first}` and `{second}`")]
    MultipleParents {
        child: TagId,
        first: TagId,
        second: TagId,
    },
    #[error("child cycle detected at `{tag_id}`")]
    ChildCycle { tag_id: TagId },
    #[error("entry `{tag_id}` nested {depth} levels deep, deeper than allowed")]
    DepthExceeded { tag_id: TagId, depth: usize },
    #[error("`{value}` is not a valid tag id (expected `category/name`)")]
    InvalidTagId { value: String },
}

static NEXT_VERSION: AtomicU64 = AtomicU64::new(0);

/// Immutable, validated view of the ontology. Versions are unique per
/// process so downstream caches can detect staleness.
#[derive(Debug, Clone)]
pub struct OntologySnapshot {
    version: u64,
    entries: Vec<OntologyEntry>,
    index: HashMap<TagId, usize>,
}

impl OntologySnapshot {
    /// Load and validate a definition file.
    pub fn load(path: &Path) -> Result<Self, OntologyValidationError> {
        let definition = schema::read_definition(path)?;
        let snapshot = Self::compile(definition)?;
        info!(
            path = %path.display(),
            version = snapshot.version,
            entries = snapshot.entries.len(),
            "loaded ontology"
        );
        Ok(snapshot)
    }

    /// Compile an in-memory YAML definition; used for embedded
    /// vocabularies and fixtures.
    pub fn from_yaml_str(raw: &str) -> Result<Self, OntologyValidationError> {
        let definition = schema::parse_yaml(raw).map_err(|err| OntologyValidationError::Parse {
            path: PathBuf::from("<inline>"),
            message: err.to_string(),
        })?;
        Self::compile(definition)
    }

    fn compile(definition: OntologyDefinition) -> Result<Self, OntologyValidationError> {
        let mut entries: Vec<OntologyEntry> = Vec::new();
        let mut index: HashMap<TagId, usize> = HashMap::new();

        for (category_key, defs) in &definition.categories {
            let category = Category::from_str(category_key)?;
            for def in defs {
                let name = def.name().trim();
                if name.is_empty() {
                    return Err(OntologyValidationError::EmptyName { category });
                }
                let id = TagId::new(category, name);
                if index.contains_key(&id) {
                    return Err(OntologyValidationError::DuplicateEntry { tag_id: id });
                }

                let mut synonyms: Vec<String> = Vec::new();
                for raw in def.synonyms() {
                    let synonym = raw.trim();
                    if synonym.is_empty() {
                        continue;
                    }
                    if synonyms.iter().any(|s| s.eq_ignore_ascii_case(synonym)) {
                        return Err(OntologyValidationError::DuplicateSynonym {
                            tag_id: id,
                            synonym: synonym.to_string(),
                        });
                    }
                    synonyms.push(synonym.to_string());
                }

                // Children resolve within the same category once every
                // entry is collected.
                let mut children: Vec<TagId> = Vec::new();
                for raw in def.children() {
                    let child_name = raw.trim();
                    if child_name.is_empty() {
                        continue;
                    }
                    let child = TagId::new(category, child_name);
                    if children.contains(&child) {
                        return Err(OntologyValidationError::DuplicateChild { tag_id: id, child });
                    }
                    children.push(child);
                }

                index.insert(id.clone(), entries.len());
                entries.push(OntologyEntry {
                    id,
                    synonyms,
                    children,
                });
            }
        }

        let mut parent: HashMap<TagId, TagId> = HashMap::new();
        for entry in &entries {
            for child in &entry.children {
                if !index.contains_key(child) {
                    return Err(OntologyValidationError::UnresolvedChild {
                        tag_id: entry.id.clone(),
                        child: child.clone(),
                    });
                }
                if let Some(first) = parent.get(child) {
                    return Err(OntologyValidationError::MultipleParents {
                        child: child.clone(),
                        first: first.clone(),
                        second: entry.id.clone(),
                    });
                }
                parent.insert(child.clone(), entry.id.clone());
            }
        }

        // Every node has at most one parent, so walking upwards either
        // terminates or revisits a node; the step bound catches cycles.
        for entry in &entries {
            let mut depth = 0usize;
            let mut cursor = parent.get(&entry.id);
            while let Some(next) = cursor {
                depth += 1;
                if depth > entries.len() {
                    return Err(OntologyValidationError::ChildCycle {
                        tag_id: entry.id.clone(),
                    });
                }
                cursor = parent.get(next);
            }
            if depth > MAX_CHILD_DEPTH {
                return Err(OntologyValidationError::DepthExceeded {
                    tag_id: entry.id.clone(),
                    depth,
                });
            }
        }

        let version = NEXT_VERSION.fetch_add(1, AtomicOrdering::Relaxed) + 1;
        Ok(Self {
            version,
            entries,
            index,
        })
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in definition order.
    pub fn entries(&self) -> &[OntologyEntry] {
        &self.entries
    }

    pub fn entry(&self, id: &TagId) -> Option<&OntologyEntry> {
        self.index.get(id).map(|idx| &self.entries[*idx])
    }

    pub fn contains(&self, id: &TagId) -> bool {
        self.index.contains_key(id)
    }

    /// Entries in definition order, optionally restricted to a category.
    pub fn list_entries(&self, category: Option<Category>) -> impl Iterator<Item = &OntologyEntry> {
        self.entries
            .iter()
            .filter(move |entry| category.map_or(true, |c| entry.id.category() == c))
    }

    /// Closest known tag path to `needle`, for error suggestions.
    pub fn nearest_tag(&self, needle: &str) -> Option<(String, f64)> {
        let target = needle.trim().to_lowercase();
        let mut best: Option<(String, f64)> = None;
        for entry in &self.entries {
            let path = entry.id.to_string();
            let score = jaro_winkler(&target, &path);
            if best.as_ref().map_or(true, |(_, s)| score > *s) {
                best = Some((path, score));
            }
        }
        best
    }

    /// Longest validated parent chain, for inspection output.
    pub fn max_depth(&self) -> usize {
        let mut parent: HashMap<&TagId, &TagId> = HashMap::new();
        for entry in &self.entries {
            for child in &entry.children {
                parent.insert(child, &entry.id);
            }
        }
        self.entries
            .iter()
            .map(|entry| {
                let mut depth = 0usize;
                let mut cursor = parent.get(&entry.id);
                while let Some(next) = cursor {
                    depth += 1;
                    cursor = parent.get(*next);
                }
                depth
            })
            .max()
            .unwrap_or(0)
    }
}
