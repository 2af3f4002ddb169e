//! CLI entry-point for validating and inspecting the ontology.

use std::{path::PathBuf, str::FromStr};

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use tracing::instrument;

use crate::{
    config::Settings,
    ontology::{Category, OntologySnapshot},
};

/// Args for the `validate` sub-command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    /// Ontology definition; defaults to ONTOLOGY_PATH.
    #[arg(long)]
    pub ontology: Option<PathBuf>,
    /// List every entry of one category instead of the summary.
    #[arg(long)]
    pub category: Option<String>,
}

#[instrument(skip(settings))]
pub async fn run(args: Args, settings: Settings) -> Result<()> {
    let ontology_path = args
        .ontology
        .unwrap_or_else(|| settings.ontology_path.clone());
    let snapshot = OntologySnapshot::load(&ontology_path)
        .with_context(|| format!("validating ontology at {}", ontology_path.display()))?;

    if let Some(raw) = &args.category {
        let category = Category::from_str(raw)?;
        for entry in snapshot.list_entries(Some(category)) {
            println!("{}", entry.id);
            if !entry.synonyms.is_empty() {
                println!("  synonyms: {}", entry.synonyms.join(", "));
            }
            if !entry.children.is_empty() {
                let children: Vec<String> =
                    entry.children.iter().map(|c| c.name().to_string()).collect();
                println!("  children: {}", children.join(", "));
            }
        }
        return Ok(());
    }

    println!(
        "ontology valid: {} entries (version {})",
        snapshot.len(),
        snapshot.version()
    );
    for category in Category::ALL {
        let count = snapshot.list_entries(Some(category)).count();
        println!("  {category}: {count}");
    }
    println!("max child depth: {}", snapshot.max_depth());
    Ok(())
}
