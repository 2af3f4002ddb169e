//! CLI entry-point for scoring predictions against gold labels.

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use tracing::{info, instrument};

use crate::{
    config::Settings,
    data::{export, gold::GoldLabels},
    eval,
    ontology::OntologySnapshot,
};

/// Args for the `evaluate` sub-command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    /// Tagged JSONL to score; defaults to tagged.jsonl in OUTPUTS_DIR.
    #[arg(long)]
    pub predictions: Option<PathBuf>,
    /// Gold label files (JSON or CSV). The first is the reference for
    /// precision/recall; additional sets feed annotator agreement.
    #[arg(long, value_delimiter = ',', required = true)]
    pub gold: Vec<PathBuf>,
    /// Report destination; defaults to evaluation.json in OUTPUTS_DIR.
    #[arg(long)]
    pub report: Option<PathBuf>,
    /// Ontology definition; defaults to ONTOLOGY_PATH.
    #[arg(long)]
    pub ontology: Option<PathBuf>,
}

#[instrument(skip(settings))]
pub async fn run(args: Args, settings: Settings) -> Result<()> {
    let ontology_path = args
        .ontology
        .unwrap_or_else(|| settings.ontology_path.clone());
    let snapshot = OntologySnapshot::load(&ontology_path)
        .with_context(|| format!("loading ontology from {}", ontology_path.display()))?;

    let gold_sets = args
        .gold
        .iter()
        .map(|path| GoldLabels::load(path, &snapshot))
        .collect::<Result<Vec<_>>>()?;

    let predictions_path = args
        .predictions
        .unwrap_or_else(|| settings.join_output("tagged.jsonl"));
    let predictions = export::read_predictions(&predictions_path)?;

    let mut report = eval::evaluate(&predictions, &gold_sets[0]);
    report.kappa = eval::annotator_agreement(&snapshot, &gold_sets);

    let report_path = args
        .report
        .unwrap_or_else(|| settings.join_output("evaluation.json"));
    if let Some(parent) = report_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&report_path, serde_json::to_string_pretty(&report)?)
        .with_context(|| format!("writing report to {}", report_path.display()))?;
    info!(path = %report_path.display(), documents = report.documents, "wrote evaluation report");

    println!(
        "evaluated {} documents against {}",
        report.documents,
        args.gold[0].display()
    );
    println!(
        "micro  p {:.3}  r {:.3}  f1 {:.3}",
        report.micro.precision, report.micro.recall, report.micro.f1
    );
    println!("macro f1 {:.3}", report.macro_f1);
    for (category, agreement) in &report.kappa {
        println!(
            "kappa {category}: {:.3} ({} pairs, {} items)",
            agreement.kappa, agreement.pairs, agreement.items
        );
    }
    println!("report: {}", report_path.display());
    Ok(())
}
