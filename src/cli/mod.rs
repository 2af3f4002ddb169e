//! Command-line interface wiring for foa-tagger.

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::Settings;

pub mod evaluate;
pub mod tag;
pub mod validate;

/// Top-level CLI definition.
#[derive(Debug, Parser)]
#[command(author, version, about = "Funding opportunity tagging engine", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Parse CLI arguments from the environment.
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Dispatch the selected sub-command.
    pub async fn dispatch(self, settings: Settings) -> Result<()> {
        match self.command {
            Commands::Tag(args) => tag::run(args, settings).await,
            Commands::Evaluate(args) => evaluate::run(args, settings).await,
            Commands::Validate(args) => validate::run(args, settings).await,
        }
    }
}

/// Supported sub-commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Tag a document batch with ontology labels.
    Tag(tag::Args),
    /// Score predictions against gold labels.
    Evaluate(evaluate::Args),
    /// Validate and inspect the ontology definition.
    Validate(validate::Args),
}
