//! CLI surface. Assembling a concrete `PipelineContext` (discovering
//! observers/adapters, opening sessions) from a project directory stays an
//! external collaborator's job; this module owns the flags for driving an
//! already-assembled run.

use std::path::PathBuf;

use clap::Parser;

use crate::errors::Result;
use crate::log;
use crate::pipeline::{Manager, PipelineContext, Summary};

#[derive(Debug, Parser)]
#[command(name = "siphon", about = "Concurrent extract/transform/load pipeline runtime")]
pub struct Cli {
    /// Path to the YAML settings file.
    #[arg(long, short = 'c')]
    pub settings: PathBuf,

    /// Overrides SIPHON_LOG_LEVEL for this run.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Emits JSON-formatted logs instead of human-readable ones.
    #[arg(long)]
    pub json_logs: bool,
}

impl Cli {
    pub fn init_logging(&self) {
        log::init_tracing_with(self.log_level.as_deref(), self.json_logs);
    }

    /// Loads a `.env` file from the working directory, if one exists, before
    /// `Settings::from_path` resolves any `${VAR}`-style references in the
    /// YAML. Absence of a `.env` file is not an error.
    pub fn load_dotenv() {
        let _ = dotenvy::dotenv();
    }
}

/// Owns the single `Manager` instance for a run and drives it to quiescence.
pub async fn run_pipeline(context: PipelineContext) -> Result<Summary> {
    let mut manager = Manager::new(context);
    manager.run_observe().await
}
