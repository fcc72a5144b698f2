//! Merge command - verify completed blocks and build the mosaic.

use crate::error::CliError;
use clap::Args;
use std::path::PathBuf;
use worldmosaic::engine::gdal_cli::GdalCliEngine;
use worldmosaic::store::TaskStore;
use worldmosaic::verifier::{self, MergeOutcome};

/// Arguments for the merge command.
#[derive(Debug, Args)]
pub struct MergeArgs {
    /// Output directory holding the task store and block files
    #[arg(short, long)]
    pub output: PathBuf,

    /// Skip content-hash verification (file existence is always checked)
    #[arg(long)]
    pub no_verify: bool,
}

/// Run the merge command.
pub fn run(args: MergeArgs) -> Result<i32, CliError> {
    let mut store = TaskStore::open(&args.output)?;
    let engine = GdalCliEngine::new();

    match verifier::merge(&mut store, &engine, &args.output, !args.no_verify)? {
        MergeOutcome::Merged { mosaic, files } => {
            println!("Merged {} blocks into {}", files.len(), mosaic.display());
            Ok(0)
        }
        MergeOutcome::Requeued { file_names } => {
            eprintln!(
                "{} blocks failed verification and were requeued; run download again",
                file_names.len()
            );
            for name in &file_names {
                eprintln!("  {}", name);
            }
            Ok(1)
        }
    }
}
