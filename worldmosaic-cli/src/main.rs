//! worldmosaic CLI - resumable block-wise raster downloading.
//!
//! Three independent actions share one task store per output directory:
//! `init` plans the block grid, `download` drains the pending queue, and
//! `merge` verifies completed blocks and builds the mosaic.

mod commands;
mod error;

use clap::{Parser, Subcommand};
use std::path::Path;
use std::process;

use commands::download::DownloadArgs;
use commands::init::InitArgs;
use commands::merge::MergeArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "worldmosaic")]
#[command(version = worldmosaic::VERSION)]
#[command(about = "Download very large rasters block by block, resumably", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Plan the block grid and populate the task store
    Init(InitArgs),
    /// Download pending blocks until the queue is drained
    Download(DownloadArgs),
    /// Verify completed blocks and build the mosaic
    Merge(MergeArgs),
}

fn dispatch(cli: Cli) -> Result<i32, CliError> {
    match cli.command {
        Command::Init(args) => commands::init::run(args),
        Command::Download(args) => commands::download::run(args),
        Command::Merge(args) => commands::merge::run(args),
    }
}

fn main() {
    let cli = Cli::parse();

    let _guard = match worldmosaic::logging::init_logging(Path::new("logs")) {
        Ok(guard) => guard,
        Err(e) => CliError::LoggingInit(e).exit(),
    };
    tracing::info!(version = worldmosaic::VERSION, "worldmosaic starting");

    match dispatch(cli) {
        Ok(code) => process::exit(code),
        Err(e) => e.exit(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_init_args_parse() {
        let cli = Cli::parse_from([
            "worldmosaic",
            "init",
            "--input",
            "wms.xml",
            "--output",
            "out",
            "--scale",
            "2",
            "--block-size",
            "2048",
        ]);
        match cli.command {
            Command::Init(args) => {
                assert_eq!(args.input, "wms.xml");
                assert_eq!(args.scale, 2);
                assert_eq!(args.block_size, 2048);
                assert!(args.raster_mask.is_none());
            }
            _ => panic!("expected init"),
        }
    }

    #[test]
    fn test_init_rejects_zero_scale_and_block_size() {
        let err = Cli::try_parse_from([
            "worldmosaic", "init", "--input", "wms.xml", "--output", "out", "--scale", "0",
        ]);
        assert!(err.is_err());
        let err = Cli::try_parse_from([
            "worldmosaic", "init", "--input", "wms.xml", "--output", "out", "--block-size", "0",
        ]);
        assert!(err.is_err());
    }

    #[test]
    fn test_download_args_defaults() {
        let cli = Cli::parse_from(["worldmosaic", "download", "--output", "out"]);
        match cli.command {
            Command::Download(args) => {
                assert_eq!(args.tile_size, 1024);
                assert!(!args.keep_cache);
                assert!(!args.no_hash);
                assert!(args.upload_url.is_none());
            }
            _ => panic!("expected download"),
        }
    }

    #[test]
    fn test_merge_args_parse() {
        let cli = Cli::parse_from(["worldmosaic", "merge", "--output", "out", "--no-verify"]);
        match cli.command {
            Command::Merge(args) => assert!(args.no_verify),
            _ => panic!("expected merge"),
        }
    }
}
