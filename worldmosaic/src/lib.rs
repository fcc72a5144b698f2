//! worldmosaic - resumable block-wise raster downloading
//!
//! This library fetches very large rasters from slow or rate-limited imagery
//! services by cutting them into a grid of blocks, downloading each block as
//! an independently resumable task, and assembling the completed blocks into
//! one mosaic.
//!
//! The durable heart of the system is the [`store::TaskStore`]: one SQLite
//! row per block records whether it has been fetched, its content hash, and
//! when it was last attempted. The [`planner`] fills the ledger once, the
//! [`scheduler`] drains it one block at a time (recording every outcome
//! before the next selection), and the [`verifier`] re-validates completed
//! blocks before handing them to the mosaic builder.
//!
//! ```ignore
//! use worldmosaic::config::DownloadOptions;
//! use worldmosaic::engine::gdal_cli::GdalCliEngine;
//! use worldmosaic::scheduler::Scheduler;
//! use worldmosaic::store::TaskStore;
//!
//! let engine = GdalCliEngine::new();
//! let store = TaskStore::open(output_dir)?;
//! let mut scheduler = Scheduler::new(&store, &engine, output_dir, DownloadOptions::default());
//! let report = scheduler.run()?;
//! ```

pub mod config;
pub mod engine;
pub mod geo;
pub mod grid;
pub mod hash;
pub mod logging;
pub mod mask;
pub mod planner;
pub mod scheduler;
pub mod store;
pub mod upload;
pub mod verifier;

/// Version of the worldmosaic library and CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
