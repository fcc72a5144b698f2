//! External raster engine boundary.
//!
//! Pixel resampling, remote-protocol fetches, and mosaic assembly belong to
//! an external raster engine; this module defines the interface the scheduler
//! and verifier speak to it. All engine configuration travels in an explicit
//! [`EngineContext`], never in process-wide state.

pub mod gdal_cli;
pub mod ogr_cli;

use crate::config::Compression;
use crate::geo::{Bounds, GeoTransform};
use crate::grid::SourceWindow;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from the raster engine outside the per-block fetch path.
///
/// Fetch failures are not errors; they are a [`FetchOutcome`].
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        source: std::io::Error,
    },

    #[error("{tool} exited with {status}: {stderr}")]
    Tool {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("could not parse engine output: {0}")]
    Parse(String),
}

/// Basic facts about a source dataset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DatasetInfo {
    /// Raster width in source pixels.
    pub width: u64,
    /// Raster height in source pixels.
    pub height: u64,
    /// Affine transform into georeferenced space.
    pub geo_transform: GeoTransform,
}

impl DatasetInfo {
    /// Georeferenced bounds of the whole dataset.
    pub fn bounds(&self) -> Bounds {
        self.geo_transform.dataset_bounds(self.width, self.height)
    }
}

/// Creation options for produced block images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreationProfile {
    pub tile_size: u32,
    pub compression: Compression,
    pub copy_overviews: bool,
}

/// Per-call engine configuration, threaded explicitly into every fetch.
#[derive(Debug, Clone)]
pub struct EngineContext {
    /// Transient remote-protocol cache namespace for this fetch.
    pub cache_dir: PathBuf,
    /// HTTP proxy (`host:port`), if any.
    pub proxy: Option<String>,
}

/// One block fetch request.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// Source dataset reference (service descriptor or path).
    pub input: String,
    /// Destination file for the block image.
    pub out_path: PathBuf,
    /// Window to read, in source-pixel space.
    pub window: SourceWindow,
    /// Output dimensions after resampling.
    pub out_width: u64,
    pub out_height: u64,
    /// Output image creation options.
    pub profile: CreationProfile,
}

/// Result of one block fetch.
///
/// Fetch failure is ordinary data consumed by the scheduler, not an error
/// that unwinds the loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The block image was produced at this path.
    Fetched(PathBuf),
    /// The engine could not produce the block.
    Failed(String),
}

/// The external raster engine.
pub trait RasterEngine {
    /// Inspects a source dataset.
    fn dataset_info(&self, input: &str) -> Result<DatasetInfo, EngineError>;

    /// Fetches one block's source window, resampled to the requested output
    /// size.
    fn fetch_block(&self, ctx: &EngineContext, req: &FetchRequest) -> FetchOutcome;

    /// Assembles a mosaic from completed block files over the given extent.
    fn build_mosaic(
        &self,
        mosaic_path: &Path,
        files: &[PathBuf],
        bounds: Bounds,
    ) -> Result<(), EngineError>;
}
