//! Init command - plan the block grid and populate the task store.

use crate::error::CliError;
use clap::Args;
use std::path::PathBuf;
use worldmosaic::config::DEFAULT_BLOCK_SIZE;
use worldmosaic::engine::gdal_cli::GdalCliEngine;
use worldmosaic::engine::ogr_cli::OgrCliVectorMask;
use worldmosaic::engine::RasterEngine;
use worldmosaic::grid::BlockGrid;
use worldmosaic::mask::raster::{MaskRaster, RasterMaskFilter};
use worldmosaic::mask::vector::VectorMaskFilter;
use worldmosaic::mask::FilterSet;
use worldmosaic::planner;

/// Arguments for the init command.
#[derive(Debug, Args)]
pub struct InitArgs {
    /// Input imagery service reference or dataset path
    #[arg(short, long)]
    pub input: String,

    /// Output directory (wiped and recreated)
    #[arg(short, long)]
    pub output: PathBuf,

    /// Output image scale (source pixels per output pixel)
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    pub scale: u64,

    /// Block edge length in output pixels
    #[arg(short, long, default_value_t = DEFAULT_BLOCK_SIZE, value_parser = clap::value_parser!(u64).range(1..))]
    pub block_size: u64,

    /// Single-band nodata mask image; blocks with no mask data are skipped
    #[arg(short = 'm', long)]
    pub raster_mask: Option<PathBuf>,

    /// Vector area-of-interest layer; blocks outside it are skipped
    #[arg(short = 'v', long)]
    pub vector_mask: Option<PathBuf>,

    /// Layer name inside the vector mask datasource
    #[arg(long, requires = "vector_mask")]
    pub vector_layer: Option<String>,
}

/// Run the init command.
pub fn run(args: InitArgs) -> Result<i32, CliError> {
    let engine = GdalCliEngine::new();
    let info = engine.dataset_info(&args.input)?;
    println!("Input dataset size {} x {}", info.width, info.height);

    let grid = BlockGrid::new(info.width, info.height, args.scale, args.block_size);
    let mut filters = FilterSet::new();

    if let Some(mask_path) = &args.raster_mask {
        let mask = MaskRaster::from_image_path(mask_path)?;
        println!("Mask dataset size {} x {}", mask.width(), mask.height());
        // An oversized mask is discarded with a warning and every block passes.
        if let Some(filter) = RasterMaskFilter::new(mask, info.width, info.height) {
            filters.push(Box::new(filter));
        }
    }

    if let Some(vector_path) = &args.vector_mask {
        let mask = OgrCliVectorMask::new(vector_path.clone(), args.vector_layer.clone());
        filters.push(Box::new(VectorMaskFilter::new(
            Box::new(mask),
            info.geo_transform,
        )));
    }

    let summary = planner::plan(&args.output, &args.input, &info, &grid, &filters)?;
    println!(
        "Init done with {} data blocks queued from {} ({:.1}%)",
        summary.included,
        summary.total,
        summary.percent()
    );
    Ok(0)
}
