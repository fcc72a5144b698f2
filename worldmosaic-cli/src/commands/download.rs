//! Download command - drain the pending task queue.

use crate::error::CliError;
use clap::{Args, ValueEnum};
use std::path::PathBuf;
use worldmosaic::config::{Compression, DownloadOptions, DEFAULT_TILE_SIZE};
use worldmosaic::engine::gdal_cli::GdalCliEngine;
use worldmosaic::scheduler::Scheduler;
use worldmosaic::store::TaskStore;
use worldmosaic::upload::HttpUploader;

/// Compression codecs accepted on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CompressionArg {
    Jpeg,
    Lzw,
    Packbits,
    Deflate,
    Ccittrle,
    Ccittfax3,
    Ccittfax4,
    Lzma,
    Zstd,
    Lerc,
    LercDeflate,
    LercZstd,
    Webp,
    None,
}

impl From<CompressionArg> for Compression {
    fn from(arg: CompressionArg) -> Self {
        match arg {
            CompressionArg::Jpeg => Compression::JPEG,
            CompressionArg::Lzw => Compression::LZW,
            CompressionArg::Packbits => Compression::PACKBITS,
            CompressionArg::Deflate => Compression::DEFLATE,
            CompressionArg::Ccittrle => Compression::CCITTRLE,
            CompressionArg::Ccittfax3 => Compression::CCITTFAX3,
            CompressionArg::Ccittfax4 => Compression::CCITTFAX4,
            CompressionArg::Lzma => Compression::LZMA,
            CompressionArg::Zstd => Compression::ZSTD,
            CompressionArg::Lerc => Compression::LERC,
            CompressionArg::LercDeflate => Compression::LercDeflate,
            CompressionArg::LercZstd => Compression::LercZstd,
            CompressionArg::Webp => Compression::WEBP,
            CompressionArg::None => Compression::NONE,
        }
    }
}

/// Arguments for the download command.
#[derive(Debug, Args)]
pub struct DownloadArgs {
    /// Output directory holding the task store
    #[arg(short, long)]
    pub output: PathBuf,

    /// Internal tile size of produced block images
    #[arg(short, long, default_value_t = DEFAULT_TILE_SIZE)]
    pub tile_size: u32,

    /// Compression codec for produced block images
    #[arg(short, long, value_enum, default_value = "lzw")]
    pub compress: CompressionArg,

    /// Copy source overviews into block images
    #[arg(long)]
    pub overviews: bool,

    /// Skip content hashing of downloaded blocks
    #[arg(long)]
    pub no_hash: bool,

    /// Upload completed blocks under this base URL
    #[arg(long)]
    pub upload_url: Option<String>,

    /// HTTP proxy as host:port
    #[arg(long)]
    pub proxy: Option<String>,

    /// Keep per-block cache directories after each attempt
    #[arg(long)]
    pub keep_cache: bool,
}

/// Run the download command.
pub fn run(args: DownloadArgs) -> Result<i32, CliError> {
    let store = TaskStore::open(&args.output)?;
    let engine = GdalCliEngine::new();
    let options = DownloadOptions::new()
        .with_tile_size(args.tile_size)
        .with_compression(args.compress.into())
        .with_copy_overviews(args.overviews)
        .with_hash_outputs(!args.no_hash)
        .with_keep_cache(args.keep_cache)
        .with_proxy(args.proxy.clone());

    let uploader = match &args.upload_url {
        Some(url) => Some(HttpUploader::new(url)?),
        None => None,
    };

    let mut scheduler = Scheduler::new(&store, &engine, &args.output, options);
    if let Some(uploader) = &uploader {
        scheduler = scheduler.with_uploader(uploader);
    }
    let report = scheduler.run()?;

    println!(
        "Attempted {} blocks: {} succeeded, {} failed",
        report.attempted, report.succeeded, report.failed
    );
    println!(
        "Completion: {:.1}%",
        store.completion_ratio()? * 100.0
    );
    Ok(0)
}
