//! Download configuration.

use std::fmt;

/// Default output tile size in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 1024;

/// Default nominal block edge length in output pixels.
pub const DEFAULT_BLOCK_SIZE: u64 = 4096;

/// GTiff compression codecs accepted by the raster engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(clippy::upper_case_acronyms)]
pub enum Compression {
    JPEG,
    #[default]
    LZW,
    PACKBITS,
    DEFLATE,
    CCITTRLE,
    CCITTFAX3,
    CCITTFAX4,
    LZMA,
    ZSTD,
    LERC,
    LercDeflate,
    LercZstd,
    WEBP,
    NONE,
}

impl Compression {
    /// The codec name as the engine's creation option expects it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Compression::JPEG => "JPEG",
            Compression::LZW => "LZW",
            Compression::PACKBITS => "PACKBITS",
            Compression::DEFLATE => "DEFLATE",
            Compression::CCITTRLE => "CCITTRLE",
            Compression::CCITTFAX3 => "CCITTFAX3",
            Compression::CCITTFAX4 => "CCITTFAX4",
            Compression::LZMA => "LZMA",
            Compression::ZSTD => "ZSTD",
            Compression::LERC => "LERC",
            Compression::LercDeflate => "LERC_DEFLATE",
            Compression::LercZstd => "LERC_ZSTD",
            Compression::WEBP => "WEBP",
            Compression::NONE => "NONE",
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for one download run.
///
/// # Example
///
/// ```
/// use worldmosaic::config::{Compression, DownloadOptions};
///
/// let opts = DownloadOptions::new()
///     .with_tile_size(512)
///     .with_compression(Compression::DEFLATE)
///     .with_proxy(Some("proxy.local:3128".to_string()));
/// assert_eq!(opts.tile_size(), 512);
/// assert!(opts.hash_outputs());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOptions {
    /// Internal tiling of the produced block images.
    tile_size: u32,
    /// Compression codec for the produced block images.
    compression: Compression,
    /// Copy source overviews into the block images.
    copy_overviews: bool,
    /// Keep per-task cache namespaces after each attempt.
    keep_cache: bool,
    /// Hash downloaded files and store the digest in the ledger.
    hash_outputs: bool,
    /// HTTP proxy (`host:port`) passed to the raster engine.
    proxy: Option<String>,
}

impl DownloadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = tile_size;
        self
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_copy_overviews(mut self, copy: bool) -> Self {
        self.copy_overviews = copy;
        self
    }

    /// Retain per-task cache directories after each attempt.
    ///
    /// Off by default: the cache otherwise grows without bound over a
    /// long-running multi-block session.
    pub fn with_keep_cache(mut self, keep: bool) -> Self {
        self.keep_cache = keep;
        self
    }

    pub fn with_hash_outputs(mut self, hash: bool) -> Self {
        self.hash_outputs = hash;
        self
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    pub fn copy_overviews(&self) -> bool {
        self.copy_overviews
    }

    pub fn keep_cache(&self) -> bool {
        self.keep_cache
    }

    pub fn hash_outputs(&self) -> bool {
        self.hash_outputs
    }

    pub fn proxy(&self) -> Option<&str> {
        self.proxy.as_deref()
    }
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
            compression: Compression::default(),
            copy_overviews: false,
            keep_cache: false,
            hash_outputs: true,
            proxy: None,
        }
    }
}
