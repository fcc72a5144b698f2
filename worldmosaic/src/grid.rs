//! Block grid planning.
//!
//! [`BlockGrid`] partitions a large source raster into a grid of rectangular
//! blocks in output-pixel space. Each block is the unit of download and of
//! task-store bookkeeping. Edge blocks are clamped so the grid tiles the
//! output extent exactly, with no gaps or overlaps.

use std::path::{Path, PathBuf};

/// File name prefix for downloaded block images.
pub const BLOCK_FILE_PREFIX: &str = "block";

/// File extension for downloaded block images.
pub const BLOCK_FILE_EXT: &str = "tif";

/// A rectangular window in source-pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceWindow {
    pub x: u64,
    pub y: u64,
    pub width: u64,
    pub height: u64,
}

/// A rectangular region in an auxiliary (mask) raster's pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaskWindow {
    pub x0: u64,
    pub y0: u64,
    pub x1: u64,
    pub y1: u64,
}

/// One block of the output raster.
///
/// Offsets and dimensions are in output-pixel space. `width`/`height` equal
/// the grid's block size except at the right and bottom edges, where they are
/// clamped to the output extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockDescriptor {
    /// Block origin X in output pixels.
    pub x: u64,
    /// Block origin Y in output pixels.
    pub y: u64,
    /// Block width in output pixels.
    pub width: u64,
    /// Block height in output pixels.
    pub height: u64,
    /// Source-pixels-per-output-pixel scale factor.
    pub scale: u64,
}

impl BlockDescriptor {
    /// The window this block covers in source-pixel space.
    pub fn source_window(&self) -> SourceWindow {
        SourceWindow {
            x: self.x * self.scale,
            y: self.y * self.scale,
            width: self.width * self.scale,
            height: self.height * self.scale,
        }
    }

    /// Maps the block's bounds into an auxiliary raster's pixel space.
    ///
    /// `mask_scale` is the auxiliary raster's scale relative to the source
    /// raster (source pixels per mask pixel). Boundaries are truncated to
    /// integers.
    pub fn mask_window(&self, mask_scale: u64) -> MaskWindow {
        MaskWindow {
            x0: self.x * self.scale / mask_scale,
            y0: self.y * self.scale / mask_scale,
            x1: (self.x + self.width) * self.scale / mask_scale,
            y1: (self.y + self.height) * self.scale / mask_scale,
        }
    }

    /// Deterministic output file name derived from the block offset.
    pub fn file_name(&self) -> String {
        block_file_name(self.x, self.y)
    }
}

/// File name for the block at output-pixel offset `(x, y)`.
pub fn block_file_name(x: u64, y: u64) -> String {
    format!("{}_{}_{}.{}", BLOCK_FILE_PREFIX, x, y, BLOCK_FILE_EXT)
}

/// Full path of a block file inside the output directory.
pub fn block_file_path(output_dir: &Path, file_name: &str) -> PathBuf {
    output_dir.join(file_name)
}

/// The block grid for one source dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockGrid {
    src_width: u64,
    src_height: u64,
    scale: u64,
    block_size: u64,
}

impl BlockGrid {
    /// Creates a grid over a source raster of `src_width` × `src_height`
    /// pixels, downsampled by `scale`, cut into `block_size`-pixel blocks.
    ///
    /// Counts use ceiling division so a partial edge block is still a block.
    pub fn new(src_width: u64, src_height: u64, scale: u64, block_size: u64) -> Self {
        debug_assert!(scale > 0 && block_size > 0);
        Self {
            src_width,
            src_height,
            scale,
            block_size,
        }
    }

    /// Output raster width in output pixels.
    pub fn out_width(&self) -> u64 {
        self.src_width.div_ceil(self.scale)
    }

    /// Output raster height in output pixels.
    pub fn out_height(&self) -> u64 {
        self.src_height.div_ceil(self.scale)
    }

    /// Number of block columns.
    pub fn block_count_x(&self) -> u64 {
        self.out_width().div_ceil(self.block_size)
    }

    /// Number of block rows.
    pub fn block_count_y(&self) -> u64 {
        self.out_height().div_ceil(self.block_size)
    }

    /// Total number of blocks in the grid.
    pub fn block_count(&self) -> u64 {
        self.block_count_x() * self.block_count_y()
    }

    /// Nominal block edge length in output pixels.
    pub fn block_size(&self) -> u64 {
        self.block_size
    }

    /// Scale factor mapping output pixels to source pixels.
    pub fn scale(&self) -> u64 {
        self.scale
    }

    /// Clamped block dimensions for a block at output-pixel offset `(x, y)`.
    ///
    /// Used to rebuild a block's true extent from a persisted task record,
    /// which stores only the nominal block size.
    pub fn clip(&self, x: u64, y: u64) -> (u64, u64) {
        let width = self.block_size.min(self.out_width().saturating_sub(x));
        let height = self.block_size.min(self.out_height().saturating_sub(y));
        (width, height)
    }

    /// Lazy row-major iteration over all block descriptors.
    pub fn blocks(&self) -> impl Iterator<Item = BlockDescriptor> + '_ {
        let cols = self.block_count_x();
        let rows = self.block_count_y();
        (0..rows).flat_map(move |row| {
            (0..cols).map(move |col| {
                let x = col * self.block_size;
                let y = row * self.block_size;
                let (width, height) = self.clip(x, y);
                BlockDescriptor {
                    x,
                    y,
                    width,
                    height,
                    scale: self.scale,
                }
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_even_grid_has_expected_offsets() {
        // The canonical scenario: 8192x8192 at scale 1, 4096 blocks.
        let grid = BlockGrid::new(8192, 8192, 1, 4096);
        let blocks: Vec<_> = grid.blocks().collect();
        assert_eq!(blocks.len(), 4);
        let offsets: Vec<_> = blocks.iter().map(|b| (b.x, b.y)).collect();
        assert_eq!(offsets, vec![(0, 0), (4096, 0), (0, 4096), (4096, 4096)]);
        assert!(blocks.iter().all(|b| b.width == 4096 && b.height == 4096));
    }

    #[test]
    fn test_partial_edge_blocks_use_ceiling_division() {
        let grid = BlockGrid::new(10000, 6000, 1, 4096);
        assert_eq!(grid.block_count_x(), 3);
        assert_eq!(grid.block_count_y(), 2);
        let last = grid.blocks().last().unwrap();
        assert_eq!((last.x, last.y), (8192, 4096));
        assert_eq!((last.width, last.height), (10000 - 8192, 6000 - 4096));
    }

    #[test]
    fn test_blocks_tile_output_extent_exactly() {
        for (w, h, scale, bs) in [
            (8192u64, 8192u64, 1u64, 4096u64),
            (10001, 7003, 2, 1024),
            (513, 511, 1, 256),
            (100, 100, 3, 64),
        ] {
            let grid = BlockGrid::new(w, h, scale, bs);
            let mut covered = 0u64;
            for b in grid.blocks() {
                assert!(b.width <= bs && b.height <= bs);
                assert!(b.width > 0 && b.height > 0);
                assert!(b.x + b.width <= grid.out_width());
                assert!(b.y + b.height <= grid.out_height());
                covered += b.width * b.height;
            }
            // Row-major, non-overlapping blocks covering the full area.
            assert_eq!(covered, grid.out_width() * grid.out_height());
        }
    }

    #[test]
    fn test_source_window_scales_offsets() {
        let grid = BlockGrid::new(16384, 16384, 2, 4096);
        let block = grid.blocks().nth(1).unwrap();
        assert_eq!((block.x, block.y), (4096, 0));
        let win = block.source_window();
        assert_eq!((win.x, win.y), (8192, 0));
        assert_eq!((win.width, win.height), (8192, 8192));
    }

    #[test]
    fn test_mask_window_truncates_boundaries() {
        let block = BlockDescriptor {
            x: 100,
            y: 50,
            width: 100,
            height: 100,
            scale: 3,
        };
        let win = block.mask_window(7);
        assert_eq!(win.x0, 100 * 3 / 7);
        assert_eq!(win.y0, 50 * 3 / 7);
        assert_eq!(win.x1, 200 * 3 / 7);
        assert_eq!(win.y1, 150 * 3 / 7);
    }

    #[test]
    fn test_file_name_is_unique_per_offset() {
        let grid = BlockGrid::new(10000, 10000, 1, 1024);
        let mut names: Vec<_> = grid.blocks().map(|b| b.file_name()).collect();
        let total = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), total);
        assert_eq!(block_file_name(0, 4096), "block_0_4096.tif");
    }
}
