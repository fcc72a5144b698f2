//! Raster nodata-mask filter.
//!
//! A single-band mask image, smaller than the source raster, marks where the
//! source has valid data. Blocks whose mapped mask region sums to zero carry
//! nothing worth downloading and are skipped at planning time.

use super::{BlockFilter, MaskError};
use crate::grid::BlockDescriptor;
use std::path::Path;
use tracing::{info, warn};

/// A single-band mask raster held in memory.
#[derive(Debug, Clone)]
pub struct MaskRaster {
    width: u64,
    height: u64,
    data: Vec<u8>,
}

impl MaskRaster {
    /// Wraps raw band data. `data` is row-major, `width * height` samples.
    pub fn new(width: u64, height: u64, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len() as u64, width * height);
        Self {
            width,
            height,
            data,
        }
    }

    /// Loads band 1 of a mask image from disk as 8-bit luma.
    pub fn from_image_path(path: &Path) -> Result<Self, MaskError> {
        let img = image::open(path)?.into_luma8();
        let (width, height) = (img.width() as u64, img.height() as u64);
        Ok(Self::new(width, height, img.into_raw()))
    }

    pub fn width(&self) -> u64 {
        self.width
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    /// Sum of mask samples inside `[x0, x1) × [y0, y1)`, clamped to the mask.
    fn window_sum(&self, x0: u64, y0: u64, x1: u64, y1: u64) -> u64 {
        let x1 = x1.min(self.width);
        let y1 = y1.min(self.height);
        if x0 >= x1 || y0 >= y1 {
            return 0;
        }
        let mut sum = 0u64;
        for row in y0..y1 {
            let start = (row * self.width + x0) as usize;
            let end = (row * self.width + x1) as usize;
            sum += self.data[start..end].iter().map(|&v| v as u64).sum::<u64>();
        }
        sum
    }

    /// Fraction of the mask that is filled, for the init report.
    pub fn fill_ratio(&self) -> f64 {
        let total: u64 = self.data.iter().map(|&v| v as u64).sum();
        total as f64 / (255.0 * (self.width * self.height) as f64)
    }
}

/// Includes a block iff the mask has any nonzero sample under it.
pub struct RasterMaskFilter {
    mask: MaskRaster,
    mask_scale: u64,
}

impl RasterMaskFilter {
    /// Builds the filter for a mask covering a `src_width` × `src_height`
    /// source raster.
    ///
    /// Returns `None` when the mask is as large as the source (or larger) in
    /// either dimension; such a mask is discarded and every block passes.
    /// A non-uniform scale between the axes is reported as a warning and the
    /// X-axis scale is used.
    pub fn new(mask: MaskRaster, src_width: u64, src_height: u64) -> Option<Self> {
        if mask.width >= src_width || mask.height >= src_height {
            warn!(
                mask_width = mask.width,
                mask_height = mask.height,
                "mask is not smaller than the source raster, discarding it"
            );
            return None;
        }
        let mask_scale = src_width / mask.width;
        if mask_scale != src_height / mask.height {
            warn!(
                x_scale = mask_scale,
                y_scale = src_height / mask.height,
                "mask has a non-uniform scale relative to the source, using the X-axis scale"
            );
        }
        info!(
            fill_pct = (mask.fill_ratio() * 100.0) as u32,
            mask_scale, "raster mask loaded"
        );
        Some(Self { mask, mask_scale })
    }

    pub fn mask_scale(&self) -> u64 {
        self.mask_scale
    }
}

impl BlockFilter for RasterMaskFilter {
    fn includes(&self, block: &BlockDescriptor) -> Result<bool, MaskError> {
        let win = block.mask_window(self.mask_scale);
        Ok(self.mask.window_sum(win.x0, win.y0, win.x1, win.y1) > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 4x4 mask with data only in the top-left quadrant.
    fn quadrant_mask() -> MaskRaster {
        #[rustfmt::skip]
        let data = vec![
            255, 255, 0, 0,
            255, 255, 0, 0,
            0,   0,   0, 0,
            0,   0,   0, 0,
        ];
        MaskRaster::new(4, 4, data)
    }

    fn block(x: u64, y: u64, size: u64) -> BlockDescriptor {
        BlockDescriptor {
            x,
            y,
            width: size,
            height: size,
            scale: 1,
        }
    }

    #[test]
    fn test_block_in_zero_region_is_excluded() {
        // Source 16x16, mask 4x4 -> mask_scale 4.
        let filter = RasterMaskFilter::new(quadrant_mask(), 16, 16).unwrap();
        assert!(!filter.includes(&block(8, 8, 8)).unwrap());
        assert!(!filter.includes(&block(8, 0, 8)).unwrap());
    }

    #[test]
    fn test_block_over_nonzero_pixel_is_included() {
        let filter = RasterMaskFilter::new(quadrant_mask(), 16, 16).unwrap();
        assert!(filter.includes(&block(0, 0, 8)).unwrap());
        // A block straddling the quadrant boundary still overlaps valid data.
        assert!(filter.includes(&block(4, 4, 8)).unwrap());
    }

    #[test]
    fn test_oversized_mask_is_discarded() {
        let mask = MaskRaster::new(16, 16, vec![0; 256]);
        assert!(RasterMaskFilter::new(mask, 16, 16).is_none());
        let mask = MaskRaster::new(32, 4, vec![0; 128]);
        assert!(RasterMaskFilter::new(mask, 16, 16).is_none());
    }

    #[test]
    fn test_non_uniform_scale_uses_x_axis() {
        // 16/4 = 4 on X, 12/4 = 3 on Y: warning, X scale wins.
        let filter = RasterMaskFilter::new(quadrant_mask(), 16, 12).unwrap();
        assert_eq!(filter.mask_scale(), 4);
    }

    #[test]
    fn test_window_sum_clamps_to_mask_extent() {
        let mask = quadrant_mask();
        assert_eq!(mask.window_sum(0, 0, 100, 100), 255 * 4);
        assert_eq!(mask.window_sum(3, 3, 10, 10), 0);
    }

    #[test]
    fn test_fill_ratio() {
        let mask = quadrant_mask();
        assert!((mask.fill_ratio() - 0.25).abs() < 1e-9);
    }
}
