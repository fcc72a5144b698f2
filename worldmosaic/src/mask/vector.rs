//! Vector area-of-interest filter.
//!
//! The geometry intersection test itself belongs to an external vector
//! library; this module only turns a grid block into a georeferenced
//! footprint and asks a [`VectorMask`] whether any feature touches it.

use super::{BlockFilter, MaskError};
use crate::geo::{Bounds, GeoTransform};
use crate::grid::BlockDescriptor;

/// Boundary to the external vector-geometry engine.
///
/// Implementations answer whether any feature of the mask layer intersects a
/// georeferenced bounding box.
pub trait VectorMask {
    fn intersects(&self, footprint: &Bounds) -> Result<bool, MaskError>;
}

/// Includes a block iff at least one mask feature intersects its footprint.
pub struct VectorMaskFilter {
    mask: Box<dyn VectorMask>,
    geo_transform: GeoTransform,
}

impl VectorMaskFilter {
    pub fn new(mask: Box<dyn VectorMask>, geo_transform: GeoTransform) -> Self {
        Self {
            mask,
            geo_transform,
        }
    }
}

impl BlockFilter for VectorMaskFilter {
    fn includes(&self, block: &BlockDescriptor) -> Result<bool, MaskError> {
        let win = block.source_window();
        let footprint = self.geo_transform.pixel_bounds(
            win.x as f64,
            win.y as f64,
            (win.x + win.width) as f64,
            (win.y + win.height) as f64,
        );
        self.mask.intersects(&footprint)
    }
}
