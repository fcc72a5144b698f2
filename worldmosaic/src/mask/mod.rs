//! Block inclusion filters.
//!
//! A filter decides whether a candidate grid block is worth downloading at
//! all. Two kinds exist: a raster nodata mask ([`raster::RasterMaskFilter`])
//! and a vector area-of-interest mask ([`vector::VectorMaskFilter`]). Filters
//! compose with AND semantics via [`FilterSet`]; an empty set includes every
//! block.

pub mod raster;
pub mod vector;

use crate::grid::BlockDescriptor;
use thiserror::Error;

/// Errors raised while evaluating an inclusion filter.
#[derive(Debug, Error)]
pub enum MaskError {
    /// The mask image could not be opened or decoded.
    #[error("failed to read mask image: {0}")]
    Image(#[from] image::ImageError),

    /// The vector mask layer could not be queried.
    #[error("vector mask query failed: {0}")]
    VectorQuery(String),
}

/// Predicate over a candidate block.
pub trait BlockFilter {
    /// Returns true if the block should be queued for download.
    fn includes(&self, block: &BlockDescriptor) -> Result<bool, MaskError>;
}

/// A conjunction of inclusion filters.
///
/// A block is included iff every active filter agrees.
#[derive(Default)]
pub struct FilterSet {
    filters: Vec<Box<dyn BlockFilter>>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a filter to the set.
    pub fn push(&mut self, filter: Box<dyn BlockFilter>) {
        self.filters.push(filter);
    }

    /// Number of active filters.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Evaluates all filters against a block.
    pub fn includes(&self, block: &BlockDescriptor) -> Result<bool, MaskError> {
        for filter in &self.filters {
            if !filter.includes(block)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedFilter(bool);

    impl BlockFilter for FixedFilter {
        fn includes(&self, _block: &BlockDescriptor) -> Result<bool, MaskError> {
            Ok(self.0)
        }
    }

    fn any_block() -> BlockDescriptor {
        BlockDescriptor {
            x: 0,
            y: 0,
            width: 64,
            height: 64,
            scale: 1,
        }
    }

    #[test]
    fn test_empty_set_includes_everything() {
        let set = FilterSet::new();
        assert!(set.includes(&any_block()).unwrap());
    }

    #[test]
    fn test_all_filters_must_agree() {
        let mut set = FilterSet::new();
        set.push(Box::new(FixedFilter(true)));
        set.push(Box::new(FixedFilter(false)));
        assert!(!set.includes(&any_block()).unwrap());

        let mut set = FilterSet::new();
        set.push(Box::new(FixedFilter(true)));
        set.push(Box::new(FixedFilter(true)));
        assert!(set.includes(&any_block()).unwrap());
    }
}
