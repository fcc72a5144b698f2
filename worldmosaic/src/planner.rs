//! Planning: populate the task ledger for one dataset.
//!
//! Run once per dataset. Wipes the output directory and any previous ledger,
//! walks the block grid, applies the inclusion filters, and bulk-inserts the
//! surviving blocks one grid row per transaction.

use crate::engine::DatasetInfo;
use crate::grid::BlockGrid;
use crate::mask::{FilterSet, MaskError};
use crate::store::{NewTask, StoreError, TaskStore};
use std::path::Path;
use thiserror::Error;

/// Fatal planning errors. Both kinds abort the init action.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("could not reset output directory: {0}")]
    OutputDir(#[from] std::io::Error),

    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error(transparent)]
    Mask(#[from] MaskError),
}

/// Result of one planning run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanSummary {
    /// Blocks that passed the inclusion filters and were queued.
    pub included: u64,
    /// Total blocks in the grid.
    pub total: u64,
}

impl PlanSummary {
    /// Included blocks as a percentage of the grid.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        100.0 * self.included as f64 / self.total as f64
    }
}

/// Wipes `output_dir` and fills a fresh ledger with the included blocks of
/// `grid` over the dataset `input`.
pub fn plan(
    output_dir: &Path,
    input: &str,
    info: &DatasetInfo,
    grid: &BlockGrid,
    filters: &FilterSet,
) -> Result<PlanSummary, PlanError> {
    tracing::info!(
        src_width = info.width,
        src_height = info.height,
        out_width = grid.out_width(),
        out_height = grid.out_height(),
        block_size = grid.block_size(),
        blocks_x = grid.block_count_x(),
        blocks_y = grid.block_count_y(),
        "planning block grid"
    );

    // Replace the prior run entirely: ledger, block files, caches.
    match std::fs::remove_dir_all(output_dir) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    std::fs::create_dir_all(output_dir)?;

    let mut store = TaskStore::create(output_dir)?;
    let mut included = 0u64;
    let mut total = 0u64;
    let mut current_row = 0u64;
    let mut batch: Vec<NewTask> = Vec::with_capacity(grid.block_count_x() as usize);

    for block in grid.blocks() {
        if block.y != current_row {
            store.bulk_insert(&batch)?;
            batch.clear();
            current_row = block.y;
        }
        total += 1;
        if !filters.includes(&block)? {
            continue;
        }
        included += 1;
        batch.push(NewTask {
            input: input.to_string(),
            file_name: block.file_name(),
            block_size: grid.block_size(),
            x: block.x,
            y: block.y,
            scale: block.scale,
        });
    }
    store.bulk_insert(&batch)?;

    let summary = PlanSummary { included, total };
    tracing::info!(
        included = summary.included,
        total = summary.total,
        percent = %format!("{:.1}", summary.percent()),
        "planning complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoTransform;
    use crate::grid::BlockDescriptor;
    use crate::mask::BlockFilter;
    use tempfile::TempDir;

    fn info(width: u64, height: u64) -> DatasetInfo {
        DatasetInfo {
            width,
            height,
            geo_transform: GeoTransform([0.0, 1.0, 0.0, 0.0, 0.0, 1.0]),
        }
    }

    #[test]
    fn test_plan_queues_all_blocks_without_filters() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");
        let grid = BlockGrid::new(8192, 8192, 1, 4096);
        let summary = plan(&out, "wms.xml", &info(8192, 8192), &grid, &FilterSet::new()).unwrap();
        assert_eq!(summary, PlanSummary { included: 4, total: 4 });
        assert_eq!(summary.percent(), 100.0);

        let store = TaskStore::open(&out).unwrap();
        assert_eq!(store.task_count().unwrap(), 4);
        assert_eq!(store.pending_count().unwrap(), 4);
    }

    #[test]
    fn test_plan_replaces_previous_run() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");
        let grid = BlockGrid::new(8192, 8192, 1, 4096);
        plan(&out, "a.xml", &info(8192, 8192), &grid, &FilterSet::new()).unwrap();

        // Leave a stale block file behind, then re-plan with a smaller grid.
        std::fs::write(out.join("block_0_0.tif"), b"stale").unwrap();
        let grid = BlockGrid::new(4096, 4096, 1, 4096);
        plan(&out, "b.xml", &info(4096, 4096), &grid, &FilterSet::new()).unwrap();

        assert!(!out.join("block_0_0.tif").exists());
        let store = TaskStore::open(&out).unwrap();
        assert_eq!(store.task_count().unwrap(), 1);
        assert_eq!(store.next_pending().unwrap().unwrap().input, "b.xml");
    }

    struct SkipOrigin;

    impl BlockFilter for SkipOrigin {
        fn includes(&self, block: &BlockDescriptor) -> Result<bool, MaskError> {
            Ok(!(block.x == 0 && block.y == 0))
        }
    }

    #[test]
    fn test_plan_applies_filters() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");
        let grid = BlockGrid::new(8192, 8192, 1, 4096);
        let mut filters = FilterSet::new();
        filters.push(Box::new(SkipOrigin));
        let summary = plan(&out, "wms.xml", &info(8192, 8192), &grid, &filters).unwrap();
        assert_eq!(summary, PlanSummary { included: 3, total: 4 });

        let store = TaskStore::open(&out).unwrap();
        let first = store.next_pending().unwrap().unwrap();
        assert_ne!((first.x, first.y), (0, 0));
    }
}
