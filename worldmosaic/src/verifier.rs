//! Verification and mosaic assembly.
//!
//! Before the mosaic is built, every completed block is re-validated on disk:
//! the file must exist and, when verification is enabled and a hash was
//! recorded, its content hash must still match the ledger. Any failure
//! requeues the block and skips the mosaic entirely, so the mosaic can never
//! silently include corrupt or stale tiles.

use crate::engine::{EngineError, RasterEngine};
use crate::grid::block_file_path;
use crate::hash::sha256_file;
use crate::store::{StoreError, TaskStore};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// File name of the produced mosaic artifact.
pub const MOSAIC_FILE_NAME: &str = "merge.vrt";

/// Fatal merge errors.
#[derive(Debug, Error)]
pub enum MergeError {
    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("no completed blocks to merge, run download first")]
    NoCompletedBlocks,
}

/// Result of one merge run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// All completed blocks passed re-validation and the mosaic was built.
    Merged {
        mosaic: PathBuf,
        files: Vec<PathBuf>,
    },
    /// Some blocks failed re-validation and were reset to pending; the
    /// mosaic was not built. A download run must follow.
    Requeued { file_names: Vec<String> },
}

/// Re-validates completed blocks and hands the survivors to the mosaic
/// builder.
pub fn merge<E: RasterEngine>(
    store: &mut TaskStore,
    engine: &E,
    output_dir: &Path,
    verify: bool,
) -> Result<MergeOutcome, MergeError> {
    let completed = store.completed_tasks()?;
    if completed.is_empty() {
        return Err(MergeError::NoCompletedBlocks);
    }
    info!(blocks = completed.len(), verify, "validating completed blocks");

    let mut valid_files = Vec::with_capacity(completed.len());
    let mut failures = Vec::new();
    for task in &completed {
        let path = block_file_path(output_dir, &task.file_name);
        if !path.is_file() {
            warn!(block = %task.file_name, "block file is missing");
            failures.push(task.file_name.clone());
            continue;
        }
        if verify {
            if let Some(recorded) = &task.file_hash {
                match sha256_file(&path) {
                    Ok(current) if &current == recorded => {}
                    Ok(_) => {
                        warn!(block = %task.file_name, "block content hash mismatch");
                        failures.push(task.file_name.clone());
                        continue;
                    }
                    Err(e) => {
                        warn!(block = %task.file_name, error = %e, "block file unreadable");
                        failures.push(task.file_name.clone());
                        continue;
                    }
                }
            }
        }
        valid_files.push(path);
    }

    if !failures.is_empty() {
        let requeued = store.requeue(&failures)?;
        warn!(requeued, "verification failed, blocks requeued; mosaic skipped");
        return Ok(MergeOutcome::Requeued {
            file_names: failures,
        });
    }

    let info = engine.dataset_info(&completed[0].input)?;
    let bounds = info.bounds();
    let mosaic = output_dir.join(MOSAIC_FILE_NAME);
    engine.build_mosaic(&mosaic, &valid_files, bounds)?;
    info!(
        mosaic = %mosaic.display(),
        files = valid_files.len(),
        "mosaic built"
    );
    Ok(MergeOutcome::Merged {
        mosaic,
        files: valid_files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DownloadOptions;
    use crate::scheduler::tests::{planned_store, MockEngine};
    use crate::scheduler::Scheduler;
    use tempfile::TempDir;

    fn downloaded(out: &Path, engine: &MockEngine) -> TaskStore {
        let store = planned_store(out, engine);
        Scheduler::new(&store, engine, out, DownloadOptions::default())
            .run()
            .unwrap();
        store
    }

    #[test]
    fn test_merge_builds_mosaic_from_all_blocks() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");
        let engine = MockEngine::new(8192, 8192);
        let mut store = downloaded(&out, &engine);

        let outcome = merge(&mut store, &engine, &out, true).unwrap();
        match outcome {
            MergeOutcome::Merged { mosaic, files } => {
                assert_eq!(files.len(), 4);
                assert!(mosaic.is_file());
            }
            other => panic!("expected merge, got {:?}", other),
        }
        assert_eq!(engine.mosaics_built.borrow().len(), 1);
    }

    #[test]
    fn test_missing_file_is_requeued_and_mosaic_skipped() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");
        let engine = MockEngine::new(8192, 8192);
        let mut store = downloaded(&out, &engine);

        std::fs::remove_file(out.join("block_4096_0.tif")).unwrap();
        let outcome = merge(&mut store, &engine, &out, true).unwrap();
        assert_eq!(
            outcome,
            MergeOutcome::Requeued {
                file_names: vec!["block_4096_0.tif".to_string()],
            }
        );
        assert!(engine.mosaics_built.borrow().is_empty());
        assert_eq!(store.pending_count().unwrap(), 1);

        // Re-running download then merge succeeds.
        Scheduler::new(&store, &engine, &out, DownloadOptions::default())
            .run()
            .unwrap();
        let outcome = merge(&mut store, &engine, &out, true).unwrap();
        assert!(matches!(outcome, MergeOutcome::Merged { .. }));
    }

    #[test]
    fn test_hash_mismatch_is_requeued() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");
        let engine = MockEngine::new(4096, 4096);
        let mut store = downloaded(&out, &engine);

        std::fs::write(out.join("block_0_0.tif"), b"tampered").unwrap();
        let outcome = merge(&mut store, &engine, &out, true).unwrap();
        assert!(matches!(outcome, MergeOutcome::Requeued { .. }));
        let requeued = store.next_pending().unwrap().unwrap();
        assert_eq!(requeued.file_hash, None);
        assert_eq!(requeued.file_url, None);
    }

    #[test]
    fn test_verification_can_be_disabled() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");
        let engine = MockEngine::new(4096, 4096);
        let mut store = downloaded(&out, &engine);

        // Tampered content passes when verification is off; a missing file
        // still fails.
        std::fs::write(out.join("block_0_0.tif"), b"tampered").unwrap();
        let outcome = merge(&mut store, &engine, &out, false).unwrap();
        assert!(matches!(outcome, MergeOutcome::Merged { .. }));
    }

    #[test]
    fn test_merge_without_completed_blocks_is_an_error() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");
        let engine = MockEngine::new(4096, 4096);
        let mut store = planned_store(&out, &engine);

        let err = merge(&mut store, &engine, &out, true).unwrap_err();
        assert!(matches!(err, MergeError::NoCompletedBlocks));
    }
}
