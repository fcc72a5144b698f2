//! Download scheduler.
//!
//! Drains the pending side of the task ledger one block at a time. Every
//! attempt's outcome is durably recorded before the next selection, so a
//! killed process loses at most the attempt in flight and resumption is just
//! re-running the download action.
//!
//! One run makes at most one attempt per block that was pending when it
//! started; blocks that fail stay pending and come around again on the next
//! invocation, after every other pending block has had its turn.

use crate::config::DownloadOptions;
use crate::engine::{
    CreationProfile, EngineContext, EngineError, FetchOutcome, FetchRequest, RasterEngine,
};
use crate::grid::{block_file_path, BlockGrid, SourceWindow};
use crate::hash::sha256_file;
use crate::store::{now_ms, StoreError, TaskRecord, TaskStore};
use crate::upload::Uploader;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Directory under the output directory holding per-task cache namespaces.
const CACHE_DIR_NAME: &str = "cache";

/// Fatal scheduler errors. Per-block fetch and upload failures are not
/// errors; they are recorded attempt outcomes.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Attempt counts for one scheduler run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    pub attempted: u64,
    pub succeeded: u64,
    pub failed: u64,
}

/// Single-threaded download loop over the task ledger.
///
/// Exactly one block is in flight at a time; the bounded-cache invariant
/// (one transient cache namespace, dropped after each attempt) assumes it.
pub struct Scheduler<'a, E: RasterEngine> {
    store: &'a TaskStore,
    engine: &'a E,
    uploader: Option<&'a dyn Uploader>,
    output_dir: PathBuf,
    options: DownloadOptions,
    dataset_cache: HashMap<String, crate::engine::DatasetInfo>,
}

impl<'a, E: RasterEngine> Scheduler<'a, E> {
    pub fn new(
        store: &'a TaskStore,
        engine: &'a E,
        output_dir: &Path,
        options: DownloadOptions,
    ) -> Self {
        Self {
            store,
            engine,
            uploader: None,
            output_dir: output_dir.to_path_buf(),
            options,
            dataset_cache: HashMap::new(),
        }
    }

    /// Enables upload of completed blocks.
    pub fn with_uploader(mut self, uploader: &'a dyn Uploader) -> Self {
        self.uploader = Some(uploader);
        self
    }

    /// Runs the selection loop until no pending task is left or every task
    /// pending at the start has been attempted once.
    pub fn run(&mut self) -> Result<RunReport, ScheduleError> {
        let budget = self.store.pending_count()?;
        let mut report = RunReport::default();

        for _ in 0..budget {
            let Some(task) = self.store.next_pending()? else {
                break;
            };
            let ratio = self.store.completion_ratio()?;
            info!(
                progress = %format!("{:.1}%", ratio * 100.0),
                block = %task.file_name,
                "attempting block"
            );

            report.attempted += 1;
            if self.attempt(&task)? {
                report.succeeded += 1;
            } else {
                report.failed += 1;
            }
        }

        info!(
            attempted = report.attempted,
            succeeded = report.succeeded,
            failed = report.failed,
            "download run finished"
        );
        Ok(report)
    }

    /// Performs one attempt and records its outcome. Returns whether the
    /// block completed.
    fn attempt(&mut self, task: &TaskRecord) -> Result<bool, ScheduleError> {
        // Each block gets its own cache namespace so a crash mid-fetch cannot
        // corrupt another block's cache.
        let cache_dir = self
            .output_dir
            .join(CACHE_DIR_NAME)
            .join(format!("wms_{}_{}", task.x, task.y));
        let ctx = EngineContext {
            cache_dir: cache_dir.clone(),
            proxy: self.options.proxy().map(str::to_string),
        };
        let request = self.fetch_request(task)?;

        let outcome = self.engine.fetch_block(&ctx, &request);
        let complete = match outcome {
            FetchOutcome::Fetched(path) => self.record_success(task, &path)?,
            FetchOutcome::Failed(reason) => {
                warn!(block = %task.file_name, reason = %reason, "block fetch failed");
                self.store
                    .mark_attempt(task.id, false, None, None, now_ms())?;
                false
            }
        };

        if !self.options.keep_cache() {
            // Bound local disk usage to roughly one block's transient cache.
            let _ = std::fs::remove_dir_all(&cache_dir);
        }
        Ok(complete)
    }

    fn record_success(&self, task: &TaskRecord, path: &Path) -> Result<bool, ScheduleError> {
        let file_hash = if self.options.hash_outputs() {
            match sha256_file(path) {
                Ok(hash) => Some(hash),
                Err(e) => {
                    // A block we cannot hash cannot be verified later; count
                    // the attempt as failed and let it come around again.
                    warn!(block = %task.file_name, error = %e, "hashing downloaded block failed");
                    self.store
                        .mark_attempt(task.id, false, None, None, now_ms())?;
                    return Ok(false);
                }
            }
        } else {
            None
        };

        let file_url = match self.uploader {
            Some(uploader) => match uploader.upload(path) {
                Ok(url) => {
                    info!(block = %task.file_name, url = %url, "block uploaded");
                    Some(url)
                }
                Err(e) => {
                    warn!(block = %task.file_name, error = %e, "block upload failed");
                    None
                }
            },
            None => None,
        };

        self.store.mark_attempt(
            task.id,
            true,
            file_url.as_deref(),
            file_hash.as_deref(),
            now_ms(),
        )?;
        Ok(true)
    }

    /// Builds the engine request for one task, clamping the window and the
    /// output size at the dataset edge.
    fn fetch_request(&mut self, task: &TaskRecord) -> Result<FetchRequest, ScheduleError> {
        let info = match self.dataset_cache.get(&task.input) {
            Some(info) => *info,
            None => {
                let info = self.engine.dataset_info(&task.input)?;
                self.dataset_cache.insert(task.input.clone(), info);
                info
            }
        };
        let grid = BlockGrid::new(info.width, info.height, task.scale, task.block_size);
        let (out_width, out_height) = grid.clip(task.x, task.y);
        Ok(FetchRequest {
            input: task.input.clone(),
            out_path: block_file_path(&self.output_dir, &task.file_name),
            window: SourceWindow {
                x: task.x * task.scale,
                y: task.y * task.scale,
                width: out_width * task.scale,
                height: out_height * task.scale,
            },
            out_width,
            out_height,
            profile: CreationProfile {
                tile_size: self.options.tile_size(),
                compression: self.options.compression(),
                copy_overviews: self.options.copy_overviews(),
            },
        })
    }
}
