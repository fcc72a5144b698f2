//! CLI error handling with user-facing messages.

use std::fmt;
use std::process;
use worldmosaic::engine::EngineError;
use worldmosaic::mask::MaskError;
use worldmosaic::planner::PlanError;
use worldmosaic::scheduler::ScheduleError;
use worldmosaic::store::StoreError;
use worldmosaic::upload::UploadError;
use worldmosaic::verifier::MergeError;

/// CLI-level errors. All of them terminate the current action.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging.
    LoggingInit(std::io::Error),
    /// The source dataset could not be inspected.
    Engine(EngineError),
    /// A mask could not be loaded.
    Mask(MaskError),
    /// Planning failed.
    Plan(PlanError),
    /// The task store could not be opened or written.
    Storage(StoreError),
    /// The download loop hit a fatal error.
    Schedule(ScheduleError),
    /// The merge action hit a fatal error.
    Merge(MergeError),
    /// The uploader could not be constructed.
    Upload(UploadError),
}

impl CliError {
    /// Exits the process with a diagnostic message and code 1.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        if let CliError::Storage(StoreError::NotInitialized(_)) = self {
            eprintln!();
            eprintln!("Run `worldmosaic init` against this output directory first.");
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(e) => write!(f, "failed to initialize logging: {}", e),
            CliError::Engine(e) => write!(f, "raster engine error: {}", e),
            CliError::Mask(e) => write!(f, "mask error: {}", e),
            CliError::Plan(e) => write!(f, "planning failed: {}", e),
            CliError::Storage(e) => write!(f, "task store error: {}", e),
            CliError::Schedule(e) => write!(f, "download failed: {}", e),
            CliError::Merge(e) => write!(f, "merge failed: {}", e),
            CliError::Upload(e) => write!(f, "uploader error: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::LoggingInit(e) => Some(e),
            CliError::Engine(e) => Some(e),
            CliError::Mask(e) => Some(e),
            CliError::Plan(e) => Some(e),
            CliError::Storage(e) => Some(e),
            CliError::Schedule(e) => Some(e),
            CliError::Merge(e) => Some(e),
            CliError::Upload(e) => Some(e),
        }
    }
}

impl From<EngineError> for CliError {
    fn from(e: EngineError) -> Self {
        CliError::Engine(e)
    }
}

impl From<MaskError> for CliError {
    fn from(e: MaskError) -> Self {
        CliError::Mask(e)
    }
}

impl From<PlanError> for CliError {
    fn from(e: PlanError) -> Self {
        CliError::Plan(e)
    }
}

impl From<StoreError> for CliError {
    fn from(e: StoreError) -> Self {
        CliError::Storage(e)
    }
}

impl From<ScheduleError> for CliError {
    fn from(e: ScheduleError) -> Self {
        CliError::Schedule(e)
    }
}

impl From<MergeError> for CliError {
    fn from(e: MergeError) -> Self {
        CliError::Merge(e)
    }
}

impl From<UploadError> for CliError {
    fn from(e: UploadError) -> Self {
        CliError::Upload(e)
    }
}
