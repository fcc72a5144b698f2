//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and a
//! handler:
//!
//! - [`init`] - Plan the block grid and populate the task store
//! - [`download`] - Drain the pending task queue
//! - [`merge`] - Verify completed blocks and build the mosaic

pub mod download;
pub mod init;
pub mod merge;
