//! The run pipeline: retrieval, aggregation, dispatch, cleanup.

mod artifacts;
pub mod aggregate;
mod dispatch;
mod retrieval;
mod runner;

pub use artifacts::{ArtifactStore, COMPACT_FILE};
pub use dispatch::dispatch;
pub use retrieval::retrieve_with_retry;
pub use runner::RunController;
