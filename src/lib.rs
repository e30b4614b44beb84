//! # paperwatch
//!
//! A keyword-driven notifier for newly published papers. On each run it
//! retrieves recent records from the enabled bibliographic sources (arXiv,
//! bioRxiv, PubMed), filters them against user-defined keywords, merges the
//! results into a compact title+URL list plus per-source detail files, and
//! delivers them through the enabled notification channels (email,
//! social-media posts). A scheduler drives runs at a fixed interval or at a
//! wall-clock time of day.
//!
//! ## Architecture
//!
//! - [`models`]: Core data structures (Paper, RunOutcome, artifact format)
//! - [`config`]: Run configuration loading and validation
//! - [`sources`]: Source connectors with a trait-based seam
//! - [`pipeline`]: Retrieval with retry, aggregation, dispatch, and the
//!   run controller that ties them together
//! - [`notify`]: Notification channels (email, social)
//! - [`schedule`]: Scheduling loop with injectable clock
//! - [`secrets`]: Credential lookup
//! - [`utils`]: HTTP client and shared helpers

pub mod config;
pub mod models;
pub mod notify;
pub mod pipeline;
pub mod schedule;
pub mod secrets;
pub mod sources;
pub mod utils;

// Re-export commonly used types
pub use models::{Paper, RunOutcome, SourceType};
pub use pipeline::RunController;
pub use sources::Connector;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
