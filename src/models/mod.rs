//! Core data models.

mod outcome;
mod paper;

pub use outcome::{ChannelStatus, RunOutcome, SourceStatus};
pub use paper::{Paper, SourceType};
