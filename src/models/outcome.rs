//! Run outcome bookkeeping.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::SourceType;

/// Final status of one source's retrieval for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    /// The artifact existed and was non-empty within the retry budget
    Success,
    /// Retries exhausted; the artifact existed but was empty on the final attempt
    Empty,
    /// Retries exhausted; the artifact never existed
    Failed,
    /// The source was not enabled for this run
    Skipped,
}

impl SourceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceStatus::Success => "success",
            SourceStatus::Empty => "empty",
            SourceStatus::Failed => "failed",
            SourceStatus::Skipped => "skipped",
        }
    }
}

/// Final status of one channel's delivery for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelStatus {
    Success,
    Failed,
    /// The channel was not enabled for this run
    NotRun,
}

impl ChannelStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelStatus::Success => "success",
            ChannelStatus::Failed => "failed",
            ChannelStatus::NotRun => "not run",
        }
    }
}

/// Observational record of one run: per-source and per-channel status.
///
/// Logged at the end of a run and written to the scheduler's cycle log;
/// never persisted beyond that.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunOutcome {
    pub per_source: BTreeMap<SourceType, SourceStatus>,
    pub per_channel: BTreeMap<String, ChannelStatus>,
}

impl RunOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_source(&mut self, source: SourceType, status: SourceStatus) {
        self.per_source.insert(source, status);
    }

    pub fn record_channel(&mut self, channel: impl Into<String>, status: ChannelStatus) {
        self.per_channel.insert(channel.into(), status);
    }

    /// Sources whose retrieval produced a non-empty artifact.
    pub fn successful_sources(&self) -> Vec<SourceType> {
        self.per_source
            .iter()
            .filter(|(_, s)| **s == SourceStatus::Success)
            .map(|(source, _)| *source)
            .collect()
    }

    /// Human-readable end-of-run summary, one line per source and channel.
    pub fn summary(&self) -> String {
        let mut lines = vec!["Run summary:".to_string()];
        for (source, status) in &self.per_source {
            lines.push(format!("  source {}: {}", source.name(), status.as_str()));
        }
        for (channel, status) in &self.per_channel {
            lines.push(format!("  channel {}: {}", channel, status.as_str()));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_lists_every_entry() {
        let mut outcome = RunOutcome::new();
        outcome.record_source(SourceType::Arxiv, SourceStatus::Success);
        outcome.record_source(SourceType::PubMed, SourceStatus::Failed);
        outcome.record_channel("email", ChannelStatus::Success);
        outcome.record_channel("social", ChannelStatus::NotRun);

        let summary = outcome.summary();
        assert!(summary.contains("source arXiv: success"));
        assert!(summary.contains("source PubMed: failed"));
        assert!(summary.contains("channel email: success"));
        assert!(summary.contains("channel social: not run"));
    }

    #[test]
    fn test_successful_sources() {
        let mut outcome = RunOutcome::new();
        outcome.record_source(SourceType::Arxiv, SourceStatus::Success);
        outcome.record_source(SourceType::BioRxiv, SourceStatus::Empty);
        outcome.record_source(SourceType::PubMed, SourceStatus::Skipped);

        assert_eq!(outcome.successful_sources(), vec![SourceType::Arxiv]);
    }
}
