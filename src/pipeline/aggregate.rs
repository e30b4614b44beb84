//! Aggregation stage: merge per-source artifacts into one payload.
//!
//! Reads whatever detail artifacts the retrieval stage managed to produce
//! and never fails on an empty set; zero artifacts just means an empty
//! compact list with the sentinel line.

use std::collections::BTreeMap;

use crate::models::{Paper, SourceType};
use crate::notify::CompactEntry;
use crate::pipeline::ArtifactStore;

pub const NO_ENTRIES_SENTINEL: &str = "No entries found for the given sources.\n";

/// How the compact list is ordered across sources.
///
/// Ordering policy lives here, in one place, like the no-dedup decision:
/// the default concatenates sources in priority order; the date sort is
/// available as an explicit alternative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CompactOrder {
    /// Fixed source priority (arXiv, bioRxiv, PubMed), connector order
    /// preserved within each source
    #[default]
    SourcePriority,
    /// Newest publication date first; undated records follow the dated
    /// ones, keeping their source-priority order among themselves
    NewestFirst,
}

/// The merged result of all successful retrievals.
#[derive(Debug, Default)]
pub struct Aggregation {
    /// Title+URL pairs across sources, in [`CompactOrder`] order
    pub compact: Vec<CompactEntry>,
    /// Full records per source, in source priority order
    pub detailed: BTreeMap<SourceType, Vec<Paper>>,
}

impl Aggregation {
    /// Merge the given sources' records with the default ordering.
    pub fn build(records: BTreeMap<SourceType, Vec<Paper>>) -> Self {
        Self::build_ordered(records, CompactOrder::default())
    }

    /// Merge the given sources' records.
    pub fn build_ordered(records: BTreeMap<SourceType, Vec<Paper>>, order: CompactOrder) -> Self {
        let mut compact: Vec<(Option<chrono::NaiveDate>, CompactEntry)> = Vec::new();
        for papers in records.values() {
            for paper in papers {
                compact.push((
                    paper.published,
                    CompactEntry {
                        title: paper.title.clone(),
                        url: paper.url.clone(),
                    },
                ));
            }
        }

        if order == CompactOrder::NewestFirst {
            // Stable sort: undated entries sink below dated ones without
            // reordering among themselves
            compact.sort_by(|(a, _), (b, _)| match (a, b) {
                (Some(a), Some(b)) => b.cmp(a),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            });
        }

        Self {
            compact: compact.into_iter().map(|(_, e)| e).collect(),
            detailed: records,
        }
    }

    /// Read every source the retrieval stage succeeded on and merge them.
    pub fn from_store(store: &ArtifactStore, sources: &[SourceType]) -> Self {
        let mut records = BTreeMap::new();
        for &source in sources {
            match store.read_source(source) {
                Ok(papers) if !papers.is_empty() => {
                    records.insert(source, papers);
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(source = source.id(), error = %e, "failed to read artifact");
                }
            }
        }
        Self::build(records)
    }

    /// Render the compact list: title line, URL line, blank separator.
    pub fn compact_text(&self) -> String {
        if self.compact.is_empty() {
            return NO_ENTRIES_SENTINEL.to_string();
        }
        let mut text = String::new();
        for entry in &self.compact {
            text.push_str(&entry.title);
            text.push('\n');
            text.push_str(&entry.url);
            text.push_str("\n\n");
        }
        text
    }
}
