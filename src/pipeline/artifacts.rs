//! On-disk artifacts produced by a run.
//!
//! Each source writes a detail file (`latest_{id}_entries.txt`) and the
//! aggregation stage writes one compact file (`titles_and_urls.txt`). The
//! retrieval stage judges success by what is actually on disk, not by what
//! a connector claims to have returned, so these paths are the single
//! source of truth for the run's progress.

use std::fs;
use std::path::{Path, PathBuf};

use crate::models::{Paper, SourceType};

pub const COMPACT_FILE: &str = "titles_and_urls.txt";

/// Manages the run's working directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Detail artifact path for one source.
    pub fn source_path(&self, source: SourceType) -> PathBuf {
        self.dir.join(format!("latest_{}_entries.txt", source.id()))
    }

    /// Compact aggregation file path.
    pub fn compact_path(&self) -> PathBuf {
        self.dir.join(COMPACT_FILE)
    }

    fn ensure_dir(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)
    }

    /// Write the detail artifact for a source from its retrieved records.
    pub fn write_source(&self, source: SourceType, papers: &[Paper]) -> std::io::Result<()> {
        self.ensure_dir()?;
        let mut text = String::new();
        for paper in papers {
            text.push_str(&paper.to_artifact_entry());
        }
        fs::write(self.source_path(source), text)
    }

    /// Record an attempt that completed but found nothing: an empty file.
    pub fn touch_empty(&self, source: SourceType) -> std::io::Result<()> {
        self.ensure_dir()?;
        fs::write(self.source_path(source), "")
    }

    /// The retrieval success check: the artifact exists and has content.
    pub fn has_nonempty(&self, source: SourceType) -> bool {
        fs::metadata(self.source_path(source))
            .map(|m| m.len() > 0)
            .unwrap_or(false)
    }

    /// Parse a source's detail artifact back into records.
    pub fn read_source(&self, source: SourceType) -> std::io::Result<Vec<Paper>> {
        let text = fs::read_to_string(self.source_path(source))?;
        Ok(Paper::parse_artifact(&text, source))
    }

    /// Write the compact aggregation file.
    pub fn write_compact(&self, text: &str) -> std::io::Result<()> {
        self.ensure_dir()?;
        fs::write(self.compact_path(), text)
    }

    /// Delete every artifact this run may have produced. Runs after
    /// notification regardless of outcome; failures are logged, never
    /// propagated, so cleanup can never fail a run.
    pub fn clear(&self) {
        let mut paths: Vec<PathBuf> =
            SourceType::ALL.iter().map(|s| self.source_path(*s)).collect();
        paths.push(self.compact_path());

        for path in paths {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to remove artifact");
                }
            }
        }
    }
}
