//! Paper model and the delimited artifact text layout.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The bibliographic source a paper was retrieved from.
///
/// The enum order is the fixed aggregation priority: arXiv results come
/// first, then bioRxiv, then PubMed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Arxiv,
    BioRxiv,
    PubMed,
}

impl SourceType {
    /// All sources in aggregation priority order.
    pub const ALL: [SourceType; 3] = [SourceType::Arxiv, SourceType::BioRxiv, SourceType::PubMed];

    /// Returns the display name of the source
    pub fn name(&self) -> &str {
        match self {
            SourceType::Arxiv => "arXiv",
            SourceType::BioRxiv => "bioRxiv",
            SourceType::PubMed => "PubMed",
        }
    }

    /// Returns the source identifier (used in config keys and file names)
    pub fn id(&self) -> &str {
        match self {
            SourceType::Arxiv => "arxiv",
            SourceType::BioRxiv => "biorxiv",
            SourceType::PubMed => "pubmed",
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A paper record produced by a source connector.
///
/// Immutable once created. Records are never merged or deduplicated across
/// sources: a paper appearing on both a preprint server and PubMed is
/// reported twice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paper {
    /// Paper title (whitespace-normalized, single line)
    pub title: String,

    /// Paper page URL (or DOI link)
    pub url: String,

    /// Authors in the order the source returned them
    pub authors: Vec<String>,

    /// Abstract text
    pub r#abstract: String,

    /// Publication date, when the source provided one
    pub published: Option<NaiveDate>,

    /// Journal title (PubMed only)
    pub journal: Option<String>,

    /// Source where the paper was found
    pub source: SourceType,
}

impl Paper {
    /// Create a new paper with required fields. The title is collapsed to a
    /// single line since the artifact layout is line-oriented.
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        source: SourceType,
    ) -> Self {
        Self {
            title: normalize_title(&title.into()),
            url: url.into(),
            authors: Vec::new(),
            r#abstract: String::new(),
            published: None,
            journal: None,
            source,
        }
    }

    /// Set the authors
    pub fn authors(mut self, authors: Vec<String>) -> Self {
        self.authors = authors;
        self
    }

    /// Set the abstract
    pub fn abstract_text(mut self, text: impl Into<String>) -> Self {
        self.r#abstract = text.into();
        self
    }

    /// Set the publication date
    pub fn published(mut self, date: NaiveDate) -> Self {
        self.published = Some(date);
        self
    }

    /// Set the journal title
    pub fn journal(mut self, journal: impl Into<String>) -> Self {
        self.journal = Some(journal.into());
        self
    }

    /// Render this record in the artifact text layout:
    ///
    /// ```text
    /// Title: ...
    /// Authors: a, b, c
    /// Journal: ...        (PubMed only)
    /// Date: YYYY-MM-DD
    /// URL: ...
    /// Abstract: ...
    /// <blank line>
    /// ```
    pub fn to_artifact_entry(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Title: {}\n", self.title));
        out.push_str(&format!("Authors: {}\n", self.authors.join(", ")));
        if let Some(journal) = &self.journal {
            out.push_str(&format!("Journal: {}\n", journal));
        }
        if let Some(date) = self.published {
            out.push_str(&format!("Date: {}\n", date.format("%Y-%m-%d")));
        }
        out.push_str(&format!("URL: {}\n", self.url));
        // Keep the abstract on one line so a blank line always terminates
        // the entry.
        out.push_str(&format!(
            "Abstract: {}\n\n",
            self.r#abstract.split_whitespace().collect::<Vec<_>>().join(" ")
        ));
        out
    }

    /// Parse the artifact text layout back into records. Lines that do not
    /// match a known field are skipped; an entry without a title and URL is
    /// dropped.
    pub fn parse_artifact(text: &str, source: SourceType) -> Vec<Paper> {
        let mut papers = Vec::new();
        let mut current: Option<Paper> = None;

        for line in text.lines() {
            let line = line.trim_end();
            if let Some(title) = line.strip_prefix("Title: ") {
                // A new Title line starts a new entry even without a blank
                // separator, so a malformed file cannot merge two papers.
                if let Some(paper) = current.take() {
                    if !paper.url.is_empty() {
                        papers.push(paper);
                    }
                }
                current = Some(Paper::new(title, "", source));
            } else if let Some(paper) = current.as_mut() {
                if let Some(authors) = line.strip_prefix("Authors: ") {
                    paper.authors = authors
                        .split(',')
                        .map(|a| a.trim().to_string())
                        .filter(|a| !a.is_empty())
                        .collect();
                } else if let Some(journal) = line.strip_prefix("Journal: ") {
                    paper.journal = Some(journal.to_string());
                } else if let Some(date) = line.strip_prefix("Date: ") {
                    paper.published = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok();
                } else if let Some(url) = line.strip_prefix("URL: ") {
                    paper.url = url.to_string();
                } else if let Some(text) = line.strip_prefix("Abstract: ") {
                    paper.r#abstract = text.to_string();
                } else if line.is_empty() {
                    if let Some(paper) = current.take() {
                        if !paper.url.is_empty() {
                            papers.push(paper);
                        }
                    }
                }
            }
        }

        if let Some(paper) = current.take() {
            if !paper.url.is_empty() {
                papers.push(paper);
            }
        }

        papers
    }
}

/// Collapse newlines and repeated whitespace in a title to single spaces.
fn normalize_title(title: &str) -> String {
    title.split_whitespace().collect::<Vec<_>>().join(" ")
}
