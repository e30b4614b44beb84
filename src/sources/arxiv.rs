//! arXiv source connector.
//!
//! Queries the arXiv Atom API once per search keyword against the abstract
//! field, newest submissions first, and pages until the lookback window is
//! exhausted. Results are deduplicated by URL across keywords since the
//! same paper frequently matches several of them.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use feed_rs::parser;

use crate::models::{Paper, SourceType};
use crate::sources::{Connector, FetchRequest, Retrieval, SourceError};
use crate::utils::HttpClient;

/// Base URL for the arXiv API
const ARXIV_API_URL: &str = "http://export.arxiv.org/api/query";

/// arXiv source connector
#[derive(Debug, Clone)]
pub struct ArxivConnector {
    client: HttpClient,
    base_url: String,
}

impl ArxivConnector {
    pub fn new() -> Self {
        Self {
            client: HttpClient::new(),
            base_url: ARXIV_API_URL.to_string(),
        }
    }

    /// Create with a custom API base URL (for testing)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: HttpClient::new(),
            base_url: base_url.into(),
        }
    }

    fn page_url(&self, keyword: &str, start: usize, batch_size: usize) -> String {
        format!(
            "{}?search_query=abs:{}&start={}&max_results={}&sortBy=submittedDate&sortOrder=descending",
            self.base_url,
            urlencoding::encode(keyword),
            start,
            batch_size
        )
    }

    /// Parse an Atom entry into a Paper
    fn parse_entry(entry: &feed_rs::model::Entry) -> Paper {
        let title = entry
            .title
            .as_ref()
            .map(|t| t.content.as_str())
            .unwrap_or("");

        let authors: Vec<String> = entry.authors.iter().map(|a| a.name.clone()).collect();

        let abstract_text = entry
            .summary
            .as_ref()
            .map(|s| s.content.as_str())
            .unwrap_or("");

        // The entry id is the abstract page URL
        let mut paper = Paper::new(title, entry.id.clone(), SourceType::Arxiv)
            .authors(authors)
            .abstract_text(abstract_text);

        if let Some(published) = entry.published {
            paper = paper.published(published.date_naive());
        }

        paper
    }
}

impl Default for ArxivConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for ArxivConnector {
    fn id(&self) -> &str {
        "arxiv"
    }

    fn source_type(&self) -> SourceType {
        SourceType::Arxiv
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<Retrieval, SourceError> {
        let cutoff = (Utc::now() - Duration::days(i64::from(request.lookback_days))).date_naive();

        let mut records = Vec::new();
        let mut seen_urls = std::collections::HashSet::new();

        for keyword in &request.filter.search {
            let mut start = 0;
            loop {
                let url = self.page_url(keyword, start, request.batch_size);

                let response = self
                    .client
                    .get(&url)
                    .send()
                    .await
                    .map_err(|e| SourceError::Network(format!("Failed to query arXiv: {}", e)))?;

                if !response.status().is_success() {
                    return Err(SourceError::Api(format!(
                        "arXiv API returned status {}",
                        response.status()
                    )));
                }

                let body = response.bytes().await?;
                let feed = parser::parse(body.as_ref())
                    .map_err(|e| SourceError::Parse(format!("Failed to parse arXiv feed: {}", e)))?;

                if feed.entries.is_empty() {
                    break;
                }

                // Entries are newest-first; once one falls outside the
                // lookback window the rest of this keyword's results do too.
                let mut past_window = false;
                for entry in &feed.entries {
                    let paper = Self::parse_entry(entry);

                    match paper.published {
                        Some(date) if date >= cutoff => {}
                        Some(_) => {
                            past_window = true;
                            break;
                        }
                        None => continue,
                    }

                    if !seen_urls.insert(paper.url.clone()) {
                        continue;
                    }
                    if !request.filter.accepts(&paper.title, &paper.r#abstract) {
                        tracing::debug!(title = %paper.title, "excluded by keyword filter");
                        continue;
                    }

                    tracing::debug!(title = %paper.title, "retrieved from arXiv");
                    records.push(paper);
                }

                if past_window {
                    break;
                }
                start += request.batch_size;
            }
        }

        Ok(Retrieval::from_records(records))
    }
}
