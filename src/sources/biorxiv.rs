//! bioRxiv source connector.
//!
//! The details API has no server-side keyword search, so the connector
//! walks the whole lookback window and filters locally: a record qualifies
//! when a search keyword appears in its abstract and the exclude/require
//! criteria pass.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use serde::Deserialize;

use crate::models::{Paper, SourceType};
use crate::sources::{Connector, FetchRequest, Retrieval, SourceError};
use crate::utils::HttpClient;

const BIORXIV_API_URL: &str = "https://api.biorxiv.org";

/// bioRxiv source connector
#[derive(Debug, Clone)]
pub struct BioRxivConnector {
    client: HttpClient,
    base_url: String,
}

impl BioRxivConnector {
    pub fn new() -> Self {
        Self {
            client: HttpClient::new(),
            base_url: BIORXIV_API_URL.to_string(),
        }
    }

    /// Create with a custom API base URL (for testing)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: HttpClient::new(),
            base_url: base_url.into(),
        }
    }

    fn parse_item(item: &BioRxivItem) -> Paper {
        let authors: Vec<String> = item
            .authors
            .split(';')
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();

        let mut paper = Paper::new(
            &item.title,
            format!("https://doi.org/{}", item.doi),
            SourceType::BioRxiv,
        )
        .authors(authors)
        .abstract_text(&item.r#abstract);

        if let Ok(date) = NaiveDate::parse_from_str(&item.date, "%Y-%m-%d") {
            paper = paper.published(date);
        }

        paper
    }
}

impl Default for BioRxivConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for BioRxivConnector {
    fn id(&self) -> &str {
        "biorxiv"
    }

    fn source_type(&self) -> SourceType {
        SourceType::BioRxiv
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<Retrieval, SourceError> {
        let today = Utc::now().date_naive();
        let start = today - Duration::days(i64::from(request.lookback_days));
        // The details endpoint lags a day behind
        let end = today - Duration::days(1);

        let mut records = Vec::new();
        let mut cursor = 0usize;

        loop {
            let url = format!(
                "{}/details/biorxiv/{}/{}/{}",
                self.base_url,
                start.format("%Y-%m-%d"),
                end.format("%Y-%m-%d"),
                cursor
            );

            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| SourceError::Network(format!("Failed to query bioRxiv: {}", e)))?;

            if !response.status().is_success() {
                return Err(SourceError::Api(format!(
                    "bioRxiv API returned status {}",
                    response.status()
                )));
            }

            let page: BioRxivResponse = response
                .json()
                .await
                .map_err(|e| SourceError::Parse(format!("Failed to parse bioRxiv response: {}", e)))?;

            if page.collection.is_empty() {
                break;
            }
            let page_len = page.collection.len();

            for item in &page.collection {
                let abstract_lower = item.r#abstract.to_lowercase();
                let keyword_hit = request
                    .filter
                    .search
                    .iter()
                    .any(|kw| abstract_lower.contains(&kw.to_lowercase()));
                if !keyword_hit {
                    continue;
                }

                let paper = Self::parse_item(item);
                if !request.filter.accepts(&paper.title, &paper.r#abstract) {
                    tracing::debug!(title = %paper.title, "excluded by keyword filter");
                    continue;
                }

                tracing::debug!(title = %paper.title, "retrieved from bioRxiv");
                records.push(paper);
                if records.len() >= request.batch_size {
                    return Ok(Retrieval::from_records(records));
                }
            }

            cursor += page_len;
        }

        Ok(Retrieval::from_records(records))
    }
}

/// bioRxiv details API response
#[derive(Debug, Deserialize)]
struct BioRxivResponse {
    #[serde(default)]
    collection: Vec<BioRxivItem>,
}

#[derive(Debug, Deserialize)]
struct BioRxivItem {
    title: String,
    #[serde(default)]
    authors: String,
    #[serde(default)]
    date: String,
    #[serde(default)]
    doi: String,
    #[serde(rename = "abstract", default)]
    r#abstract: String,
}
