//! PubMed source connector using the NCBI E-utilities API.
//!
//! Retrieval is two-step: `esearch` to collect PMIDs for each search
//! keyword within the lookback window, then `efetch` to pull the article
//! XML. The journal filter is applied both in the query and again on the
//! fetched records, since `[Journal]` matching on the server side is loose.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::models::{Paper, SourceType};
use crate::sources::{Connector, FetchRequest, Retrieval, SourceError};
use crate::utils::HttpClient;

const PUBMED_EUTILS_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

/// Client identifier sent to E-utilities alongside the contact email
const EUTILS_TOOL: &str = "paperwatch";

/// PubMed source connector
#[derive(Debug, Clone)]
pub struct PubMedConnector {
    client: HttpClient,
    base_url: String,
}

impl PubMedConnector {
    pub fn new() -> Self {
        Self {
            client: HttpClient::new(),
            base_url: PUBMED_EUTILS_URL.to_string(),
        }
    }

    /// Create with a custom API base URL (for testing)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: HttpClient::new(),
            base_url: base_url.into(),
        }
    }

    /// Build the search term for one keyword: journal restriction joined
    /// with OR, exclude keywords joined with NOT.
    fn build_term(keyword: &str, journals: &[String], exclude: &[String]) -> String {
        let mut term = format!("({})", keyword);

        if !journals.is_empty() {
            let clause = journals
                .iter()
                .map(|j| format!("{}[Journal]", j))
                .collect::<Vec<_>>()
                .join(" OR ");
            term.push_str(&format!(" AND ({})", clause));
        }

        for kw in exclude {
            term.push_str(&format!(" NOT {}", kw));
        }

        term
    }

    fn esearch_url(
        &self,
        term: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        retstart: usize,
        retmax: usize,
        email: &str,
    ) -> String {
        format!(
            "{}/esearch.fcgi?db=pubmed&term={}&datetype=pdat&mindate={}&maxdate={}&retstart={}&retmax={}&retmode=xml&tool={}&email={}",
            self.base_url,
            urlencoding::encode(term),
            start_date.format("%Y/%m/%d"),
            end_date.format("%Y/%m/%d"),
            retstart,
            retmax,
            EUTILS_TOOL,
            urlencoding::encode(email),
        )
    }

    fn efetch_url(&self, ids: &[String], email: &str) -> String {
        format!(
            "{}/efetch.fcgi?db=pubmed&id={}&retmode=xml&tool={}&email={}",
            self.base_url,
            ids.join(","),
            EUTILS_TOOL,
            urlencoding::encode(email),
        )
    }

    async fn get_text(&self, url: &str) -> Result<String, SourceError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to query PubMed: {}", e)))?;

        if !response.status().is_success() {
            return Err(SourceError::Api(format!(
                "PubMed API returned status {}",
                response.status()
            )));
        }

        Ok(response.text().await?)
    }
}

impl Default for PubMedConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for PubMedConnector {
    fn id(&self) -> &str {
        "pubmed"
    }

    fn source_type(&self) -> SourceType {
        SourceType::PubMed
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<Retrieval, SourceError> {
        let email = request.contact_email.as_deref().ok_or_else(|| {
            SourceError::InvalidRequest("PubMed requires a contact email".to_string())
        })?;

        let today = Utc::now().date_naive();
        let start_date = today - Duration::days(i64::from(request.lookback_days));

        let mut records = Vec::new();

        for keyword in &request.filter.search {
            let term = Self::build_term(keyword, &request.journals, &request.filter.exclude);
            let mut retstart = 0usize;

            loop {
                let url = self.esearch_url(
                    &term,
                    start_date,
                    today,
                    retstart,
                    request.batch_size,
                    email,
                );
                let xml = self.get_text(&url).await?;
                let search = parse_esearch(&xml)?;

                if search.ids.is_empty() {
                    break;
                }

                let fetch_xml = self.get_text(&self.efetch_url(&search.ids, email)).await?;
                let papers = parse_efetch(&fetch_xml)?;

                for paper in papers {
                    let journal_ok = request.journals.is_empty()
                        || paper.journal.as_deref().map(str::to_lowercase).is_some_and(
                            |j| {
                                request
                                    .journals
                                    .iter()
                                    .any(|name| j.contains(&name.to_lowercase()))
                            },
                        );
                    if !journal_ok {
                        continue;
                    }
                    if !request.filter.accepts(&paper.title, &paper.r#abstract) {
                        tracing::debug!(title = %paper.title, "excluded by keyword filter");
                        continue;
                    }

                    tracing::debug!(title = %paper.title, "retrieved from PubMed");
                    records.push(paper);
                }

                retstart += request.batch_size;
                if retstart >= search.count {
                    break;
                }
            }
        }

        Ok(Retrieval::from_records(records))
    }
}

struct EsearchPage {
    count: usize,
    ids: Vec<String>,
}

/// Parse an esearch response into the total count and this page's PMIDs.
fn parse_esearch(xml: &str) -> Result<EsearchPage, SourceError> {
    #[derive(Debug, Deserialize)]
    #[allow(non_snake_case)]
    struct ESearchResult {
        Count: Option<String>,
        IdList: Option<IdList>,
    }

    #[derive(Debug, Deserialize)]
    struct IdList {
        #[serde(rename = "Id", default)]
        ids: Vec<String>,
    }

    let result: ESearchResult = from_str(xml)
        .map_err(|e| SourceError::Parse(format!("Failed to parse PubMed search XML: {}", e)))?;

    Ok(EsearchPage {
        count: result
            .Count
            .as_deref()
            .and_then(|c| c.parse().ok())
            .unwrap_or(0),
        ids: result.IdList.map(|l| l.ids).unwrap_or_default(),
    })
}

/// Parse an efetch response into paper records.
fn parse_efetch(xml: &str) -> Result<Vec<Paper>, SourceError> {
    #[derive(Debug, Deserialize)]
    #[allow(non_snake_case)]
    struct PubmedArticleSet {
        #[serde(rename = "PubmedArticle", default)]
        articles: Vec<PubmedArticle>,
    }

    #[derive(Debug, Deserialize)]
    #[allow(non_snake_case)]
    struct PubmedArticle {
        MedlineCitation: Option<MedlineCitation>,
    }

    #[derive(Debug, Deserialize)]
    #[allow(non_snake_case)]
    struct MedlineCitation {
        Article: Option<Article>,
    }

    #[derive(Debug, Deserialize)]
    #[allow(non_snake_case)]
    struct Article {
        Journal: Option<Journal>,
        ArticleTitle: Option<String>,
        Abstract: Option<Abstract>,
        AuthorList: Option<AuthorList>,
        #[serde(rename = "ELocationID", default)]
        elocation_ids: Vec<ELocationId>,
    }

    #[derive(Debug, Deserialize)]
    #[allow(non_snake_case)]
    struct Journal {
        Title: Option<String>,
        JournalIssue: Option<JournalIssue>,
    }

    #[derive(Debug, Deserialize)]
    #[allow(non_snake_case)]
    struct JournalIssue {
        PubDate: Option<PubDate>,
    }

    #[derive(Debug, Deserialize)]
    #[allow(non_snake_case)]
    struct PubDate {
        Year: Option<String>,
        Month: Option<String>,
        Day: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    struct Abstract {
        #[serde(rename = "AbstractText", default)]
        abstract_texts: Vec<String>,
    }

    #[derive(Debug, Deserialize)]
    struct AuthorList {
        #[serde(rename = "Author", default)]
        authors: Vec<Author>,
    }

    #[derive(Debug, Deserialize)]
    #[allow(non_snake_case)]
    struct Author {
        LastName: Option<String>,
        Initials: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    struct ELocationId {
        #[serde(rename = "@EIdType")]
        id_type: Option<String>,
        #[serde(rename = "$text")]
        value: Option<String>,
    }

    let result: PubmedArticleSet = from_str(xml)
        .map_err(|e| SourceError::Parse(format!("Failed to parse PubMed fetch XML: {}", e)))?;

    let mut papers = Vec::new();

    for article in result.articles {
        let Some(article) = article.MedlineCitation.and_then(|m| m.Article) else {
            continue;
        };

        let title = article.ArticleTitle.clone().unwrap_or_default();
        if title.is_empty() {
            continue;
        }

        let authors: Vec<String> = article
            .AuthorList
            .as_ref()
            .map(|list| {
                list.authors
                    .iter()
                    .filter_map(|a| {
                        a.LastName.as_ref().map(|last| {
                            match &a.Initials {
                                Some(initials) => format!("{} {}", last, initials),
                                None => last.clone(),
                            }
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        let abstract_text = article
            .Abstract
            .as_ref()
            .and_then(|a| a.abstract_texts.first())
            .cloned()
            .unwrap_or_default();

        let doi = article
            .elocation_ids
            .iter()
            .find(|e| e.id_type.as_deref() == Some("doi"))
            .and_then(|e| e.value.clone());

        // Link through DOI when available; otherwise fall back to the
        // PubMed search page equivalent of "no full-text link"
        let url = match &doi {
            Some(doi) => format!("https://doi.org/{}", doi),
            None => continue,
        };

        let journal_title = article.Journal.as_ref().and_then(|j| j.Title.clone());

        let published = article
            .Journal
            .as_ref()
            .and_then(|j| j.JournalIssue.as_ref())
            .and_then(|i| i.PubDate.as_ref())
            .and_then(parse_pub_date);

        let mut paper = Paper::new(title, url, SourceType::PubMed)
            .authors(authors)
            .abstract_text(abstract_text);
        if let Some(journal) = journal_title {
            paper = paper.journal(journal);
        }
        if let Some(date) = published {
            paper = paper.published(date);
        }

        papers.push(paper);
    }

    return Ok(papers);

    fn parse_pub_date(date: &PubDate) -> Option<NaiveDate> {
        let year: i32 = date.Year.as_deref()?.parse().ok()?;
        let month = date
            .Month
            .as_deref()
            .map(month_number)
            .unwrap_or(1);
        let day: u32 = date
            .Day
            .as_deref()
            .and_then(|d| d.parse().ok())
            .unwrap_or(1);
        NaiveDate::from_ymd_opt(year, month, day)
    }
}

/// Convert a PubMed month (name or number) to its numeric value,
/// defaulting to January.
fn month_number(month: &str) -> u32 {
    match month.to_lowercase().get(..3) {
        Some("jan") => 1,
        Some("feb") => 2,
        Some("mar") => 3,
        Some("apr") => 4,
        Some("may") => 5,
        Some("jun") => 6,
        Some("jul") => 7,
        Some("aug") => 8,
        Some("sep") => 9,
        Some("oct") => 10,
        Some("nov") => 11,
        Some("dec") => 12,
        _ => month.parse().unwrap_or(1),
    }
}
