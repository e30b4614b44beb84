//! Mock connector for testing purposes.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::models::{Paper, SourceType};
use crate::sources::{Connector, FetchRequest, Retrieval, SourceError};

/// A scripted outcome for one mock fetch attempt.
#[derive(Debug)]
pub enum MockOutcome {
    Records(Vec<Paper>),
    Empty,
    Error(String),
}

/// A mock connector that plays back a queue of per-attempt outcomes.
///
/// Retry tests need a connector that behaves differently on successive
/// attempts (fail, fail, succeed), so outcomes are consumed FIFO; once the
/// script is exhausted the last configured behavior repeats as `Empty`.
#[derive(Debug)]
pub struct MockConnector {
    source: SourceType,
    script: Mutex<VecDeque<MockOutcome>>,
    calls: Mutex<u32>,
}

impl MockConnector {
    pub fn new(source: SourceType) -> Self {
        Self {
            source,
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(0),
        }
    }

    /// Queue an outcome for the next unclaimed attempt.
    pub fn push(&self, outcome: MockOutcome) {
        self.script.lock().unwrap().push_back(outcome);
    }

    /// Convenience: a connector that always returns the given records.
    pub fn returning(source: SourceType, papers: Vec<Paper>) -> Self {
        let mock = Self::new(source);
        mock.push(MockOutcome::Records(papers));
        mock
    }

    /// Convenience: a connector that always fails.
    pub fn failing(source: SourceType, reason: &str) -> Self {
        let mock = Self::new(source);
        mock.push(MockOutcome::Error(reason.to_string()));
        mock
    }

    /// Number of fetch calls observed so far.
    pub fn call_count(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl Connector for MockConnector {
    fn id(&self) -> &str {
        self.source.id()
    }

    fn source_type(&self) -> SourceType {
        self.source
    }

    async fn fetch(&self, _request: &FetchRequest) -> Result<Retrieval, SourceError> {
        *self.calls.lock().unwrap() += 1;

        let mut script = self.script.lock().unwrap();
        // Keep a single remaining outcome as the steady-state behavior
        let outcome = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().map(|o| match o {
                MockOutcome::Records(papers) => MockOutcome::Records(papers.clone()),
                MockOutcome::Empty => MockOutcome::Empty,
                MockOutcome::Error(e) => MockOutcome::Error(e.clone()),
            })
        };

        match outcome {
            Some(MockOutcome::Records(papers)) => Ok(Retrieval::from_records(papers)),
            Some(MockOutcome::Empty) | None => Ok(Retrieval::Empty),
            Some(MockOutcome::Error(reason)) => Err(SourceError::Api(reason)),
        }
    }
}

/// Helper to create a paper record for tests.
pub fn make_paper(title: &str, source: SourceType) -> Paper {
    Paper::new(
        title,
        format!(
            "http://example.com/{}",
            title.to_lowercase().replace(' ', "-")
        ),
        source,
    )
    .authors(vec!["Doe J".to_string()])
    .abstract_text("An abstract.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeywordFilter;

    fn request() -> FetchRequest {
        FetchRequest {
            lookback_days: 7,
            batch_size: 10,
            filter: KeywordFilter::new(vec!["actin".to_string()]),
            journals: Vec::new(),
            contact_email: None,
        }
    }

    #[tokio::test]
    async fn test_script_plays_in_order_then_repeats_last() {
        let mock = MockConnector::new(SourceType::Arxiv);
        mock.push(MockOutcome::Error("down".to_string()));
        mock.push(MockOutcome::Records(vec![make_paper("A", SourceType::Arxiv)]));

        assert!(mock.fetch(&request()).await.is_err());
        assert!(matches!(
            mock.fetch(&request()).await.unwrap(),
            Retrieval::Records(_)
        ));
        // Last outcome repeats
        assert!(matches!(
            mock.fetch(&request()).await.unwrap(),
            Retrieval::Records(_)
        ));
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_unscripted_mock_is_empty() {
        let mock = MockConnector::new(SourceType::PubMed);
        assert!(matches!(
            mock.fetch(&request()).await.unwrap(),
            Retrieval::Empty
        ));
    }
}
