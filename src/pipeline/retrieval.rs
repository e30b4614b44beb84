//! Retrieval stage: fetch one source with retries.
//!
//! Success is judged by the artifact on disk, not by the connector's
//! return value. An attempt that yields records writes the detail file;
//! an attempt that completes with nothing writes an empty file; a failed
//! attempt writes nothing. Retries are immediate, with no backoff, up to
//! the configured attempt ceiling.

use crate::models::SourceStatus;
use crate::pipeline::ArtifactStore;
use crate::sources::{Connector, FetchRequest, Retrieval};

/// Fetch a source until its detail artifact has content or attempts run out.
///
/// `max_retries` is the total attempt ceiling; at least one attempt is
/// always made. The distinction between the two non-success terminal
/// states matters downstream: `Empty` means the source answered and had
/// nothing, `Failed` means we never got an answer.
pub async fn retrieve_with_retry(
    connector: &dyn Connector,
    store: &ArtifactStore,
    request: &FetchRequest,
    max_retries: u32,
) -> SourceStatus {
    let source = connector.source_type();
    let attempts = max_retries.max(1);

    for attempt in 1..=attempts {
        match connector.fetch(request).await {
            Ok(Retrieval::Records(papers)) => {
                if let Err(e) = store.write_source(source, &papers) {
                    tracing::warn!(source = source.id(), error = %e, "failed to write artifact");
                }
            }
            Ok(Retrieval::Empty) => {
                if let Err(e) = store.touch_empty(source) {
                    tracing::warn!(source = source.id(), error = %e, "failed to write artifact");
                }
            }
            Err(e) => {
                tracing::warn!(
                    source = source.id(),
                    attempt,
                    max = attempts,
                    error = %e,
                    "retrieval attempt failed"
                );
            }
        }

        if store.has_nonempty(source) {
            tracing::info!(source = source.id(), attempt, "retrieval succeeded");
            return SourceStatus::Success;
        }
    }

    // Out of attempts: classify by whether the source ever answered.
    if store.source_path(source).exists() {
        tracing::info!(source = source.id(), "source returned no matching entries");
        SourceStatus::Empty
    } else {
        tracing::error!(
            source = source.id(),
            attempts,
            "retrieval failed on every attempt"
        );
        SourceStatus::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeywordFilter;
    use crate::models::SourceType;
    use crate::sources::mock::{make_paper, MockConnector, MockOutcome};

    fn request() -> FetchRequest {
        FetchRequest {
            lookback_days: 7,
            batch_size: 100,
            filter: KeywordFilter::new(vec!["actin".to_string()]),
            journals: Vec::new(),
            contact_email: None,
        }
    }

    fn store() -> (tempfile::TempDir, ArtifactStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn test_success_on_first_attempt_stops_retrying() {
        let (_dir, store) = store();
        let mock = MockConnector::returning(
            SourceType::Arxiv,
            vec![make_paper("Actin waves", SourceType::Arxiv)],
        );

        let status = retrieve_with_retry(&mock, &store, &request(), 3).await;
        assert_eq!(status, SourceStatus::Success);
        assert_eq!(mock.call_count(), 1);
        assert!(store.has_nonempty(SourceType::Arxiv));
    }

    #[tokio::test]
    async fn test_recovers_on_later_attempt() {
        let (_dir, store) = store();
        let mock = MockConnector::new(SourceType::BioRxiv);
        mock.push(MockOutcome::Error("503".to_string()));
        mock.push(MockOutcome::Error("503".to_string()));
        mock.push(MockOutcome::Records(vec![make_paper(
            "Septin rings",
            SourceType::BioRxiv,
        )]));

        let status = retrieve_with_retry(&mock, &store, &request(), 3).await;
        assert_eq!(status, SourceStatus::Success);
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_all_attempts_fail_without_artifact() {
        let (_dir, store) = store();
        let mock = MockConnector::failing(SourceType::PubMed, "timeout");

        let status = retrieve_with_retry(&mock, &store, &request(), 3).await;
        assert_eq!(status, SourceStatus::Failed);
        assert_eq!(mock.call_count(), 3);
        assert!(!store.source_path(SourceType::PubMed).exists());
    }

    #[tokio::test]
    async fn test_empty_answer_on_final_attempt_is_empty_not_failed() {
        let (_dir, store) = store();
        let mock = MockConnector::new(SourceType::Arxiv);
        mock.push(MockOutcome::Error("503".to_string()));
        mock.push(MockOutcome::Error("503".to_string()));
        mock.push(MockOutcome::Empty);

        let status = retrieve_with_retry(&mock, &store, &request(), 3).await;
        assert_eq!(status, SourceStatus::Empty);
        assert!(store.source_path(SourceType::Arxiv).exists());
        assert!(!store.has_nonempty(SourceType::Arxiv));
    }

    #[tokio::test]
    async fn test_empty_answers_are_retried() {
        // An empty artifact is not success, so every attempt is spent
        let (_dir, store) = store();
        let mock = MockConnector::new(SourceType::Arxiv);
        mock.push(MockOutcome::Empty);

        let status = retrieve_with_retry(&mock, &store, &request(), 3).await;
        assert_eq!(status, SourceStatus::Empty);
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_zero_retries_still_attempts_once() {
        let (_dir, store) = store();
        let mock = MockConnector::returning(
            SourceType::Arxiv,
            vec![make_paper("A", SourceType::Arxiv)],
        );

        let status = retrieve_with_retry(&mock, &store, &request(), 0).await;
        assert_eq!(status, SourceStatus::Success);
        assert_eq!(mock.call_count(), 1);
    }
}
