//! End-to-end pipeline tests with scripted connectors and channels.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use paperwatch::config::{KeywordFilter, MailService, RunConfig, SourceConfig};
use paperwatch::models::{ChannelStatus, SourceStatus, SourceType};
use paperwatch::notify::{Channel, ChannelError, NotificationPayload};
use paperwatch::pipeline::aggregate::NO_ENTRIES_SENTINEL;
use paperwatch::pipeline::{ArtifactStore, RunController};
use paperwatch::sources::mock::{make_paper, MockConnector, MockOutcome};

/// Channel double that records every payload it is handed.
#[derive(Debug, Default)]
struct RecordingChannel {
    name: &'static str,
    fail: bool,
    payloads: Mutex<Vec<NotificationPayload>>,
}

impl RecordingChannel {
    fn named(name: &'static str) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    fn failing(name: &'static str) -> Self {
        Self {
            name,
            fail: true,
            ..Default::default()
        }
    }

    fn payloads(&self) -> Vec<NotificationPayload> {
        self.payloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl Channel for RecordingChannel {
    fn id(&self) -> &str {
        self.name
    }

    async fn deliver(&self, payload: &NotificationPayload) -> Result<(), ChannelError> {
        self.payloads.lock().unwrap().push(payload.clone());
        if self.fail {
            Err(ChannelError::Delivery("scripted failure".to_string()))
        } else {
            Ok(())
        }
    }
}

fn source_config() -> SourceConfig {
    SourceConfig {
        lookback_days: 7,
        batch_size: 100,
        filter: KeywordFilter::new(vec!["actin".to_string()]),
        journals: Vec::new(),
        contact_email: None,
    }
}

fn artifact_names(dir: &std::path::Path) -> Vec<String> {
    if !dir.exists() {
        return Vec::new();
    }
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_invalid_config_aborts_before_any_io() {
    let dir = tempfile::tempdir().unwrap();
    let work = dir.path().join("work");

    // A source but no channel: validation fails
    let config = RunConfig::default().with_source(SourceType::Arxiv, source_config());
    let connector = Arc::new(MockConnector::returning(
        SourceType::Arxiv,
        vec![make_paper("Actin waves", SourceType::Arxiv)],
    ));

    let controller = RunController::new(config, ArtifactStore::new(&work), 3)
        .with_connector(Box::new(Arc::clone(&connector)));

    assert!(controller.execute().await.is_err());
    assert_eq!(connector.call_count(), 0);
    assert!(!work.exists());
}

#[tokio::test]
async fn test_single_source_single_channel_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = RunConfig::default()
        .with_source(SourceType::Arxiv, source_config())
        .with_email(MailService::Outlook, "you@example.org");

    let papers = vec![
        make_paper("Actin waves in motile cells", SourceType::Arxiv),
        make_paper("Actin ring constriction", SourceType::Arxiv),
        make_paper("Cortical actin turnover", SourceType::Arxiv),
    ];
    let connector = Arc::new(MockConnector::returning(SourceType::Arxiv, papers));
    let email = Arc::new(RecordingChannel::named("email"));

    let controller = RunController::new(config, ArtifactStore::new(dir.path()), 3)
        .with_connector(Box::new(Arc::clone(&connector)))
        .with_channel(Box::new(Arc::clone(&email)));

    let outcome = controller.execute().await.unwrap();

    assert_eq!(
        outcome.per_source.get(&SourceType::Arxiv),
        Some(&SourceStatus::Success)
    );
    assert_eq!(
        outcome.per_source.get(&SourceType::BioRxiv),
        Some(&SourceStatus::Skipped)
    );
    assert_eq!(
        outcome.per_channel.get("email"),
        Some(&ChannelStatus::Success)
    );
    assert_eq!(
        outcome.per_channel.get("social"),
        Some(&ChannelStatus::NotRun)
    );

    let payloads = email.payloads();
    assert_eq!(payloads.len(), 1);
    let payload = &payloads[0];
    assert_eq!(payload.entries.len(), 3);
    assert!(payload
        .entries
        .iter()
        .any(|e| e.title == "Actin waves in motile cells"));
    assert!(payload.entries.iter().all(|e| e.url.starts_with("http")));
    assert_eq!(payload.detail_files.len(), 1);
    assert_eq!(payload.detail_files[0].0, SourceType::Arxiv);
    assert!(payload.missing_sources.is_empty());

    // Cleanup ran: no artifacts left behind
    assert!(artifact_names(dir.path()).is_empty());
}

#[tokio::test]
async fn test_source_and_channel_failures_stay_independent() {
    let dir = tempfile::tempdir().unwrap();
    let config = RunConfig::default()
        .with_source(SourceType::Arxiv, source_config())
        .with_source(SourceType::BioRxiv, source_config())
        .with_email(MailService::Outlook, "you@example.org")
        .with_social("social_credentials");

    let arxiv = Arc::new(MockConnector::failing(SourceType::Arxiv, "down"));
    let biorxiv = Arc::new(MockConnector::returning(
        SourceType::BioRxiv,
        vec![make_paper("Septin rings", SourceType::BioRxiv)],
    ));
    let email = Arc::new(RecordingChannel::failing("email"));
    let social = Arc::new(RecordingChannel::named("social"));

    let controller = RunController::new(config, ArtifactStore::new(dir.path()), 2)
        .with_connector(Box::new(Arc::clone(&arxiv)))
        .with_connector(Box::new(Arc::clone(&biorxiv)))
        .with_channel(Box::new(Arc::clone(&email)))
        .with_channel(Box::new(Arc::clone(&social)));

    let outcome = controller.execute().await.unwrap();

    // arXiv burned its full retry budget; bioRxiv was untouched by that
    assert_eq!(arxiv.call_count(), 2);
    assert_eq!(biorxiv.call_count(), 1);
    assert_eq!(
        outcome.per_source.get(&SourceType::Arxiv),
        Some(&SourceStatus::Failed)
    );
    assert_eq!(
        outcome.per_source.get(&SourceType::BioRxiv),
        Some(&SourceStatus::Success)
    );

    // The failed email channel did not stop the social channel
    assert_eq!(
        outcome.per_channel.get("email"),
        Some(&ChannelStatus::Failed)
    );
    assert_eq!(
        outcome.per_channel.get("social"),
        Some(&ChannelStatus::Success)
    );

    // Both channels saw the bioRxiv record; arXiv is reported missing
    for channel in [&email, &social] {
        let payloads = channel.payloads();
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].entries.len(), 1);
        assert_eq!(payloads[0].missing_sources, vec![SourceType::Arxiv]);
    }

    assert!(artifact_names(dir.path()).is_empty());
}

#[tokio::test]
async fn test_recovery_within_retry_budget() {
    let dir = tempfile::tempdir().unwrap();
    let config = RunConfig::default()
        .with_source(SourceType::PubMed, {
            let mut c = source_config();
            c.contact_email = Some("you@example.org".to_string());
            c
        })
        .with_social("social_credentials");

    let connector = Arc::new(MockConnector::new(SourceType::PubMed));
    connector.push(MockOutcome::Error("503".to_string()));
    connector.push(MockOutcome::Error("503".to_string()));
    connector.push(MockOutcome::Records(vec![make_paper(
        "Actin dynamics",
        SourceType::PubMed,
    )]));
    let social = Arc::new(RecordingChannel::named("social"));

    let controller = RunController::new(config, ArtifactStore::new(dir.path()), 3)
        .with_connector(Box::new(Arc::clone(&connector)))
        .with_channel(Box::new(Arc::clone(&social)));

    let outcome = controller.execute().await.unwrap();
    assert_eq!(connector.call_count(), 3);
    assert_eq!(
        outcome.per_source.get(&SourceType::PubMed),
        Some(&SourceStatus::Success)
    );
}

#[tokio::test]
async fn test_empty_aggregation_still_notifies_and_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let config = RunConfig::default()
        .with_source(SourceType::Arxiv, source_config())
        .with_email(MailService::Gmail, "you@example.org");

    let connector = Arc::new(MockConnector::new(SourceType::Arxiv));
    connector.push(MockOutcome::Empty);
    let email = Arc::new(RecordingChannel::named("email"));

    let controller = RunController::new(config, ArtifactStore::new(dir.path()), 3)
        .with_connector(Box::new(Arc::clone(&connector)))
        .with_channel(Box::new(Arc::clone(&email)));

    let outcome = controller.execute().await.unwrap();
    assert_eq!(
        outcome.per_source.get(&SourceType::Arxiv),
        Some(&SourceStatus::Empty)
    );
    assert_eq!(
        outcome.per_channel.get("email"),
        Some(&ChannelStatus::Success)
    );

    let payloads = email.payloads();
    assert_eq!(payloads.len(), 1);
    assert!(payloads[0].entries.is_empty());
    assert_eq!(payloads[0].compact_text, NO_ENTRIES_SENTINEL);
    assert_eq!(payloads[0].missing_sources, vec![SourceType::Arxiv]);

    assert!(artifact_names(dir.path()).is_empty());
}

#[tokio::test]
async fn test_cleanup_runs_even_when_everything_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = RunConfig::default()
        .with_source(SourceType::Arxiv, source_config())
        .with_email(MailService::Outlook, "you@example.org");

    // The source succeeds (so artifacts exist) and the only channel fails
    let connector = Arc::new(MockConnector::returning(
        SourceType::Arxiv,
        vec![make_paper("Actin waves", SourceType::Arxiv)],
    ));
    let email = Arc::new(RecordingChannel::failing("email"));

    let controller = RunController::new(config, ArtifactStore::new(dir.path()), 3)
        .with_connector(Box::new(Arc::clone(&connector)))
        .with_channel(Box::new(Arc::clone(&email)));

    let outcome = controller.execute().await.unwrap();
    assert_eq!(
        outcome.per_channel.get("email"),
        Some(&ChannelStatus::Failed)
    );
    assert!(artifact_names(dir.path()).is_empty());
}
