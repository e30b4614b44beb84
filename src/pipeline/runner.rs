//! Run controller: one full pipeline cycle.
//!
//! Stage order is fixed: validate, retrieve each enabled source with
//! retries, aggregate whatever artifacts exist, dispatch to every enabled
//! channel, then delete all artifacts. Only validation can abort the run;
//! every later stage degrades and records instead of failing.

use std::sync::Arc;

use crate::config::{ConfigError, RunConfig};
use crate::models::{ChannelStatus, RunOutcome, SourceStatus, SourceType};
use crate::notify::{Channel, EmailChannel, NotificationPayload, SocialChannel};
use crate::pipeline::aggregate::Aggregation;
use crate::pipeline::{dispatch, retrieve_with_retry, ArtifactStore};
use crate::secrets::SecretStore;
use crate::sources::{ArxivConnector, BioRxivConnector, Connector, FetchRequest, PubMedConnector};
use crate::utils::HttpClient;

/// Drives one run of the pipeline.
pub struct RunController {
    config: RunConfig,
    store: ArtifactStore,
    max_retries: u32,
    connectors: Vec<Box<dyn Connector>>,
    channels: Vec<Box<dyn Channel>>,
}

impl RunController {
    /// A controller with no collaborators; add them with
    /// [`RunController::with_connector`] and [`RunController::with_channel`].
    pub fn new(config: RunConfig, store: ArtifactStore, max_retries: u32) -> Self {
        Self {
            config,
            store,
            max_retries,
            connectors: Vec::new(),
            channels: Vec::new(),
        }
    }

    /// A controller wired with the real connectors and channels for
    /// everything the configuration enables.
    pub fn with_default_collaborators(
        config: RunConfig,
        store: ArtifactStore,
        max_retries: u32,
        secrets: Arc<dyn SecretStore>,
    ) -> Self {
        let mut controller = Self::new(config, store, max_retries);

        let enabled: Vec<SourceType> = controller.config.sources.keys().copied().collect();
        for source in enabled {
            let connector: Box<dyn Connector> = match source {
                SourceType::Arxiv => Box::new(ArxivConnector::new()),
                SourceType::BioRxiv => Box::new(BioRxivConnector::new()),
                SourceType::PubMed => Box::new(PubMedConnector::new()),
            };
            controller.connectors.push(connector);
        }

        if let Some(email) = controller.config.email.clone() {
            controller
                .channels
                .push(Box::new(EmailChannel::new(email, Arc::clone(&secrets))));
        }
        if let Some(social) = controller.config.social.clone() {
            controller.channels.push(Box::new(SocialChannel::new(
                social,
                Arc::clone(&secrets),
                HttpClient::new(),
            )));
        }

        controller
    }

    pub fn with_connector(mut self, connector: Box<dyn Connector>) -> Self {
        self.connectors.push(connector);
        self
    }

    pub fn with_channel(mut self, channel: Box<dyn Channel>) -> Self {
        self.channels.push(channel);
        self
    }

    /// Execute one full cycle.
    ///
    /// A validation error returns before any network or filesystem I/O.
    /// After validation the run always completes: per-source and
    /// per-channel results land in the outcome, and artifact cleanup runs
    /// unconditionally at the end.
    pub async fn execute(&self) -> Result<RunOutcome, ConfigError> {
        self.config.validate()?;

        let mut outcome = RunOutcome::new();

        for source in SourceType::ALL {
            let Some(source_config) = self.config.sources.get(&source) else {
                outcome.record_source(source, SourceStatus::Skipped);
                continue;
            };
            let Some(connector) = self
                .connectors
                .iter()
                .find(|c| c.source_type() == source)
            else {
                tracing::error!(source = source.id(), "no connector registered");
                outcome.record_source(source, SourceStatus::Failed);
                continue;
            };

            let request = FetchRequest::from_config(source_config);
            let status = retrieve_with_retry(
                connector.as_ref(),
                &self.store,
                &request,
                self.max_retries,
            )
            .await;
            outcome.record_source(source, status);
        }

        let aggregation = Aggregation::from_store(&self.store, &outcome.successful_sources());
        let compact_text = aggregation.compact_text();
        if let Err(e) = self.store.write_compact(&compact_text) {
            tracing::warn!(error = %e, "failed to write aggregation file");
        }

        let payload = self.build_payload(aggregation, compact_text, &outcome);

        for id in ["email", "social"] {
            let enabled = match id {
                "email" => self.config.email.is_some(),
                _ => self.config.social.is_some(),
            };
            if !enabled {
                outcome.record_channel(id, ChannelStatus::NotRun);
            }
        }
        for channel in &self.channels {
            let status = dispatch(channel.as_ref(), &payload).await;
            outcome.record_channel(channel.id(), status);
        }

        self.store.clear();

        tracing::info!(summary = %outcome.summary(), "run complete");
        Ok(outcome)
    }

    fn build_payload(
        &self,
        aggregation: Aggregation,
        compact_text: String,
        outcome: &RunOutcome,
    ) -> NotificationPayload {
        let detail_files = aggregation
            .detailed
            .keys()
            .map(|&source| (source, self.store.source_path(source)))
            .collect();
        let missing_sources = self
            .config
            .sources
            .keys()
            .filter(|source| {
                outcome.per_source.get(*source) != Some(&SourceStatus::Success)
            })
            .copied()
            .collect();

        NotificationPayload {
            entries: aggregation.compact,
            compact_text,
            detail_files,
            missing_sources,
        }
    }
}
