//! Run configuration: an immutable snapshot of all toggles and parameters
//! for one invocation, constructed once from the configuration file and
//! validated by the run controller before any I/O.

mod file_config;
mod filter;

pub use file_config::{ConfigFile, ConfigFileError};
pub use filter::KeywordFilter;

use std::collections::BTreeMap;
use std::path::Path;

use crate::models::SourceType;

/// Supported mail services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailService {
    Outlook,
    Gmail,
}

impl MailService {
    pub fn smtp_host(&self) -> &'static str {
        match self {
            MailService::Outlook => "smtp.office365.com",
            MailService::Gmail => "smtp.gmail.com",
        }
    }

    /// Secret-store service key under which the sender credentials live.
    pub fn service_key(&self) -> &'static str {
        match self {
            MailService::Outlook => "outlook_service",
            MailService::Gmail => "gmail_service",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "outlook" => Some(MailService::Outlook),
            "gmail" => Some(MailService::Gmail),
            _ => None,
        }
    }
}

/// Parameters for one enabled source.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub lookback_days: u32,
    pub batch_size: usize,
    pub filter: KeywordFilter,
    /// PubMed only
    pub journals: Vec<String>,
    /// PubMed only
    pub contact_email: Option<String>,
}

/// Parameters for the email channel.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub service: MailService,
    pub receiver: String,
}

/// Parameters for the social channel.
#[derive(Debug, Clone)]
pub struct SocialConfig {
    pub credentials_key: String,
}

/// Immutable configuration snapshot for one run.
///
/// Construction does not validate; [`RunConfig::validate`] is called by the
/// run controller before any retrieval happens, so a malformed
/// configuration is rejected with zero side effects.
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    /// Enabled sources with their parameters, in priority order
    pub sources: BTreeMap<SourceType, SourceConfig>,
    pub email: Option<EmailConfig>,
    pub social: Option<SocialConfig>,
    /// Unparsed `service` string from the file, kept so validate() can
    /// report an unknown value verbatim.
    raw_email_service: Option<String>,
}

impl RunConfig {
    /// Load and convert the configuration file. Parse errors surface here;
    /// semantic validation is deferred to [`RunConfig::validate`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let file = ConfigFile::load(path).map_err(ConfigError::File)?;
        Ok(Self::from_file(file))
    }

    /// Convert the raw file structure into a run snapshot, keeping only
    /// enabled sources and channels.
    pub fn from_file(file: ConfigFile) -> Self {
        let mut sources = BTreeMap::new();

        let sections = [
            (SourceType::Arxiv, &file.sources.arxiv),
            (SourceType::BioRxiv, &file.sources.biorxiv),
            (SourceType::PubMed, &file.sources.pubmed),
        ];
        for (source, section) in sections {
            if !section.enabled {
                continue;
            }
            sources.insert(
                source,
                SourceConfig {
                    lookback_days: section.lookback_days,
                    batch_size: section.batch_size,
                    filter: KeywordFilter::new(section.keywords.clone())
                        .exclude(section.exclude_keywords.clone())
                        .require(section.require_keywords.clone()),
                    journals: section.journals.clone(),
                    contact_email: section.contact_email.clone(),
                },
            );
        }

        let email = if file.channels.email.enabled {
            Some(EmailConfig {
                service: file
                    .channels
                    .email
                    .service
                    .as_deref()
                    .and_then(MailService::parse)
                    // An unparsable service is caught by validate(); keep a
                    // placeholder so the snapshot stays constructible.
                    .unwrap_or(MailService::Outlook),
                receiver: file.channels.email.receiver.clone().unwrap_or_default(),
            })
        } else {
            None
        };

        let social = if file.channels.social.enabled {
            Some(SocialConfig {
                credentials_key: file
                    .channels
                    .social
                    .credentials_key
                    .clone()
                    .unwrap_or_default(),
            })
        } else {
            None
        };

        Self {
            sources,
            email,
            social,
            raw_email_service: file.channels.email.service,
        }
    }

    /// Enable a source with the given parameters.
    pub fn with_source(mut self, source: SourceType, config: SourceConfig) -> Self {
        self.sources.insert(source, config);
        self
    }

    /// Enable the email channel.
    pub fn with_email(mut self, service: MailService, receiver: impl Into<String>) -> Self {
        self.raw_email_service = Some(
            match service {
                MailService::Outlook => "outlook",
                MailService::Gmail => "gmail",
            }
            .to_string(),
        );
        self.email = Some(EmailConfig {
            service,
            receiver: receiver.into(),
        });
        self
    }

    /// Enable the social channel.
    pub fn with_social(mut self, credentials_key: impl Into<String>) -> Self {
        self.social = Some(SocialConfig {
            credentials_key: credentials_key.into(),
        });
        self
    }

    /// Check that the snapshot is self-consistent. Checks run in a fixed
    /// order so a given malformed configuration always yields the same
    /// first error: no source, no channel, per-source parameters in source
    /// priority order, then per-channel parameters (email, social).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::NoSourceEnabled);
        }
        if self.email.is_none() && self.social.is_none() {
            return Err(ConfigError::NoChannelEnabled);
        }

        for (source, cfg) in &self.sources {
            if cfg.lookback_days == 0 {
                return Err(ConfigError::InvalidParameter {
                    subject: source.id().to_string(),
                    parameter: "lookback_days",
                    reason: "must be greater than zero".to_string(),
                });
            }
            if cfg.batch_size == 0 {
                return Err(ConfigError::InvalidParameter {
                    subject: source.id().to_string(),
                    parameter: "batch_size",
                    reason: "must be greater than zero".to_string(),
                });
            }
            if cfg.filter.search.is_empty() {
                return Err(ConfigError::MissingParameter {
                    subject: source.id().to_string(),
                    parameter: "keywords",
                });
            }
            if *source == SourceType::PubMed
                && cfg.contact_email.as_deref().unwrap_or("").is_empty()
            {
                return Err(ConfigError::MissingParameter {
                    subject: source.id().to_string(),
                    parameter: "contact_email",
                });
            }
        }

        if let Some(email) = &self.email {
            match self.raw_email_service.as_deref() {
                None => {
                    return Err(ConfigError::MissingParameter {
                        subject: "email".to_string(),
                        parameter: "service",
                    })
                }
                Some(s) if MailService::parse(s).is_none() => {
                    return Err(ConfigError::InvalidParameter {
                        subject: "email".to_string(),
                        parameter: "service",
                        reason: format!("unknown service '{}', expected 'outlook' or 'gmail'", s),
                    })
                }
                Some(_) => {}
            }
            if email.receiver.is_empty() {
                return Err(ConfigError::MissingParameter {
                    subject: "email".to_string(),
                    parameter: "receiver",
                });
            }
        }

        if let Some(social) = &self.social {
            if social.credentials_key.is_empty() {
                return Err(ConfigError::MissingParameter {
                    subject: "social".to_string(),
                    parameter: "credentials_key",
                });
            }
        }

        Ok(())
    }
}

/// Configuration errors (fatal, pre-run).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no source is enabled; enable at least one of arxiv, biorxiv, pubmed")]
    NoSourceEnabled,

    #[error("no notification channel is enabled; enable at least one of email, social")]
    NoChannelEnabled,

    #[error("{subject}: missing required parameter '{parameter}'")]
    MissingParameter {
        subject: String,
        parameter: &'static str,
    },

    #[error("{subject}: invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        subject: String,
        parameter: &'static str,
        reason: String,
    },

    #[error(transparent)]
    File(ConfigFileError),
}
