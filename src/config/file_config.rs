//! Configuration file support.
//!
//! # Configuration File Format
//!
//! ```toml
//! [sources.arxiv]
//! enabled = true
//! lookback_days = 7
//! batch_size = 200
//! keywords = ["actin", "cytoskeleton"]
//! exclude_keywords = ["review"]
//! require_keywords = ["microscopy"]
//!
//! [sources.biorxiv]
//! enabled = true
//! lookback_days = 7
//! batch_size = 100
//! keywords = ["actin"]
//!
//! [sources.pubmed]
//! enabled = true
//! lookback_days = 7
//! batch_size = 100
//! keywords = ["actin"]
//! journals = ["eLife", "Nature Communications"]
//! contact_email = "you@example.org"
//!
//! [channels.email]
//! enabled = true
//! service = "outlook"
//! receiver = "you@example.org"
//!
//! [channels.social]
//! enabled = false
//! credentials_key = "social_credentials"
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Raw configuration file structure, before validation.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub sources: SourcesSection,

    #[serde(default)]
    pub channels: ChannelsSection,
}

/// Per-source sections
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SourcesSection {
    #[serde(default)]
    pub arxiv: SourceSection,

    #[serde(default)]
    pub biorxiv: SourceSection,

    #[serde(default)]
    pub pubmed: SourceSection,
}

/// One source's settings
#[derive(Debug, Serialize, Deserialize)]
pub struct SourceSection {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default)]
    pub keywords: Vec<String>,

    #[serde(default)]
    pub exclude_keywords: Vec<String>,

    #[serde(default)]
    pub require_keywords: Vec<String>,

    /// PubMed only: restrict results to these journals
    #[serde(default)]
    pub journals: Vec<String>,

    /// PubMed only: contact email sent to the E-utilities API
    #[serde(default)]
    pub contact_email: Option<String>,
}

impl Default for SourceSection {
    fn default() -> Self {
        Self {
            enabled: false,
            lookback_days: default_lookback_days(),
            batch_size: default_batch_size(),
            keywords: Vec::new(),
            exclude_keywords: Vec::new(),
            require_keywords: Vec::new(),
            journals: Vec::new(),
            contact_email: None,
        }
    }
}

fn default_lookback_days() -> u32 {
    7
}

fn default_batch_size() -> usize {
    100
}

/// Per-channel sections
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ChannelsSection {
    #[serde(default)]
    pub email: EmailSection,

    #[serde(default)]
    pub social: SocialSection,
}

/// Email channel settings
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct EmailSection {
    #[serde(default)]
    pub enabled: bool,

    /// "outlook" or "gmail"
    #[serde(default)]
    pub service: Option<String>,

    #[serde(default)]
    pub receiver: Option<String>,
}

/// Social channel settings
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SocialSection {
    #[serde(default)]
    pub enabled: bool,

    /// Secret-store service key holding the posting credentials
    #[serde(default)]
    pub credentials_key: Option<String>,
}

impl ConfigFile {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigFileError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigFileError::Io(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigFileError::Parse(e.to_string()))
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<(), ConfigFileError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigFileError::Serialize(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigFileError::Io(e.to_string()))
    }
}

/// Configuration file errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialize error: {0}")]
    Serialize(String),
}
