//! Notification channels.
//!
//! Each delivery medium implements [`Channel`]. The dispatcher converts any
//! channel error into a recorded failure; nothing a channel does can stop
//! the rest of the run.

mod email;
mod social;

pub use email::EmailChannel;
pub use social::{SocialChannel, POST_CHAR_LIMIT};

use async_trait::async_trait;
use std::path::PathBuf;

use crate::models::SourceType;
use crate::secrets::SecretError;

/// One compact entry: a title and where to read the paper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactEntry {
    pub title: String,
    pub url: String,
}

/// What the dispatcher hands to every channel.
///
/// An empty `entries` list is a valid payload: channels deliver a
/// "no new papers" notification and report success.
#[derive(Debug, Clone, Default)]
pub struct NotificationPayload {
    /// Compact title+URL pairs across all sources, in notification order
    pub entries: Vec<CompactEntry>,

    /// Body text of the compact list (the aggregation file's content)
    pub compact_text: String,

    /// Detail artifact per source that produced results
    pub detail_files: Vec<(SourceType, PathBuf)>,

    /// Enabled sources that produced no results this run
    pub missing_sources: Vec<SourceType>,
}

/// The Channel trait defines the interface for all notification media.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Channel identifier used in configuration and the run summary
    fn id(&self) -> &str;

    /// Deliver the payload. Errors are recorded by the dispatcher and do
    /// not propagate further.
    async fn deliver(&self, payload: &NotificationPayload) -> Result<(), ChannelError>;
}

#[async_trait]
impl<T: Channel + ?Sized> Channel for std::sync::Arc<T> {
    fn id(&self) -> &str {
        (**self).id()
    }

    async fn deliver(&self, payload: &NotificationPayload) -> Result<(), ChannelError> {
        (**self).deliver(payload).await
    }
}

/// Errors that can occur during delivery
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("failed to build message: {0}")]
    Build(String),

    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error(transparent)]
    Secret(#[from] SecretError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
