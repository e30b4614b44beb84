//! Dispatch stage: deliver the payload to every enabled channel.

use crate::models::ChannelStatus;
use crate::notify::{Channel, NotificationPayload};

/// Deliver to one channel, converting any error into a recorded failure.
/// Nothing a channel does can propagate past this boundary.
pub async fn dispatch(channel: &dyn Channel, payload: &NotificationPayload) -> ChannelStatus {
    match channel.deliver(payload).await {
        Ok(()) => {
            tracing::info!(channel = channel.id(), "notification delivered");
            ChannelStatus::Success
        }
        Err(e) => {
            tracing::warn!(channel = channel.id(), error = %e, "notification failed");
            ChannelStatus::Failed
        }
    }
}
