//! Email notification channel (SMTP).
//!
//! Sends the compact list as the message body with one detail attachment
//! per source that produced results. Sender credentials are looked up from
//! the secret store under the configured service's key at send time.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, Message, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use std::sync::Arc;

use crate::config::EmailConfig;
use crate::notify::{Channel, ChannelError, NotificationPayload};
use crate::secrets::SecretStore;

const SUBJECT: &str = "Titles and URLs from the Latest Articles";

/// Email notification channel
pub struct EmailChannel {
    config: EmailConfig,
    secrets: Arc<dyn SecretStore>,
}

impl EmailChannel {
    pub fn new(config: EmailConfig, secrets: Arc<dyn SecretStore>) -> Self {
        Self { config, secrets }
    }

    /// Compose the message body: the compact list followed by one line per
    /// enabled source that produced nothing.
    fn body(payload: &NotificationPayload) -> String {
        let mut body = payload.compact_text.clone();
        if !payload.missing_sources.is_empty() {
            body.push_str("\n\n");
            for source in &payload.missing_sources {
                body.push_str(&format!("No entries found from {}.\n", source.name()));
            }
        }
        body
    }

    fn build_message(
        &self,
        sender: &str,
        payload: &NotificationPayload,
    ) -> Result<Message, ChannelError> {
        let from: Mailbox = sender
            .parse()
            .map_err(|e| ChannelError::Build(format!("invalid sender address: {}", e)))?;
        let to: Mailbox = self
            .config
            .receiver
            .parse()
            .map_err(|e| ChannelError::Build(format!("invalid receiver address: {}", e)))?;

        let mut multipart = MultiPart::mixed().singlepart(
            SinglePart::builder()
                .header(ContentType::TEXT_PLAIN)
                .body(Self::body(payload)),
        );

        for (source, path) in &payload.detail_files {
            let content = std::fs::read(path)?;
            let filename = format!("latest_{}_entries.txt", source.id());
            multipart = multipart.singlepart(
                Attachment::new(filename).body(content, ContentType::TEXT_PLAIN),
            );
        }

        Message::builder()
            .from(from)
            .to(to)
            .subject(SUBJECT)
            .multipart(multipart)
            .map_err(|e| ChannelError::Build(e.to_string()))
    }
}

#[async_trait]
impl Channel for EmailChannel {
    fn id(&self) -> &str {
        "email"
    }

    async fn deliver(&self, payload: &NotificationPayload) -> Result<(), ChannelError> {
        let service_key = self.config.service.service_key();
        let sender = self.secrets.get(service_key, "username")?;
        let password = self.secrets.get(service_key, "password")?;

        let message = self.build_message(&sender, payload)?;

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(
            self.config.service.smtp_host(),
        )
        .map_err(|e| ChannelError::Build(format!("invalid SMTP relay: {}", e)))?
        .credentials(Credentials::new(sender, password))
        .build();

        mailer
            .send(message)
            .await
            .map_err(|e| ChannelError::Delivery(e.to_string()))?;

        tracing::info!(receiver = %self.config.receiver, "email sent");
        Ok(())
    }
}
