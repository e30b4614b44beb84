//! Social (microblogging) notification channel.
//!
//! Posts one status per paper, title on the first line and URL on the
//! second. A title too long for a single post is split at whitespace into
//! sequential posts rather than truncated, so no content is ever lost.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use crate::config::SocialConfig;
use crate::notify::{Channel, ChannelError, CompactEntry, NotificationPayload};
use crate::secrets::SecretStore;
use crate::utils::HttpClient;

/// Maximum characters per post.
pub const POST_CHAR_LIMIT: usize = 280;

const DEFAULT_API_URL: &str = "https://api.twitter.com/2/tweets";
const NO_ENTRIES_POST: &str = "No new papers matching your keywords today.";

/// Social notification channel
pub struct SocialChannel {
    config: SocialConfig,
    secrets: Arc<dyn SecretStore>,
    client: HttpClient,
    api_url: String,
}

impl SocialChannel {
    pub fn new(config: SocialConfig, secrets: Arc<dyn SecretStore>, client: HttpClient) -> Self {
        Self {
            config,
            secrets,
            client,
            api_url: DEFAULT_API_URL.to_string(),
        }
    }

    /// Override the API endpoint (used by tests against a local server).
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    async fn post(&self, token: &str, text: &str) -> Result<(), ChannelError> {
        let response = self
            .client
            .client()
            .post(&self.api_url)
            .bearer_auth(token)
            .json(&json!({ "text": text }))
            .send()
            .await
            .map_err(|e| ChannelError::Delivery(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ChannelError::Delivery(format!(
                "post rejected with status {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Channel for SocialChannel {
    fn id(&self) -> &str {
        "social"
    }

    async fn deliver(&self, payload: &NotificationPayload) -> Result<(), ChannelError> {
        let token = self
            .secrets
            .get(&self.config.credentials_key, "bearer_token")?;

        let posts = build_posts(&payload.entries);
        let total = posts.len();
        let mut failed = 0usize;

        for text in &posts {
            if let Err(e) = self.post(&token, text).await {
                tracing::warn!(error = %e, "social post failed");
                failed += 1;
            }
        }

        if failed > 0 {
            return Err(ChannelError::Delivery(format!(
                "{} of {} posts failed",
                failed, total
            )));
        }
        tracing::info!(posts = total, "social posts sent");
        Ok(())
    }
}

/// Turn compact entries into post texts, one post per entry unless the
/// entry exceeds the character limit.
pub fn build_posts(entries: &[CompactEntry]) -> Vec<String> {
    if entries.is_empty() {
        return vec![NO_ENTRIES_POST.to_string()];
    }
    entries.iter().flat_map(split_entry).collect()
}

/// Split one entry into posts that each fit the limit.
///
/// The common case is a single `title\nurl` post. Oversized titles are
/// word-wrapped into continuation posts marked with a trailing ellipsis;
/// the URL always rides on the last one. A single word longer than the
/// limit is split mid-word as a last resort.
fn split_entry(entry: &CompactEntry) -> Vec<String> {
    let single = format!("{}\n{}", entry.title, entry.url);
    if single.chars().count() <= POST_CHAR_LIMIT {
        return vec![single];
    }

    // Continuation posts end in " …", so wrap words to a smaller budget.
    let budget = POST_CHAR_LIMIT - 2;
    let url_len = entry.url.chars().count() + 1;
    let mut posts = Vec::new();
    let mut current = String::new();

    for word in entry.title.split_whitespace() {
        let mut word = word.to_string();
        loop {
            let sep = if current.is_empty() { 0 } else { 1 };
            if current.chars().count() + sep + word.chars().count() <= budget {
                if sep == 1 {
                    current.push(' ');
                }
                current.push_str(&word);
                break;
            }
            if current.is_empty() {
                // Word alone exceeds the budget; hard-split it
                let head: String = word.chars().take(budget).collect();
                word = word.chars().skip(budget).collect();
                posts.push(format!("{} …", head));
                if word.is_empty() {
                    break;
                }
            } else {
                posts.push(format!("{} …", std::mem::take(&mut current)));
            }
        }
    }

    // Make sure the URL fits on the final post
    if current.chars().count() + url_len > POST_CHAR_LIMIT {
        posts.push(format!("{} …", std::mem::take(&mut current)));
    }
    if current.is_empty() {
        current = entry.url.clone();
    } else {
        current.push('\n');
        current.push_str(&entry.url);
    }
    posts.push(current);
    posts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::MemorySecretStore;

    fn entry(title: &str, url: &str) -> CompactEntry {
        CompactEntry {
            title: title.to_string(),
            url: url.to_string(),
        }
    }

    #[test]
    fn test_one_post_per_short_entry() {
        let posts = build_posts(&[
            entry("Actin waves in motile cells", "https://doi.org/10.1/a"),
            entry("Septin rings", "https://doi.org/10.1/b"),
        ]);
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0], "Actin waves in motile cells\nhttps://doi.org/10.1/a");
        assert_eq!(posts[1], "Septin rings\nhttps://doi.org/10.1/b");
    }

    #[test]
    fn test_empty_entries_produce_placeholder_post() {
        let posts = build_posts(&[]);
        assert_eq!(posts, vec![NO_ENTRIES_POST.to_string()]);
    }

    #[test]
    fn test_long_title_splits_at_whitespace() {
        let title = "word ".repeat(80); // ~400 chars
        let posts = split_entry(&entry(title.trim(), "https://doi.org/10.1/c"));
        assert!(posts.len() >= 2);
        for post in &posts[..posts.len() - 1] {
            assert!(post.chars().count() <= POST_CHAR_LIMIT);
            assert!(post.ends_with('…'));
            // No word is ever cut
            assert!(post
                .split('\n')
                .next()
                .unwrap()
                .split(' ')
                .all(|w| w == "word" || w == "…"));
        }
        assert!(posts.last().unwrap().ends_with("https://doi.org/10.1/c"));
    }

    #[test]
    fn test_unbroken_word_is_hard_split() {
        let title = "x".repeat(600);
        let posts = split_entry(&entry(&title, "https://doi.org/10.1/d"));
        assert!(posts.iter().all(|p| p.chars().count() <= POST_CHAR_LIMIT));
        let rejoined: String = posts
            .iter()
            .map(|p| p.split('\n').next().unwrap().trim_end_matches(" …"))
            .collect();
        assert!(rejoined.starts_with(&"x".repeat(600)));
    }

    #[tokio::test]
    async fn test_deliver_posts_each_entry() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/2/tweets")
            .match_header("authorization", "Bearer tok")
            .with_status(201)
            .with_body(r#"{"data":{"id":"1"}}"#)
            .expect(2)
            .create_async()
            .await;

        let mut secrets = MemorySecretStore::new();
        secrets.insert("social_credentials", "bearer_token", "tok");
        let channel = SocialChannel::new(
            SocialConfig {
                credentials_key: "social_credentials".to_string(),
            },
            Arc::new(secrets),
            HttpClient::new(),
        )
        .with_api_url(format!("{}/2/tweets", server.url()));

        let payload = NotificationPayload {
            entries: vec![
                entry("A", "http://example.com/a"),
                entry("B", "http://example.com/b"),
            ],
            ..Default::default()
        };
        channel.deliver(&payload).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_deliver_reports_partial_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/2/tweets")
            .with_status(403)
            .expect(1)
            .create_async()
            .await;

        let mut secrets = MemorySecretStore::new();
        secrets.insert("social_credentials", "bearer_token", "tok");
        let channel = SocialChannel::new(
            SocialConfig {
                credentials_key: "social_credentials".to_string(),
            },
            Arc::new(secrets),
            HttpClient::new(),
        )
        .with_api_url(format!("{}/2/tweets", server.url()));

        let payload = NotificationPayload {
            entries: vec![entry("A", "http://example.com/a")],
            ..Default::default()
        };
        let err = channel.deliver(&payload).await.unwrap_err();
        assert!(matches!(err, ChannelError::Delivery(_)));
    }

    #[tokio::test]
    async fn test_missing_token_is_secret_error() {
        let channel = SocialChannel::new(
            SocialConfig {
                credentials_key: "social_credentials".to_string(),
            },
            Arc::new(MemorySecretStore::new()),
            HttpClient::new(),
        );
        let err = channel
            .deliver(&NotificationPayload::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::Secret(_)));
    }
}
