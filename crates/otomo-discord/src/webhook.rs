// SPDX-FileCopyrightText: 2026 Otomo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook-backed [`Notifier`].

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, warn};

use otomo_config::model::DiscordConfig;
use otomo_core::{GroupId, Notifier, OtomoError};

/// Discord rejects message content beyond this many characters.
const CONTENT_LIMIT: usize = 2000;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Delivers content to Discord via per-group webhooks.
///
/// The registry is seeded from configuration; groups can be registered and
/// removed at runtime as communities change their destinations.
pub struct DiscordNotifier {
    client: reqwest::Client,
    webhooks: DashMap<GroupId, String>,
}

impl DiscordNotifier {
    pub fn new(config: &DiscordConfig) -> Result<Self, OtomoError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| OtomoError::Config(format!("failed to build HTTP client: {e}")))?;
        let webhooks = config
            .webhooks
            .iter()
            .map(|(group, url)| (GroupId(group.clone()), url.clone()))
            .collect();
        Ok(Self { client, webhooks })
    }

    /// Register or replace the webhook for a group.
    pub fn register(&self, group: GroupId, url: String) {
        self.webhooks.insert(group, url);
    }

    /// Remove a group's webhook. Subsequent deliveries to it fail.
    pub fn unregister(&self, group: &GroupId) {
        self.webhooks.remove(group);
    }

    async fn post(&self, url: &str, group: &GroupId, content: &str) -> Result<(), PostFailure> {
        let body = serde_json::json!({
            "content": content,
            "allowed_mentions": { "parse": [] },
        });
        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| PostFailure {
                status: None,
                error: OtomoError::Delivery {
                    group: group.clone(),
                    message: format!("webhook request failed: {e}"),
                    source: Some(Box::new(e)),
                },
            })?;

        let status = response.status();
        if status.is_success() {
            debug!(%group, "webhook delivered");
            return Ok(());
        }
        Err(PostFailure {
            status: Some(status),
            error: OtomoError::Delivery {
                group: group.clone(),
                message: format!(
                    "webhook returned {status}: {}",
                    response.text().await.unwrap_or_default()
                ),
                source: None,
            },
        })
    }
}

/// A failed post, with the HTTP status when one was received.
struct PostFailure {
    status: Option<reqwest::StatusCode>,
    error: OtomoError,
}

/// Truncate to Discord's content limit on a char boundary.
fn clamp(content: &str) -> &str {
    if content.chars().count() <= CONTENT_LIMIT {
        return content;
    }
    let end = content
        .char_indices()
        .nth(CONTENT_LIMIT)
        .map(|(i, _)| i)
        .unwrap_or(content.len());
    &content[..end]
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn deliver(&self, group: &GroupId, content: &str) -> Result<(), OtomoError> {
        let url = match self.webhooks.get(group) {
            Some(url) => url.clone(),
            None => {
                return Err(OtomoError::Delivery {
                    group: group.clone(),
                    message: "no webhook registered for group".into(),
                    source: None,
                });
            }
        };

        let content = clamp(content);
        match self.post(&url, group, content).await {
            Ok(()) => Ok(()),
            // One retry after a rate-limit response.
            Err(failure) if failure.status == Some(reqwest::StatusCode::TOO_MANY_REQUESTS) => {
                warn!(%group, "webhook rate limited, retrying once");
                tokio::time::sleep(Duration::from_secs(1)).await;
                self.post(&url, group, content).await.map_err(|f| f.error)
            }
            Err(failure) => Err(failure.error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn notifier_for(server: &MockServer, group: &str, hook_path: &str) -> DiscordNotifier {
        let mut webhooks = HashMap::new();
        webhooks.insert(group.to_string(), format!("{}{hook_path}", server.uri()));
        DiscordNotifier::new(&DiscordConfig { webhooks }).unwrap()
    }

    #[tokio::test]
    async fn deliver_posts_content_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hooks/g1"))
            .and(body_partial_json(serde_json::json!({"content": "hello"})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = notifier_for(&server, "g1", "/hooks/g1");
        notifier
            .deliver(&GroupId("g1".into()), "hello")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn unknown_group_is_a_delivery_error() {
        let server = MockServer::start().await;
        let notifier = notifier_for(&server, "g1", "/hooks/g1");
        let err = notifier
            .deliver(&GroupId("missing".into()), "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, OtomoError::Delivery { group, .. } if group.0 == "missing"));
    }

    #[tokio::test]
    async fn rate_limit_is_retried_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hooks/g1"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/hooks/g1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = notifier_for(&server, "g1", "/hooks/g1");
        notifier
            .deliver(&GroupId("g1".into()), "hello")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn retry_keys_on_status_not_body_text() {
        let server = MockServer::start().await;
        // A 500 whose body happens to mention 429 is not a rate limit.
        Mock::given(method("POST"))
            .and(path("/hooks/g1"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream saw 429"))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = notifier_for(&server, "g1", "/hooks/g1");
        let err = notifier
            .deliver(&GroupId("g1".into()), "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, OtomoError::Delivery { .. }));
    }

    #[tokio::test]
    async fn server_error_surfaces_as_delivery_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hooks/g1"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let notifier = notifier_for(&server, "g1", "/hooks/g1");
        let err = notifier
            .deliver(&GroupId("g1".into()), "hello")
            .await
            .unwrap_err();
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn runtime_registration_takes_effect() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hooks/new"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let notifier = DiscordNotifier::new(&DiscordConfig::default()).unwrap();
        let group = GroupId("g9".into());
        notifier.register(group.clone(), format!("{}/hooks/new", server.uri()));
        notifier.deliver(&group, "hi").await.unwrap();

        notifier.unregister(&group);
        assert!(notifier.deliver(&group, "hi").await.is_err());
    }

    #[test]
    fn clamp_truncates_on_char_boundary() {
        let long = "é".repeat(CONTENT_LIMIT + 10);
        let clamped = clamp(&long);
        assert_eq!(clamped.chars().count(), CONTENT_LIMIT);
        assert!(clamp("short").len() == 5);
    }
}
