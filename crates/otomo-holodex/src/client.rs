// SPDX-FileCopyrightText: 2026 Otomo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Holodex aggregation API.
//!
//! Provides [`HolodexClient`] which handles request construction,
//! authentication, batched live-status lookup, channel metadata lookup,
//! cursor-paginated chat fetch, and transient error retry.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use otomo_config::model::UpstreamConfig;
use otomo_core::{
    ChannelId, ChannelMetadata, ChatCursor, ChatMessage, ChatPage, LiveStream, OtomoError,
    StreamId, UpstreamClient,
};

use crate::types::{ChannelRecord, ChatResponse, LiveVideo};

/// Minimum spacing between consecutive upstream requests, to stay under the
/// aggregation API's rate limits.
const MIN_REQUEST_SPACING: Duration = Duration::from_millis(250);

/// HTTP client for Holodex API communication.
///
/// Manages the `X-APIKEY` auth header, connection pooling, client-side
/// request spacing, and retry logic for transient errors (429, 5xx).
#[derive(Debug)]
pub struct HolodexClient {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
    last_request: Mutex<Option<Instant>>,
}

impl HolodexClient {
    /// Creates a new Holodex API client from upstream configuration.
    ///
    /// Requires `upstream.api_key` to be set.
    pub fn new(config: &UpstreamConfig) -> Result<Self, OtomoError> {
        let api_key = config
            .api_key
            .as_deref()
            .ok_or_else(|| OtomoError::Config("upstream.api_key is required".into()))?;
        if api_key.is_empty() {
            return Err(OtomoError::Config("upstream.api_key cannot be empty".into()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            "X-APIKEY",
            HeaderValue::from_str(api_key)
                .map_err(|e| OtomoError::Config(format!("invalid API key header value: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| OtomoError::UpstreamUnavailable {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_retries: 1,
            last_request: Mutex::new(None),
        })
    }

    /// Overrides the base URL (for testing with wiremock).
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Waits out the minimum request spacing since the previous request.
    async fn pace(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < MIN_REQUEST_SPACING {
                tokio::time::sleep(MIN_REQUEST_SPACING - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// Issues a GET with transient-error retry, returning the successful
    /// response or an error classified by `on_status`.
    async fn get_with_retry(
        &self,
        url: &str,
        query: &[(&str, String)],
        on_status: impl Fn(reqwest::StatusCode, String) -> OtomoError,
    ) -> Result<reqwest::Response, OtomoError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, url, "retrying upstream request after transient error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
            self.pace().await;

            let response = self
                .client
                .get(url)
                .query(query)
                .send()
                .await
                .map_err(|e| OtomoError::UpstreamUnavailable {
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, attempt, url, "upstream response received");

            if status.is_success() {
                return Ok(response);
            }

            let body = response.text().await.unwrap_or_default();
            if is_transient_status(status) && attempt < self.max_retries {
                warn!(status = %status, "transient upstream error, will retry");
                last_error = Some(OtomoError::UpstreamUnavailable {
                    message: format!("upstream returned {status}: {body}"),
                    source: None,
                });
                continue;
            }

            return Err(on_status(status, body));
        }

        Err(last_error.unwrap_or_else(|| OtomoError::UpstreamUnavailable {
            message: "upstream request failed after retries".into(),
            source: None,
        }))
    }
}

/// True for HTTP status codes that indicate transient errors worth retrying.
fn is_transient_status(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503)
}

fn parse_rfc3339(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[async_trait]
impl UpstreamClient for HolodexClient {
    async fn poll_live(
        &self,
        channels: &HashSet<ChannelId>,
    ) -> Result<HashMap<ChannelId, Option<LiveStream>>, OtomoError> {
        if channels.is_empty() {
            return Ok(HashMap::new());
        }

        let mut ids: Vec<&str> = channels.iter().map(|c| c.0.as_str()).collect();
        ids.sort_unstable();
        let url = format!("{}/users/live", self.base_url);
        let response = self
            .get_with_retry(
                &url,
                &[("channels", ids.join(","))],
                |status, body| OtomoError::UpstreamUnavailable {
                    message: format!("live poll returned {status}: {body}"),
                    source: None,
                },
            )
            .await?;

        let videos: Vec<LiveVideo> =
            response
                .json()
                .await
                .map_err(|e| OtomoError::UpstreamUnavailable {
                    message: format!("failed to parse live poll response: {e}"),
                    source: Some(Box::new(e)),
                })?;

        // Every requested channel resolved; live entries overwrite below.
        let mut statuses: HashMap<ChannelId, Option<LiveStream>> =
            channels.iter().map(|c| (c.clone(), None)).collect();
        for video in videos {
            if video.status != "live" {
                continue;
            }
            let channel = ChannelId(video.channel.id.clone());
            if statuses.contains_key(&channel) {
                statuses.insert(
                    channel,
                    Some(LiveStream {
                        stream_id: StreamId(video.id),
                        title: video.title,
                        started_at: video.start_actual.as_deref().and_then(parse_rfc3339),
                    }),
                );
            }
        }

        Ok(statuses)
    }

    async fn fetch_channel(&self, channel: &ChannelId) -> Result<ChannelMetadata, OtomoError> {
        let url = format!("{}/channels/{}", self.base_url, channel.0);
        let channel_for_err = channel.clone();
        let response = self
            .get_with_retry(&url, &[], move |status, body| {
                if status == reqwest::StatusCode::NOT_FOUND {
                    OtomoError::NotFound(channel_for_err.0.clone())
                } else {
                    OtomoError::UpstreamUnavailable {
                        message: format!("channel fetch returned {status}: {body}"),
                        source: None,
                    }
                }
            })
            .await?;

        let record: ChannelRecord =
            response
                .json()
                .await
                .map_err(|e| OtomoError::UpstreamUnavailable {
                    message: format!("failed to parse channel response: {e}"),
                    source: Some(Box::new(e)),
                })?;

        Ok(ChannelMetadata {
            channel_id: ChannelId(record.id),
            display_name: record.name,
            english_name: record.english_name,
            photo_url: record.photo,
        })
    }

    async fn fetch_chat(
        &self,
        stream: &StreamId,
        cursor: Option<&ChatCursor>,
    ) -> Result<ChatPage, OtomoError> {
        let url = format!("{}/videos/{}/chats", self.base_url, stream.0);
        let mut query: Vec<(&str, String)> = vec![("lang", "en".to_string())];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor.0.clone()));
        }

        let stream_for_err = stream.clone();
        let response = self
            .get_with_retry(&url, &query, move |status, body| {
                if status == reqwest::StatusCode::NOT_FOUND {
                    OtomoError::StreamNotFound(stream_for_err.clone())
                } else {
                    OtomoError::UpstreamUnavailable {
                        message: format!("chat fetch returned {status}: {body}"),
                        source: None,
                    }
                }
            })
            .await?;

        let page: ChatResponse =
            response
                .json()
                .await
                .map_err(|e| OtomoError::UpstreamUnavailable {
                    message: format!("failed to parse chat response: {e}"),
                    source: Some(Box::new(e)),
                })?;

        let messages = page
            .messages
            .into_iter()
            .filter(|m| !m.message.trim().is_empty())
            .map(|m| ChatMessage {
                stream_id: stream.clone(),
                channel_id: ChannelId(m.channel_id.clone().unwrap_or_default()),
                translator: m.is_tl.then(|| m.name.clone()),
                author: m.name,
                text: m.message,
                timestamp: Utc
                    .timestamp_millis_opt(m.timestamp)
                    .single()
                    .unwrap_or_else(Utc::now),
            })
            .collect();

        Ok(ChatPage {
            messages,
            next_cursor: ChatCursor(page.cursor),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> HolodexClient {
        let config = UpstreamConfig {
            api_key: Some("test-api-key".into()),
            ..UpstreamConfig::default()
        };
        HolodexClient::new(&config)
            .unwrap()
            .with_base_url(base_url.to_string())
    }

    fn channel_set(ids: &[&str]) -> HashSet<ChannelId> {
        ids.iter().map(|id| ChannelId(id.to_string())).collect()
    }

    #[tokio::test]
    async fn poll_live_maps_live_and_idle_channels() {
        let server = MockServer::start().await;
        let body = serde_json::json!([
            {
                "id": "vid1",
                "title": "karaoke",
                "status": "live",
                "channel": {"id": "UC1", "name": "Ch One"},
                "start_actual": "2026-03-01T12:00:00Z"
            },
            {
                "id": "vid2",
                "title": "scheduled",
                "status": "upcoming",
                "channel": {"id": "UC2", "name": "Ch Two"}
            }
        ]);

        Mock::given(method("GET"))
            .and(path("/users/live"))
            .and(header("X-APIKEY", "test-api-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let statuses = client.poll_live(&channel_set(&["UC1", "UC2"])).await.unwrap();

        assert_eq!(statuses.len(), 2);
        let live = statuses[&ChannelId("UC1".into())].as_ref().unwrap();
        assert_eq!(live.stream_id, StreamId("vid1".into()));
        assert_eq!(live.title, "karaoke");
        // Upcoming is not live.
        assert!(statuses[&ChannelId("UC2".into())].is_none());
    }

    #[tokio::test]
    async fn poll_live_empty_set_skips_the_request() {
        let server = MockServer::start().await;
        // No mock mounted: a request would 404 and error.
        let client = test_client(&server.uri());
        let statuses = client.poll_live(&HashSet::new()).await.unwrap();
        assert!(statuses.is_empty());
    }

    #[tokio::test]
    async fn poll_live_retries_on_429_then_succeeds() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/users/live"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/live"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let statuses = client.poll_live(&channel_set(&["UC1"])).await.unwrap();
        assert!(statuses[&ChannelId("UC1".into())].is_none());
    }

    #[tokio::test]
    async fn poll_live_surfaces_persistent_failure_as_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/live"))
            .respond_with(ResponseTemplate::new(503))
            .expect(2)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client.poll_live(&channel_set(&["UC1"])).await.unwrap_err();
        assert!(err.is_transient(), "got: {err}");
    }

    #[tokio::test]
    async fn fetch_channel_maps_metadata() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "id": "UC1",
            "name": "Ch One",
            "english_name": "Channel One",
            "photo": "https://example.org/p.jpg"
        });
        Mock::given(method("GET"))
            .and(path("/channels/UC1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let meta = client.fetch_channel(&ChannelId("UC1".into())).await.unwrap();
        assert_eq!(meta.display_name, "Ch One");
        assert_eq!(meta.english_name.as_deref(), Some("Channel One"));
    }

    #[tokio::test]
    async fn fetch_channel_404_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/channels/UCmissing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client
            .fetch_channel(&ChannelId("UCmissing".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, OtomoError::NotFound(id) if id == "UCmissing"));
    }

    #[tokio::test]
    async fn fetch_chat_maps_messages_and_cursor() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "messages": [
                {"name": "tl_alice", "message": "[EN] hello", "is_tl": true, "timestamp": 1750000000000i64},
                {"name": "viewer", "message": "hi", "is_tl": false, "timestamp": 1750000001000i64},
                {"name": "ghost", "message": "   ", "is_tl": false, "timestamp": 1750000002000i64}
            ],
            "cursor": "c2"
        });
        Mock::given(method("GET"))
            .and(path("/videos/vid1/chats"))
            .and(query_param("cursor", "c1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let page = client
            .fetch_chat(&StreamId("vid1".into()), Some(&ChatCursor("c1".into())))
            .await
            .unwrap();

        // Blank message dropped; order preserved.
        assert_eq!(page.messages.len(), 2);
        assert_eq!(page.messages[0].translator.as_deref(), Some("tl_alice"));
        assert!(page.messages[1].translator.is_none());
        assert_eq!(page.next_cursor, ChatCursor("c2".into()));
    }

    #[tokio::test]
    async fn fetch_chat_with_same_cursor_is_idempotent() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "messages": [
                {"name": "tl_alice", "message": "one", "is_tl": true, "timestamp": 1750000000000i64}
            ],
            "cursor": "c2"
        });
        Mock::given(method("GET"))
            .and(path("/videos/vid1/chats"))
            .and(query_param("cursor", "c1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let cursor = ChatCursor("c1".into());
        let first = client
            .fetch_chat(&StreamId("vid1".into()), Some(&cursor))
            .await
            .unwrap();
        let second = client
            .fetch_chat(&StreamId("vid1".into()), Some(&cursor))
            .await
            .unwrap();
        assert_eq!(first.messages, second.messages);
        assert_eq!(first.next_cursor, second.next_cursor);
    }

    #[tokio::test]
    async fn fetch_chat_404_is_stream_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/videos/gone/chats"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client
            .fetch_chat(&StreamId("gone".into()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, OtomoError::StreamNotFound(id) if id.0 == "gone"));
    }

    #[test]
    fn client_requires_api_key() {
        let config = UpstreamConfig::default();
        assert!(HolodexClient::new(&config).is_err());
    }
}
