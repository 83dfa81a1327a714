// SPDX-FileCopyrightText: 2026 Otomo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The Otomo engine: live-state tracking, go-live notification, and
//! per-stream chat relay.
//!
//! [`Engine`] wires the pieces together over the collaborator seams from
//! `otomo-core`: a [`LiveTracker`](tracker::LiveTracker) polls upstream and
//! emits ordered [`StreamEvent`](tracker::StreamEvent)s, which the engine's
//! event loop turns into notifications (deduped per destination) and relay
//! task lifecycle changes.

pub mod cache;
pub mod format;
pub mod notify;
pub mod relay;
pub mod tracker;

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use otomo_config::OtomoConfig;
use otomo_core::{DestinationResolver, HealthSink, Notifier, UpstreamClient};

use cache::MetadataCache;
use notify::NotificationDispatcher;
use relay::{RelaySettings, RelaySupervisor};
use tracker::{LiveTracker, StreamEvent};

/// Depth of the tracker-to-engine event queue. Polling backpressures on a
/// slow event loop instead of dropping transitions.
const EVENT_QUEUE_DEPTH: usize = 64;

/// Top-level engine, generic over its collaborators.
pub struct Engine {
    config: OtomoConfig,
    upstream: Arc<dyn UpstreamClient>,
    resolver: Arc<dyn DestinationResolver>,
    notifier: Arc<dyn Notifier>,
    health: Arc<dyn HealthSink>,
}

impl Engine {
    pub fn new(
        config: OtomoConfig,
        upstream: Arc<dyn UpstreamClient>,
        resolver: Arc<dyn DestinationResolver>,
        notifier: Arc<dyn Notifier>,
        health: Arc<dyn HealthSink>,
    ) -> Self {
        Self {
            config,
            upstream,
            resolver,
            notifier,
            health,
        }
    }

    /// Run until `shutdown` is cancelled, then drain relay tasks.
    pub async fn run(self, shutdown: CancellationToken) {
        let (events_tx, mut events_rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
        let tracker = LiveTracker::new(
            self.upstream.clone(),
            self.resolver.clone(),
            self.health.clone(),
            events_tx,
            &self.config.upstream,
        );
        let tracker_task = tokio::spawn(tracker.run(shutdown.clone()));

        let cache = Arc::new(MetadataCache::new(self.upstream.clone(), &self.config.cache));
        let mut dispatcher = NotificationDispatcher::new(
            self.notifier.clone(),
            self.resolver.clone(),
            cache,
            &self.config.notify,
        );
        let supervisor = RelaySupervisor::new(
            self.upstream,
            self.resolver,
            self.notifier,
            RelaySettings::from(&self.config.upstream),
        );

        // The tracker owns the only sender, so `None` means it has stopped.
        while let Some(event) = events_rx.recv().await {
            match event {
                StreamEvent::Started { channel, stream } => {
                    dispatcher.announce(&channel, &stream).await;
                    supervisor.start(channel, stream.stream_id);
                }
                StreamEvent::Ended { stream, .. } => {
                    supervisor.stop(&stream);
                    dispatcher.stream_ended(&stream);
                }
            }
        }

        info!("engine draining relay tasks");
        supervisor.shutdown().await;
        let _ = tracker_task.await;
        info!("engine stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use chrono::Utc;
    use otomo_config::model::UpstreamConfig;
    use otomo_core::{
        ChannelId, ChannelMetadata, ChatCursor, ChatMessage, ChatPage, GroupId, StreamId,
    };
    use otomo_test_utils::resolver::subscription;
    use otomo_test_utils::upstream::live;
    use otomo_test_utils::{MockNotifier, MockUpstream, RecordingHealthSink, StaticResolver};

    fn fast_config() -> OtomoConfig {
        OtomoConfig {
            upstream: UpstreamConfig {
                poll_interval_secs: 1,
                chat_fetch_interval_secs: 1,
                chat_retry_base_ms: 1,
                ..UpstreamConfig::default()
            },
            ..OtomoConfig::default()
        }
    }

    #[tokio::test]
    async fn live_transition_notifies_and_relays() {
        let upstream = Arc::new(MockUpstream::new());
        let resolver = Arc::new(StaticResolver::new());
        let notifier = Arc::new(MockNotifier::new());
        let health = Arc::new(RecordingHealthSink::new());

        let channel = ChannelId("UC1".into());
        let stream = StreamId("vid1".into());
        resolver.set(channel.clone(), vec![subscription("a", &["g1"])]);
        upstream.set_channel(ChannelMetadata {
            channel_id: channel.clone(),
            display_name: "Ch One".into(),
            english_name: None,
            photo_url: None,
        });
        upstream.push_poll([(channel.clone(), live("vid1", "karaoke"))].into());
        upstream.push_chat_page(
            &stream,
            ChatPage {
                messages: vec![ChatMessage {
                    stream_id: stream.clone(),
                    channel_id: channel.clone(),
                    author: "tl_alice".into(),
                    translator: Some("tl_alice".into()),
                    text: "[EN] hello".into(),
                    timestamp: Utc::now(),
                }],
                next_cursor: ChatCursor("c1".into()),
            },
        );
        upstream.push_chat_gone(&stream);

        let engine = Engine::new(
            fast_config(),
            upstream,
            resolver,
            notifier.clone(),
            health,
        );
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(engine.run(shutdown.clone()));

        tokio::time::sleep(Duration::from_millis(200)).await;
        shutdown.cancel();
        handle.await.unwrap();

        let deliveries = notifier.deliveries_for(&GroupId("g1".into()));
        assert_eq!(deliveries.len(), 2, "deliveries: {deliveries:?}");
        assert!(deliveries[0].contains("is now live!"));
        assert_eq!(deliveries[1], "||tl_alice:|| [EN] hello");
    }

    #[tokio::test]
    async fn ended_stream_stops_its_relay() {
        let upstream = Arc::new(MockUpstream::new());
        let resolver = Arc::new(StaticResolver::new());
        let notifier = Arc::new(MockNotifier::new());
        let health = Arc::new(RecordingHealthSink::new());

        let channel = ChannelId("UC1".into());
        resolver.set(channel.clone(), vec![subscription("a", &["g1"])]);
        upstream.push_poll([(channel.clone(), live("vid1", "t"))].into());
        upstream.push_poll([(channel.clone(), None)].into());

        let engine = Engine::new(
            fast_config(),
            upstream,
            resolver,
            notifier.clone(),
            health,
        );
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(engine.run(shutdown.clone()));

        // Long enough for both poll cycles (1s apart).
        tokio::time::sleep(Duration::from_millis(1500)).await;
        shutdown.cancel();
        handle.await.unwrap();

        // One go-live notice; the empty chat stream produced nothing else.
        let deliveries = notifier.deliveries_for(&GroupId("g1".into()));
        assert_eq!(deliveries.len(), 1);
        assert!(deliveries[0].contains("is now live!"));
    }
}
