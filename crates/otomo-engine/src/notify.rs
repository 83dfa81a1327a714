// SPDX-FileCopyrightText: 2026 Otomo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Go-live notification dispatch with per-destination dedup.
//!
//! A stream start is announced at most once per (stream, group) pair. The
//! dedup set stays bounded: once a stream ends, its entries are dropped after
//! a grace period, which also absorbs a brief end/start flap without
//! re-announcing.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::counter;
use tracing::{debug, warn};

use otomo_config::model::NotifyConfig;
use otomo_core::{
    ChannelId, DestinationResolver, GroupId, LiveStream, Notifier, StreamId, StreamNotice,
};

use crate::cache::MetadataCache;
use crate::format;

/// Announces stream starts to all subscribed groups, once each.
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
    resolver: Arc<dyn DestinationResolver>,
    cache: Arc<MetadataCache>,
    grace: Duration,
    sent: HashSet<(StreamId, GroupId)>,
    ended: HashMap<StreamId, Instant>,
}

impl NotificationDispatcher {
    pub fn new(
        notifier: Arc<dyn Notifier>,
        resolver: Arc<dyn DestinationResolver>,
        cache: Arc<MetadataCache>,
        config: &NotifyConfig,
    ) -> Self {
        Self {
            notifier,
            resolver,
            cache,
            grace: Duration::from_secs(config.dedup_grace_secs),
            sent: HashSet::new(),
            ended: HashMap::new(),
        }
    }

    /// Announce a stream start to every subscribed group that has not
    /// already been notified of it. Failed groups are skipped, not retried.
    pub async fn announce(&mut self, channel: &ChannelId, stream: &LiveStream) {
        self.evict_expired();

        let subs = self.resolver.subscribers_of(channel);
        if subs.is_empty() {
            return;
        }

        let channel_name = match self.cache.get(channel).await {
            Ok(lookup) => lookup.metadata.display_name,
            Err(err) => {
                // Announce anyway; the id is better than silence.
                warn!(%channel, error = %err, "metadata lookup failed for notification");
                channel.0.clone()
            }
        };
        let notice = StreamNotice {
            channel: channel.clone(),
            stream: stream.stream_id.clone(),
            channel_name,
            title: stream.title.clone(),
            url: format::stream_url(&stream.stream_id.0),
        };
        let content = format::live_notice(&notice);

        for sub in subs {
            for group in sub.groups {
                let key = (stream.stream_id.clone(), group.clone());
                if self.sent.contains(&key) {
                    debug!(%group, stream = %stream.stream_id, "already notified");
                    continue;
                }
                match self.notifier.deliver(&group, &content).await {
                    Ok(()) => {
                        counter!("otomo_notifications_sent_total").increment(1);
                        self.sent.insert(key);
                    }
                    Err(err) => {
                        warn!(%group, error = %err, "notification delivery failed");
                    }
                }
            }
        }
    }

    /// Mark a stream ended, scheduling its dedup entries for eviction once
    /// the grace period passes.
    pub fn stream_ended(&mut self, stream: &StreamId) {
        if self.sent.iter().any(|(s, _)| s == stream) {
            self.ended.insert(stream.clone(), Instant::now());
        }
        self.evict_expired();
    }

    fn evict_expired(&mut self) {
        let grace = self.grace;
        let expired: Vec<StreamId> = self
            .ended
            .iter()
            .filter(|(_, at)| at.elapsed() >= grace)
            .map(|(s, _)| s.clone())
            .collect();
        for stream in expired {
            self.ended.remove(&stream);
            self.sent.retain(|(s, _)| s != &stream);
        }
    }

    #[cfg(test)]
    fn dedup_len(&self) -> usize {
        self.sent.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use otomo_core::ChannelMetadata;
    use otomo_test_utils::resolver::subscription;
    use otomo_test_utils::{MockNotifier, MockUpstream, StaticResolver};

    struct Fixture {
        upstream: Arc<MockUpstream>,
        resolver: Arc<StaticResolver>,
        notifier: Arc<MockNotifier>,
        dispatcher: NotificationDispatcher,
    }

    fn fixture(grace_secs: u64) -> Fixture {
        let upstream = Arc::new(MockUpstream::new());
        let resolver = Arc::new(StaticResolver::new());
        let notifier = Arc::new(MockNotifier::new());
        let cache = Arc::new(MetadataCache::new(
            upstream.clone(),
            &otomo_config::model::CacheConfig::default(),
        ));
        let dispatcher = NotificationDispatcher::new(
            notifier.clone(),
            resolver.clone(),
            cache,
            &NotifyConfig {
                dedup_grace_secs: grace_secs,
            },
        );
        Fixture {
            upstream,
            resolver,
            notifier,
            dispatcher,
        }
    }

    fn live(id: &str, title: &str) -> LiveStream {
        LiveStream {
            stream_id: StreamId(id.into()),
            title: title.into(),
            started_at: None,
        }
    }

    #[tokio::test]
    async fn announces_once_per_group() {
        let mut f = fixture(600);
        let channel = ChannelId("UC1".into());
        f.upstream.set_channel(ChannelMetadata {
            channel_id: channel.clone(),
            display_name: "Ch One".into(),
            english_name: None,
            photo_url: None,
        });
        f.resolver.set(
            channel.clone(),
            vec![subscription("a", &["g1", "g2"]), subscription("b", &["g3"])],
        );

        let stream = live("vid1", "karaoke");
        f.dispatcher.announce(&channel, &stream).await;
        f.dispatcher.announce(&channel, &stream).await;

        let deliveries = f.notifier.deliveries();
        assert_eq!(deliveries.len(), 3);
        let content = &deliveries[0].1;
        assert!(content.contains("**Ch One** is now live!"));
        assert!(content.contains("https://youtu.be/vid1"));
    }

    #[tokio::test]
    async fn metadata_failure_falls_back_to_channel_id() {
        let mut f = fixture(600);
        let channel = ChannelId("UC1".into());
        // No metadata registered: lookup returns NotFound.
        f.resolver.set(channel.clone(), vec![subscription("a", &["g1"])]);

        f.dispatcher.announce(&channel, &live("vid1", "t")).await;

        let deliveries = f.notifier.deliveries();
        assert_eq!(deliveries.len(), 1);
        assert!(deliveries[0].1.contains("**UC1** is now live!"));
    }

    #[tokio::test]
    async fn failed_group_can_be_notified_on_a_later_attempt() {
        let mut f = fixture(600);
        let channel = ChannelId("UC1".into());
        f.resolver.set(channel.clone(), vec![subscription("a", &["g1", "g2"])]);
        let g1 = GroupId("g1".into());
        f.notifier.fail_group(&g1);

        let stream = live("vid1", "t");
        f.dispatcher.announce(&channel, &stream).await;
        assert_eq!(f.notifier.deliveries_for(&GroupId("g2".into())).len(), 1);
        assert!(f.notifier.deliveries_for(&g1).is_empty());

        // A later announce (e.g. the stream is still live next poll) reaches
        // the recovered group without re-notifying the healthy one.
        f.notifier.heal_group(&g1);
        f.dispatcher.announce(&channel, &stream).await;
        assert_eq!(f.notifier.deliveries_for(&g1).len(), 1);
        assert_eq!(f.notifier.deliveries_for(&GroupId("g2".into())).len(), 1);
    }

    #[tokio::test]
    async fn dedup_entries_are_evicted_after_grace() {
        let mut f = fixture(0);
        let channel = ChannelId("UC1".into());
        f.resolver.set(channel.clone(), vec![subscription("a", &["g1"])]);

        let stream = live("vid1", "t");
        f.dispatcher.announce(&channel, &stream).await;
        assert_eq!(f.dispatcher.dedup_len(), 1);

        f.dispatcher.stream_ended(&stream.stream_id);
        // Zero grace: the entry is gone immediately.
        f.dispatcher.announce(&channel, &stream).await;
        assert_eq!(f.notifier.deliveries_for(&GroupId("g1".into())).len(), 2);
    }

    #[tokio::test]
    async fn entries_survive_within_the_grace_window() {
        let mut f = fixture(600);
        let channel = ChannelId("UC1".into());
        f.resolver.set(channel.clone(), vec![subscription("a", &["g1"])]);

        let stream = live("vid1", "t");
        f.dispatcher.announce(&channel, &stream).await;
        f.dispatcher.stream_ended(&stream.stream_id);
        // A flap inside the grace window is not re-announced.
        f.dispatcher.announce(&channel, &stream).await;
        assert_eq!(f.notifier.deliveries_for(&GroupId("g1".into())).len(), 1);
    }
}
