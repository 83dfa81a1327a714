// SPDX-FileCopyrightText: 2026 Otomo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Live-state tracker: polls upstream for the tracked channel set and turns
//! status deltas into an ordered stream of [`StreamEvent`]s.
//!
//! The tracker is the only writer of live state. Events for one channel are
//! emitted in transition order over a single bounded channel, so a
//! replacement (one stream ends as another begins) is always observed as
//! `Ended` then `Started`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use otomo_config::model::UpstreamConfig;
use otomo_core::{
    ChannelId, DestinationResolver, HealthEvent, HealthScope, HealthSink, LiveStream, StreamId,
    UpstreamClient,
};

/// One observed live-state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A tracked channel went live.
    Started {
        channel: ChannelId,
        stream: LiveStream,
    },
    /// A channel's live stream ended (or the channel left the tracked set).
    Ended {
        channel: ChannelId,
        stream: StreamId,
    },
}

/// Polls upstream and owns the per-channel live state.
pub struct LiveTracker {
    upstream: Arc<dyn UpstreamClient>,
    resolver: Arc<dyn DestinationResolver>,
    health: Arc<dyn HealthSink>,
    events: mpsc::Sender<StreamEvent>,
    poll_interval: Duration,
    failure_threshold: u32,
    live: HashMap<ChannelId, StreamId>,
    consecutive_failures: u32,
}

impl LiveTracker {
    pub fn new(
        upstream: Arc<dyn UpstreamClient>,
        resolver: Arc<dyn DestinationResolver>,
        health: Arc<dyn HealthSink>,
        events: mpsc::Sender<StreamEvent>,
        config: &UpstreamConfig,
    ) -> Self {
        Self {
            upstream,
            resolver,
            health,
            events,
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            failure_threshold: config.poll_failure_threshold.max(1),
            live: HashMap::new(),
            consecutive_failures: 0,
        }
    }

    /// Poll until cancelled. The first cycle runs immediately.
    pub async fn run(mut self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        info!(interval_secs = self.poll_interval.as_secs(), "live tracker started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("live tracker stopping");
                    return;
                }
                _ = ticker.tick() => {}
            }
            if self.poll_once().await.is_err() {
                // Receiver gone, nothing left to drive.
                return;
            }
        }
    }

    /// Run one poll cycle. Errs only when the event receiver has closed.
    pub async fn poll_once(&mut self) -> Result<(), mpsc::error::SendError<StreamEvent>> {
        counter!("otomo_poll_cycles_total").increment(1);
        let tracked = self.resolver.tracked_channels();

        // Channels dropped from the tracked set while live end implicitly.
        let untracked: Vec<ChannelId> = self
            .live
            .keys()
            .filter(|c| !tracked.contains(*c))
            .cloned()
            .collect();
        for channel in untracked {
            if let Some(stream) = self.live.remove(&channel) {
                debug!(%channel, %stream, "channel left tracked set while live");
                self.emit(StreamEvent::Ended { channel, stream }).await?;
            }
        }

        if tracked.is_empty() {
            return Ok(());
        }

        let statuses = match self.upstream.poll_live(&tracked).await {
            Ok(statuses) => {
                self.consecutive_failures = 0;
                statuses
            }
            Err(err) => {
                self.consecutive_failures += 1;
                warn!(
                    failures = self.consecutive_failures,
                    error = %err,
                    "live poll failed, keeping previous state"
                );
                if self.consecutive_failures % self.failure_threshold == 0 {
                    self.health
                        .report_degraded(HealthEvent {
                            scope: HealthScope::Global,
                            reason: format!(
                                "{} consecutive poll failures: {err}",
                                self.consecutive_failures
                            ),
                        })
                        .await;
                }
                return Ok(());
            }
        };

        // Only resolved channels are touched; a channel absent from the
        // response keeps its previous state.
        for (channel, status) in statuses {
            if !tracked.contains(&channel) {
                continue;
            }
            match (self.live.get(&channel).cloned(), status) {
                (None, Some(stream)) => {
                    self.live.insert(channel.clone(), stream.stream_id.clone());
                    counter!("otomo_stream_events_total", "kind" => "started").increment(1);
                    self.emit(StreamEvent::Started { channel, stream }).await?;
                }
                (Some(prev), None) => {
                    self.live.remove(&channel);
                    counter!("otomo_stream_events_total", "kind" => "ended").increment(1);
                    self.emit(StreamEvent::Ended {
                        channel,
                        stream: prev,
                    })
                    .await?;
                }
                (Some(prev), Some(stream)) if prev != stream.stream_id => {
                    // Replacement: the old session ends before the new begins.
                    self.live.insert(channel.clone(), stream.stream_id.clone());
                    counter!("otomo_stream_events_total", "kind" => "ended").increment(1);
                    self.emit(StreamEvent::Ended {
                        channel: channel.clone(),
                        stream: prev,
                    })
                    .await?;
                    counter!("otomo_stream_events_total", "kind" => "started").increment(1);
                    self.emit(StreamEvent::Started { channel, stream }).await?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    async fn emit(
        &self,
        event: StreamEvent,
    ) -> Result<(), mpsc::error::SendError<StreamEvent>> {
        debug!(?event, "stream event");
        self.events.send(event).await
    }
}
