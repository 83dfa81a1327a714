// SPDX-FileCopyrightText: 2026 Otomo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-stream chat relay tasks.
//!
//! The supervisor keeps at most one relay task per stream id. Each task
//! fetches chat pages on an interval, re-resolves its subscribers every
//! batch, filters blacklisted translators per community, and advances its
//! cursor only after a page has been processed, so a failed cycle re-fetches
//! the same page rather than dropping it.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use metrics::{counter, gauge};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use otomo_config::model::UpstreamConfig;
use otomo_core::{
    ChannelId, ChatCursor, ChatPage, DestinationResolver, Notifier, OtomoError, StreamId,
    UpstreamClient,
};

use crate::format;

/// Relay timing and retry knobs.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub fetch_interval: Duration,
    pub retry_max: u32,
    pub retry_base: Duration,
}

impl From<&UpstreamConfig> for RelaySettings {
    fn from(config: &UpstreamConfig) -> Self {
        Self {
            fetch_interval: Duration::from_secs(config.chat_fetch_interval_secs),
            retry_max: config.chat_retry_max,
            retry_base: Duration::from_millis(config.chat_retry_base_ms),
        }
    }
}

/// Owns the registry of running relay tasks, keyed by stream id.
pub struct RelaySupervisor {
    upstream: Arc<dyn UpstreamClient>,
    resolver: Arc<dyn DestinationResolver>,
    notifier: Arc<dyn Notifier>,
    settings: RelaySettings,
    active: Arc<DashMap<StreamId, CancellationToken>>,
    tasks: TaskTracker,
}

impl RelaySupervisor {
    pub fn new(
        upstream: Arc<dyn UpstreamClient>,
        resolver: Arc<dyn DestinationResolver>,
        notifier: Arc<dyn Notifier>,
        settings: RelaySettings,
    ) -> Self {
        Self {
            upstream,
            resolver,
            notifier,
            settings,
            active: Arc::new(DashMap::new()),
            tasks: TaskTracker::new(),
        }
    }

    /// Start a relay task for a stream. A second start for the same stream id
    /// is ignored, so a channel has at most one active relay session.
    pub fn start(&self, channel: ChannelId, stream: StreamId) {
        if self.active.contains_key(&stream) {
            debug!(%stream, "relay already running");
            return;
        }
        let token = CancellationToken::new();
        self.active.insert(stream.clone(), token.clone());
        gauge!("otomo_active_relays").set(self.active.len() as f64);
        info!(%channel, %stream, "starting chat relay");

        let worker = RelayWorker {
            upstream: self.upstream.clone(),
            resolver: self.resolver.clone(),
            notifier: self.notifier.clone(),
            settings: self.settings.clone(),
            channel,
            stream: stream.clone(),
        };
        let active = self.active.clone();
        self.tasks.spawn(async move {
            worker.run(token).await;
            active.remove(&stream);
            gauge!("otomo_active_relays").set(active.len() as f64);
        });
    }

    /// Cancel the relay task for a stream, if one is running.
    pub fn stop(&self, stream: &StreamId) {
        if let Some((_, token)) = self.active.remove(stream) {
            info!(%stream, "stopping chat relay");
            token.cancel();
            gauge!("otomo_active_relays").set(self.active.len() as f64);
        }
    }

    /// Whether a relay task is currently registered for the stream.
    pub fn is_active(&self, stream: &StreamId) -> bool {
        self.active.contains_key(stream)
    }

    /// Cancel every task and wait for all of them to finish.
    pub async fn shutdown(&self) {
        for entry in self.active.iter() {
            entry.value().cancel();
        }
        self.tasks.close();
        self.tasks.wait().await;
    }
}

struct RelayWorker {
    upstream: Arc<dyn UpstreamClient>,
    resolver: Arc<dyn DestinationResolver>,
    notifier: Arc<dyn Notifier>,
    settings: RelaySettings,
    channel: ChannelId,
    stream: StreamId,
}

impl RelayWorker {
    async fn run(&self, token: CancellationToken) {
        let mut cursor: Option<ChatCursor> = None;
        let mut ticker = tokio::time::interval(self.settings.fetch_interval);
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!(stream = %self.stream, "relay cancelled");
                    return;
                }
                _ = ticker.tick() => {}
            }

            match self.fetch_with_retry(cursor.as_ref(), &token).await {
                Ok(page) => {
                    self.deliver_page(&page).await;
                    cursor = Some(page.next_cursor);
                }
                Err(OtomoError::StreamNotFound(_)) => {
                    info!(stream = %self.stream, "stream gone upstream, ending relay");
                    return;
                }
                Err(err) => {
                    // Cursor untouched, so the next cycle retries this page.
                    warn!(stream = %self.stream, error = %err, "chat fetch failed");
                }
            }
        }
    }

    async fn fetch_with_retry(
        &self,
        cursor: Option<&ChatCursor>,
        token: &CancellationToken,
    ) -> Result<ChatPage, OtomoError> {
        let mut attempt = 0;
        loop {
            match self.upstream.fetch_chat(&self.stream, cursor).await {
                Ok(page) => return Ok(page),
                Err(err) if err.is_transient() && attempt < self.settings.retry_max => {
                    let delay = self.settings.retry_base * 2u32.pow(attempt);
                    attempt += 1;
                    warn!(
                        stream = %self.stream,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "transient chat fetch failure, backing off"
                    );
                    tokio::select! {
                        _ = token.cancelled() => return Err(err),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Fan a page out to current subscribers. Resolution happens here, per
    /// batch, so subscription and blacklist edits apply mid-stream.
    async fn deliver_page(&self, page: &ChatPage) {
        let translations: Vec<_> = page
            .messages
            .iter()
            .filter_map(|m| m.translator.as_deref().map(|t| (m, t)))
            .collect();
        if translations.is_empty() {
            return;
        }

        for sub in self.resolver.subscribers_of(&self.channel) {
            let lines: Vec<String> = translations
                .iter()
                .filter(|(_, translator)| !sub.is_blacklisted(translator))
                .map(|(message, _)| format::chat_line(message))
                .collect();
            if lines.is_empty() {
                continue;
            }
            for group in &sub.groups {
                for line in &lines {
                    match self.notifier.deliver(group, line).await {
                        Ok(()) => {
                            counter!("otomo_chat_messages_relayed_total").increment(1);
                        }
                        Err(err) => {
                            // One broken destination must not block the rest.
                            warn!(%group, error = %err, "chat delivery failed");
                            break;
                        }
                    }
                }
            }
        }
    }
}
