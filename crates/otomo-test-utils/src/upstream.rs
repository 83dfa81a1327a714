// SPDX-FileCopyrightText: 2026 Otomo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scriptable [`UpstreamClient`] mock.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use otomo_core::{
    ChannelId, ChannelMetadata, ChatCursor, ChatPage, LiveStream, OtomoError, StreamId,
    UpstreamClient,
};

enum ScriptedPoll {
    Resolved(HashMap<ChannelId, Option<LiveStream>>),
    Unavailable(String),
}

enum ScriptedChat {
    Page(ChatPage),
    Gone,
    Unavailable(String),
}

/// Scriptable upstream: tests queue poll results and chat pages, register
/// channel metadata, and inject failures.
///
/// When the poll queue is empty every requested channel resolves to idle.
/// When a stream's chat queue is empty the fetch returns an empty page that
/// leaves the cursor where it was.
#[derive(Default)]
pub struct MockUpstream {
    polls: Mutex<VecDeque<ScriptedPoll>>,
    channels: Mutex<HashMap<ChannelId, ChannelMetadata>>,
    channel_failures: Mutex<HashMap<ChannelId, u32>>,
    fetch_delay: Mutex<Option<Duration>>,
    fetch_counts: Mutex<HashMap<ChannelId, u32>>,
    chat: Mutex<HashMap<StreamId, VecDeque<ScriptedChat>>>,
}

impl MockUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one poll cycle's resolved statuses.
    pub fn push_poll(&self, statuses: HashMap<ChannelId, Option<LiveStream>>) {
        self.polls
            .lock()
            .unwrap()
            .push_back(ScriptedPoll::Resolved(statuses));
    }

    /// Queue a whole-batch poll failure.
    pub fn push_poll_failure(&self, message: &str) {
        self.polls
            .lock()
            .unwrap()
            .push_back(ScriptedPoll::Unavailable(message.to_string()));
    }

    /// Register metadata served by `fetch_channel`.
    pub fn set_channel(&self, metadata: ChannelMetadata) {
        self.channels
            .lock()
            .unwrap()
            .insert(metadata.channel_id.clone(), metadata);
    }

    /// Make the next `times` metadata fetches for `channel` fail transiently.
    pub fn fail_channel(&self, channel: &ChannelId, times: u32) {
        self.channel_failures
            .lock()
            .unwrap()
            .insert(channel.clone(), times);
    }

    /// Delay every metadata fetch, to widen race windows in tests.
    pub fn set_fetch_delay(&self, delay: Duration) {
        *self.fetch_delay.lock().unwrap() = Some(delay);
    }

    /// Number of `fetch_channel` calls seen for `channel`.
    pub fn fetch_count(&self, channel: &ChannelId) -> u32 {
        self.fetch_counts
            .lock()
            .unwrap()
            .get(channel)
            .copied()
            .unwrap_or(0)
    }

    /// Queue one chat page for a stream.
    pub fn push_chat_page(&self, stream: &StreamId, page: ChatPage) {
        self.chat
            .lock()
            .unwrap()
            .entry(stream.clone())
            .or_default()
            .push_back(ScriptedChat::Page(page));
    }

    /// Queue a not-found response, signalling the stream is gone.
    pub fn push_chat_gone(&self, stream: &StreamId) {
        self.chat
            .lock()
            .unwrap()
            .entry(stream.clone())
            .or_default()
            .push_back(ScriptedChat::Gone);
    }

    /// Queue a transient chat fetch failure.
    pub fn push_chat_failure(&self, stream: &StreamId, message: &str) {
        self.chat
            .lock()
            .unwrap()
            .entry(stream.clone())
            .or_default()
            .push_back(ScriptedChat::Unavailable(message.to_string()));
    }
}

/// Shorthand for a live status entry.
pub fn live(stream_id: &str, title: &str) -> Option<LiveStream> {
    Some(LiveStream {
        stream_id: StreamId(stream_id.to_string()),
        title: title.to_string(),
        started_at: None,
    })
}

#[async_trait]
impl UpstreamClient for MockUpstream {
    async fn poll_live(
        &self,
        channels: &HashSet<ChannelId>,
    ) -> Result<HashMap<ChannelId, Option<LiveStream>>, OtomoError> {
        let scripted = self.polls.lock().unwrap().pop_front();
        match scripted {
            Some(ScriptedPoll::Resolved(statuses)) => Ok(statuses),
            Some(ScriptedPoll::Unavailable(message)) => Err(OtomoError::UpstreamUnavailable {
                message,
                source: None,
            }),
            None => Ok(channels.iter().map(|c| (c.clone(), None)).collect()),
        }
    }

    async fn fetch_channel(&self, channel: &ChannelId) -> Result<ChannelMetadata, OtomoError> {
        *self
            .fetch_counts
            .lock()
            .unwrap()
            .entry(channel.clone())
            .or_insert(0) += 1;

        let delay = *self.fetch_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        {
            let mut failures = self.channel_failures.lock().unwrap();
            if let Some(remaining) = failures.get_mut(channel) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(OtomoError::UpstreamUnavailable {
                        message: format!("scripted failure for {channel}"),
                        source: None,
                    });
                }
            }
        }

        self.channels
            .lock()
            .unwrap()
            .get(channel)
            .cloned()
            .ok_or_else(|| OtomoError::NotFound(channel.0.clone()))
    }

    async fn fetch_chat(
        &self,
        stream: &StreamId,
        cursor: Option<&ChatCursor>,
    ) -> Result<ChatPage, OtomoError> {
        let scripted = self
            .chat
            .lock()
            .unwrap()
            .get_mut(stream)
            .and_then(VecDeque::pop_front);
        match scripted {
            Some(ScriptedChat::Page(page)) => Ok(page),
            Some(ScriptedChat::Gone) => Err(OtomoError::StreamNotFound(stream.clone())),
            Some(ScriptedChat::Unavailable(message)) => Err(OtomoError::UpstreamUnavailable {
                message,
                source: None,
            }),
            None => Ok(ChatPage {
                messages: Vec::new(),
                next_cursor: cursor.cloned().unwrap_or_else(|| ChatCursor("0".into())),
            }),
        }
    }
}
