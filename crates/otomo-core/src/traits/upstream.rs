// SPDX-FileCopyrightText: 2026 Otomo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Upstream aggregation API client trait.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use crate::error::OtomoError;
use crate::types::{ChannelId, ChannelMetadata, ChatCursor, ChatPage, LiveStream, StreamId};

/// Client for the upstream video-platform aggregation API.
///
/// Implementations are the only source of live-status, metadata, and chat
/// data. All methods are rate-limit aware; callers never hammer them in
/// tight loops.
#[async_trait]
pub trait UpstreamClient: Send + Sync + 'static {
    /// Polls live status for a batch of channels in one upstream call.
    ///
    /// Every channel the upstream resolved appears as a key; `Some` means a
    /// broadcast is live, `None` means the channel is idle. Channels absent
    /// from the map were not resolved this cycle and must keep their prior
    /// tracked state. Fails whole-batch with
    /// [`OtomoError::UpstreamUnavailable`].
    async fn poll_live(
        &self,
        channels: &HashSet<ChannelId>,
    ) -> Result<HashMap<ChannelId, Option<LiveStream>>, OtomoError>;

    /// Fetches display metadata for one channel.
    ///
    /// Fails with [`OtomoError::NotFound`] when the channel does not exist,
    /// or [`OtomoError::UpstreamUnavailable`] on transient failure.
    async fn fetch_channel(&self, channel: &ChannelId) -> Result<ChannelMetadata, OtomoError>;

    /// Fetches chat messages for a stream since `cursor` (`None` = from the
    /// start of relay).
    ///
    /// Re-fetching with an unchanged cursor returns the same messages.
    /// Fails with [`OtomoError::StreamNotFound`] once the stream is gone,
    /// which the relay manager treats as an implicit end signal.
    async fn fetch_chat(
        &self,
        stream: &StreamId,
        cursor: Option<&ChatCursor>,
    ) -> Result<ChatPage, OtomoError>;
}
