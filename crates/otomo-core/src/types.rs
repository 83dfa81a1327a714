// SPDX-FileCopyrightText: 2026 Otomo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Otomo workspace.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Upstream-assigned identifier for a video channel under observation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(pub String);

/// Identifier for one live broadcast. Distinct from the channel id: a
/// channel hosts many streams over time, at most one live at once.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamId(pub String);

/// Identifier for an independently configured community (a guild).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommunityId(pub String);

/// A messaging-platform delivery target configured to receive relayed content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupId(pub String);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for CommunityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One live broadcast as reported by a poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveStream {
    pub stream_id: StreamId,
    pub title: String,
    pub started_at: Option<DateTime<Utc>>,
}

/// Display metadata for a channel, served from the metadata cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMetadata {
    pub channel_id: ChannelId,
    pub display_name: String,
    pub english_name: Option<String>,
    pub photo_url: Option<String>,
}

/// Opaque pagination token marking chat relay progress within a stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatCursor(pub String);

/// A chat message pulled from a live stream. Transient; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub stream_id: StreamId,
    pub channel_id: ChannelId,
    pub author: String,
    /// Translator name, when the message is a tagged translation.
    pub translator: Option<String>,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// One page of chat messages plus the cursor to resume from.
///
/// Re-fetching with an unchanged cursor returns the same page; advancing the
/// cursor only after successful processing gives at-least-once delivery.
#[derive(Debug, Clone)]
pub struct ChatPage {
    pub messages: Vec<ChatMessage>,
    pub next_cursor: ChatCursor,
}

/// A community's subscription to one channel: where its relayed content goes
/// and which translators it suppresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub community: CommunityId,
    pub groups: Vec<GroupId>,
    /// Translator names suppressed for this community, compared
    /// case-insensitively.
    pub blacklist: HashSet<String>,
}

impl Subscription {
    /// Whether this community suppresses the given translator name.
    pub fn is_blacklisted(&self, translator: &str) -> bool {
        let lowered = translator.to_lowercase();
        self.blacklist.iter().any(|t| t.to_lowercase() == lowered)
    }
}

/// Content handed to the notifier when a tracked channel goes live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamNotice {
    pub channel: ChannelId,
    pub stream: StreamId,
    pub channel_name: String,
    pub title: String,
    pub url: String,
}

/// Scope of a degraded-health report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthScope {
    /// One channel's poll or fetch path is failing.
    Channel(ChannelId),
    /// Whole-batch polling is failing.
    Global,
}

/// Operator-facing degraded-health signal raised when poll or fetch
/// failures exceed the retry threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthEvent {
    pub scope: HealthScope,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blacklist_match_is_case_insensitive_and_exact() {
        let sub = Subscription {
            community: CommunityId("a".into()),
            groups: vec![GroupId("g1".into())],
            blacklist: ["Tl_Bob".to_string()].into_iter().collect(),
        };
        assert!(sub.is_blacklisted("tl_bob"));
        assert!(sub.is_blacklisted("TL_BOB"));
        assert!(!sub.is_blacklisted("tl_bobby"));
        assert!(!sub.is_blacklisted("bob"));
    }

    #[test]
    fn ids_round_trip_through_serde() {
        let id = ChannelId("UC123".into());
        let json = serde_json::to_string(&id).unwrap();
        let parsed: ChannelId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn ids_display_their_inner_value() {
        assert_eq!(StreamId("s1".into()).to_string(), "s1");
        assert_eq!(GroupId("g9".into()).to_string(), "g9");
    }
}
