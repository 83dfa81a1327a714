// SPDX-FileCopyrightText: 2026 Otomo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the Holodex aggregation API.

use serde::Deserialize;

/// One video entry from `GET /users/live`.
#[derive(Debug, Clone, Deserialize)]
pub struct LiveVideo {
    pub id: String,
    pub title: String,
    pub status: String,
    pub channel: VideoChannel,
    #[serde(default)]
    pub start_actual: Option<String>,
}

/// Channel summary embedded in a video entry.
#[derive(Debug, Clone, Deserialize)]
pub struct VideoChannel {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Full channel record from `GET /channels/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub english_name: Option<String>,
    #[serde(default)]
    pub photo: Option<String>,
}

/// One page from the chat endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub messages: Vec<WireChatMessage>,
    pub cursor: String,
}

/// A single chat message on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct WireChatMessage {
    pub name: String,
    pub message: String,
    #[serde(default)]
    pub is_tl: bool,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub channel_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_video_parses_with_optional_fields_absent() {
        let json = r#"{
            "id": "vid1",
            "title": "stream",
            "status": "live",
            "channel": {"id": "UC1", "name": "Ch"}
        }"#;
        let video: LiveVideo = serde_json::from_str(json).unwrap();
        assert_eq!(video.id, "vid1");
        assert!(video.start_actual.is_none());
    }

    #[test]
    fn chat_response_defaults_empty_messages() {
        let json = r#"{"cursor": "c1"}"#;
        let page: ChatResponse = serde_json::from_str(json).unwrap();
        assert!(page.messages.is_empty());
        assert_eq!(page.cursor, "c1");
    }
}
