// SPDX-FileCopyrightText: 2026 Otomo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rendering of relayed chat lines and live notices into delivery-ready
//! markdown.

use otomo_core::{ChatMessage, StreamNotice};

/// Render a relayed translation line.
///
/// The author is wrapped in spoiler markers so readers can hide it, and
/// backticks in the body are stripped to keep the line from breaking out of
/// inline code spans.
pub fn chat_line(message: &ChatMessage) -> String {
    format!("||{}:|| {}", message.author, sanitize(&message.text))
}

/// Render the go-live notice for one stream.
pub fn live_notice(notice: &StreamNotice) -> String {
    format!(
        "**{}** is now live!\n**{}**\n{}",
        notice.channel_name,
        sanitize(&notice.title),
        notice.url
    )
}

/// Watch URL for a stream id.
pub fn stream_url(stream_id: &str) -> String {
    format!("https://youtu.be/{stream_id}")
}

fn sanitize(text: &str) -> String {
    text.replace('`', "''")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use otomo_core::{ChannelId, StreamId};

    fn message(author: &str, text: &str) -> ChatMessage {
        ChatMessage {
            stream_id: StreamId("vid1".into()),
            channel_id: ChannelId("UC1".into()),
            author: author.to_string(),
            translator: Some(author.to_string()),
            text: text.to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn chat_line_spoilers_the_author() {
        let line = chat_line(&message("tl_alice", "[EN] hello"));
        assert_eq!(line, "||tl_alice:|| [EN] hello");
    }

    #[test]
    fn chat_line_replaces_backticks_with_double_quotes() {
        let line = chat_line(&message("tl_alice", "code `here`"));
        assert_eq!(line, "||tl_alice:|| code ''here''");
    }

    #[test]
    fn live_notice_includes_name_title_and_url() {
        let notice = StreamNotice {
            channel: ChannelId("UC1".into()),
            stream: StreamId("vid1".into()),
            channel_name: "Ch One".into(),
            title: "karaoke".into(),
            url: stream_url("vid1"),
        };
        let text = live_notice(&notice);
        assert!(text.contains("**Ch One** is now live!"));
        assert!(text.contains("**karaoke**"));
        assert!(text.contains("https://youtu.be/vid1"));
    }
}
