// SPDX-FileCopyrightText: 2026 Otomo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Otomo stream-relay engine.
//!
//! This crate provides the foundational trait definitions, error types, and
//! domain types used throughout the Otomo workspace. The engine and all
//! adapters depend on the seams defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::OtomoError;
pub use types::{
    ChannelId, ChannelMetadata, ChatCursor, ChatMessage, ChatPage, CommunityId, GroupId,
    HealthEvent, HealthScope, LiveStream, StreamId, StreamNotice, Subscription,
};

// Re-export all collaborator traits at crate root.
pub use traits::{DestinationResolver, HealthSink, Notifier, UpstreamClient};
