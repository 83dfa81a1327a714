// SPDX-FileCopyrightText: 2026 Otomo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Destination resolver trait over the per-community configuration store.

use std::collections::HashSet;

use crate::types::{ChannelId, Subscription};

/// Read-only view of the committed per-community relay configuration.
///
/// The engine never mutates configuration; it re-resolves through this trait
/// whenever it needs the current destination set, so subscription changes
/// take effect on the next poll or relay batch without restarts.
/// Implementations must reflect the latest committed state at call time.
pub trait DestinationResolver: Send + Sync + 'static {
    /// All communities subscribed to `channel`, with their destination
    /// groups and translator blacklists.
    fn subscribers_of(&self, channel: &ChannelId) -> Vec<Subscription>;

    /// The union of channels subscribed by at least one community. A channel
    /// is tracked exactly while this set contains it.
    fn tracked_channels(&self) -> HashSet<ChannelId>;
}
