// SPDX-FileCopyrightText: 2026 Otomo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory [`DestinationResolver`] mock.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use otomo_core::{ChannelId, CommunityId, DestinationResolver, GroupId, Subscription};

/// Resolver over a mutable in-memory table. Tests can swap subscriptions
/// between poll cycles to exercise per-batch re-resolution.
#[derive(Default)]
pub struct StaticResolver {
    subs: Mutex<HashMap<ChannelId, Vec<Subscription>>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the subscriptions for one channel.
    pub fn set(&self, channel: ChannelId, subs: Vec<Subscription>) {
        self.subs.lock().unwrap().insert(channel, subs);
    }

    /// Drop a channel from the tracked set entirely.
    pub fn remove(&self, channel: &ChannelId) {
        self.subs.lock().unwrap().remove(channel);
    }
}

/// Shorthand for a subscription with no blacklist.
pub fn subscription(community: &str, groups: &[&str]) -> Subscription {
    Subscription {
        community: CommunityId(community.to_string()),
        groups: groups.iter().map(|g| GroupId(g.to_string())).collect(),
        blacklist: HashSet::new(),
    }
}

/// Shorthand for a subscription with a translator blacklist.
pub fn subscription_with_blacklist(
    community: &str,
    groups: &[&str],
    blacklist: &[&str],
) -> Subscription {
    Subscription {
        blacklist: blacklist.iter().map(|t| t.to_string()).collect(),
        ..subscription(community, groups)
    }
}

impl DestinationResolver for StaticResolver {
    fn subscribers_of(&self, channel: &ChannelId) -> Vec<Subscription> {
        self.subs
            .lock()
            .unwrap()
            .get(channel)
            .cloned()
            .unwrap_or_default()
    }

    fn tracked_channels(&self) -> HashSet<ChannelId> {
        self.subs.lock().unwrap().keys().cloned().collect()
    }
}
