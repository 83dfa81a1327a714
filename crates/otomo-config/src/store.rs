// SPDX-FileCopyrightText: 2026 Otomo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON-backed community store: per-community relay subscriptions and
//! translator blacklists.
//!
//! Reads go through an [`arc_swap::ArcSwap`] snapshot so the engine's
//! per-batch re-resolution never takes a lock; writes serialize behind a
//! mutex, persist atomically (temp file + rename), then publish a fresh
//! snapshot.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use otomo_core::{ChannelId, CommunityId, DestinationResolver, GroupId, OtomoError, Subscription};

/// One community's committed configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommunityRecord {
    /// Upstream channel id -> destination group ids.
    #[serde(default)]
    pub relay_channels: HashMap<String, Vec<String>>,
    /// Translator names suppressed for this community.
    #[serde(default)]
    pub tl_blacklist: Vec<String>,
}

type StoreData = HashMap<String, CommunityRecord>;

/// Community store backed by a JSON file.
///
/// The engine consumes this through [`DestinationResolver`]; command-surface
/// collaborators mutate it through the `add_*`/`remove_*` methods. Every
/// mutation is persisted before the new snapshot becomes visible, so a
/// successful call means committed configuration.
pub struct CommunityStore {
    path: PathBuf,
    snapshot: ArcSwap<StoreData>,
    // Serializes writers; readers never touch it.
    write_lock: Mutex<()>,
}

impl CommunityStore {
    /// Open the store at `path`, loading existing data if the file exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, OtomoError> {
        let path = path.as_ref().to_path_buf();
        let data = if path.exists() {
            let raw = std::fs::read_to_string(&path).map_err(|e| OtomoError::Store {
                source: Box::new(e),
            })?;
            serde_json::from_str(&raw).map_err(|e| OtomoError::Store {
                source: Box::new(e),
            })?
        } else {
            StoreData::new()
        };
        info!(path = %path.display(), communities = data.len(), "community store opened");
        Ok(Self {
            path,
            snapshot: ArcSwap::from_pointee(data),
            write_lock: Mutex::new(()),
        })
    }

    /// Subscribe a community's group to an upstream channel.
    ///
    /// Returns `false` if the pair was already configured.
    pub fn add_subscription(
        &self,
        community: &CommunityId,
        channel: &ChannelId,
        group: &GroupId,
    ) -> Result<bool, OtomoError> {
        self.mutate(|data| {
            let record = data.entry(community.0.clone()).or_default();
            let groups = record.relay_channels.entry(channel.0.clone()).or_default();
            if groups.contains(&group.0) {
                return false;
            }
            groups.push(group.0.clone());
            true
        })
    }

    /// Remove a group's subscription to an upstream channel. Drops the
    /// channel entry entirely once its group list is empty, which in turn
    /// removes the channel from the tracked set if no other community
    /// subscribes to it.
    pub fn remove_subscription(
        &self,
        community: &CommunityId,
        channel: &ChannelId,
        group: &GroupId,
    ) -> Result<bool, OtomoError> {
        self.mutate(|data| {
            let Some(record) = data.get_mut(&community.0) else {
                return false;
            };
            let Some(groups) = record.relay_channels.get_mut(&channel.0) else {
                return false;
            };
            let before = groups.len();
            groups.retain(|g| g != &group.0);
            let removed = groups.len() != before;
            if groups.is_empty() {
                record.relay_channels.remove(&channel.0);
            }
            removed
        })
    }

    /// Add a translator to a community's blacklist.
    ///
    /// Returns `false` if already blacklisted (case-insensitive).
    pub fn add_blacklisted(
        &self,
        community: &CommunityId,
        translator: &str,
    ) -> Result<bool, OtomoError> {
        self.mutate(|data| {
            let record = data.entry(community.0.clone()).or_default();
            let lowered = translator.to_lowercase();
            if record
                .tl_blacklist
                .iter()
                .any(|t| t.to_lowercase() == lowered)
            {
                return false;
            }
            record.tl_blacklist.push(translator.to_string());
            true
        })
    }

    /// Remove a translator from a community's blacklist.
    pub fn remove_blacklisted(
        &self,
        community: &CommunityId,
        translator: &str,
    ) -> Result<bool, OtomoError> {
        self.mutate(|data| {
            let Some(record) = data.get_mut(&community.0) else {
                return false;
            };
            let lowered = translator.to_lowercase();
            let before = record.tl_blacklist.len();
            record.tl_blacklist.retain(|t| t.to_lowercase() != lowered);
            record.tl_blacklist.len() != before
        })
    }

    /// Apply a mutation to a copy of the data, persist it, then publish.
    fn mutate<T>(&self, f: impl FnOnce(&mut StoreData) -> T) -> Result<T, OtomoError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| OtomoError::Internal("community store lock poisoned".into()))?;
        let mut data = (**self.snapshot.load()).clone();
        let result = f(&mut data);
        self.persist(&data)?;
        self.snapshot.store(Arc::new(data));
        Ok(result)
    }

    /// Write the store atomically: temp file in the same directory, then
    /// rename over the target.
    fn persist(&self, data: &StoreData) -> Result<(), OtomoError> {
        let serialized =
            serde_json::to_string_pretty(data).map_err(|e| OtomoError::Store {
                source: Box::new(e),
            })?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serialized).map_err(|e| OtomoError::Store {
            source: Box::new(e),
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|e| OtomoError::Store {
            source: Box::new(e),
        })?;
        debug!(path = %self.path.display(), "community store persisted");
        Ok(())
    }
}

impl DestinationResolver for CommunityStore {
    fn subscribers_of(&self, channel: &ChannelId) -> Vec<Subscription> {
        let data = self.snapshot.load();
        let mut subs = Vec::new();
        for (community, record) in data.iter() {
            if let Some(groups) = record.relay_channels.get(&channel.0) {
                subs.push(Subscription {
                    community: CommunityId(community.clone()),
                    groups: groups.iter().cloned().map(GroupId).collect(),
                    blacklist: record.tl_blacklist.iter().cloned().collect(),
                });
            }
        }
        subs
    }

    fn tracked_channels(&self) -> HashSet<ChannelId> {
        let data = self.snapshot.load();
        data.values()
            .flat_map(|record| record.relay_channels.keys())
            .cloned()
            .map(ChannelId)
            .collect()
    }
}
