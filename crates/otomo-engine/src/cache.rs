// SPDX-FileCopyrightText: 2026 Otomo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded channel-metadata cache.
//!
//! Entries expire after a TTL and are evicted least-recently-used beyond the
//! configured capacity. Concurrent lookups of the same missing channel are
//! collapsed into a single upstream fetch, and a transient refresh failure
//! falls back to the expired entry rather than erroring.

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use metrics::counter;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use otomo_config::model::CacheConfig;
use otomo_core::{ChannelId, ChannelMetadata, OtomoError, UpstreamClient};

struct Entry {
    metadata: ChannelMetadata,
    fetched_at: Instant,
    last_used: Instant,
}

/// A cache lookup result. `stale` is set when the entry had expired and the
/// refresh failed transiently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedMetadata {
    pub metadata: ChannelMetadata,
    pub stale: bool,
}

/// Metadata cache over an [`UpstreamClient`].
pub struct MetadataCache {
    upstream: Arc<dyn UpstreamClient>,
    ttl: std::time::Duration,
    capacity: usize,
    entries: DashMap<ChannelId, Entry>,
    // One gate per channel collapses concurrent misses into one fetch.
    gates: DashMap<ChannelId, Arc<Mutex<()>>>,
}

impl MetadataCache {
    pub fn new(upstream: Arc<dyn UpstreamClient>, config: &CacheConfig) -> Self {
        Self {
            upstream,
            ttl: std::time::Duration::from_secs(config.ttl_secs),
            capacity: config.capacity.max(1),
            entries: DashMap::new(),
            gates: DashMap::new(),
        }
    }

    /// Look up a channel's metadata, fetching from upstream on a miss.
    pub async fn get(&self, channel: &ChannelId) -> Result<CachedMetadata, OtomoError> {
        if let Some(metadata) = self.fresh(channel) {
            counter!("otomo_cache_hits_total").increment(1);
            return Ok(CachedMetadata {
                metadata,
                stale: false,
            });
        }
        counter!("otomo_cache_misses_total").increment(1);

        let gate = self.gates.entry(channel.clone()).or_default().clone();
        let _permit = gate.lock().await;

        // Another waiter may have filled the entry while we queued.
        if let Some(metadata) = self.fresh(channel) {
            return Ok(CachedMetadata {
                metadata,
                stale: false,
            });
        }

        match self.upstream.fetch_channel(channel).await {
            Ok(metadata) => {
                self.insert(channel.clone(), metadata.clone());
                Ok(CachedMetadata {
                    metadata,
                    stale: false,
                })
            }
            Err(err) if err.is_transient() => match self.any_age(channel) {
                Some(metadata) => {
                    warn!(%channel, error = %err, "metadata refresh failed, serving stale entry");
                    Ok(CachedMetadata {
                        metadata,
                        stale: true,
                    })
                }
                None => {
                    self.gates.remove(channel);
                    Err(err)
                }
            },
            Err(err) => {
                // No entry will ever back this gate; drop it so repeated
                // lookups of unknown channels cannot grow the map unbounded.
                if !self.entries.contains_key(channel) {
                    self.gates.remove(channel);
                }
                Err(err)
            }
        }
    }

    /// Number of cached entries, fresh or expired.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn fresh(&self, channel: &ChannelId) -> Option<ChannelMetadata> {
        let mut entry = self.entries.get_mut(channel)?;
        if entry.fetched_at.elapsed() > self.ttl {
            return None;
        }
        entry.last_used = Instant::now();
        Some(entry.metadata.clone())
    }

    fn any_age(&self, channel: &ChannelId) -> Option<ChannelMetadata> {
        self.entries.get(channel).map(|e| e.metadata.clone())
    }

    fn insert(&self, channel: ChannelId, metadata: ChannelMetadata) {
        if !self.entries.contains_key(&channel) && self.entries.len() >= self.capacity {
            self.evict_lru();
        }
        let now = Instant::now();
        self.entries.insert(
            channel,
            Entry {
                metadata,
                fetched_at: now,
                last_used: now,
            },
        );
    }

    fn evict_lru(&self) {
        let victim = self
            .entries
            .iter()
            .min_by_key(|e| e.value().last_used)
            .map(|e| e.key().clone());
        if let Some(victim) = victim {
            self.entries.remove(&victim);
            self.gates.remove(&victim);
            debug!(channel = %victim, "evicted least-recently-used metadata entry");
        }
    }
}
