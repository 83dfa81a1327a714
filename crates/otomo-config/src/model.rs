// SPDX-FileCopyrightText: 2026 Otomo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Otomo relay engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Top-level Otomo configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OtomoConfig {
    /// Upstream aggregation API settings (polling, chat fetch, retries).
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Channel metadata cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Start-notification dedup settings.
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Discord delivery settings.
    #[serde(default)]
    pub discord: DiscordConfig,

    /// Community store (subscriptions and blacklists) settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,

    /// Metrics exporter settings.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Upstream aggregation API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UpstreamConfig {
    /// API key sent with every upstream request.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL of the aggregation API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Seconds between live-status poll cycles.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Consecutive whole-batch poll failures before a degraded-health
    /// signal is raised. Polling continues regardless.
    #[serde(default = "default_poll_failure_threshold")]
    pub poll_failure_threshold: u32,

    /// Per-request HTTP timeout.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Seconds between chat fetch cycles within one relay task.
    #[serde(default = "default_chat_fetch_interval")]
    pub chat_fetch_interval_secs: u64,

    /// Maximum in-cycle retry attempts for a failed chat fetch.
    #[serde(default = "default_chat_retry_max")]
    pub chat_retry_max: u32,

    /// Base backoff delay between chat fetch retries, doubled per attempt.
    #[serde(default = "default_chat_retry_base_ms")]
    pub chat_retry_base_ms: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            poll_interval_secs: default_poll_interval(),
            poll_failure_threshold: default_poll_failure_threshold(),
            request_timeout_secs: default_request_timeout(),
            chat_fetch_interval_secs: default_chat_fetch_interval(),
            chat_retry_max: default_chat_retry_max(),
            chat_retry_base_ms: default_chat_retry_base_ms(),
        }
    }
}

fn default_base_url() -> String {
    "https://holodex.net/api/v2".to_string()
}

fn default_poll_interval() -> u64 {
    300
}

fn default_poll_failure_threshold() -> u32 {
    3
}

fn default_request_timeout() -> u64 {
    30
}

fn default_chat_fetch_interval() -> u64 {
    5
}

fn default_chat_retry_max() -> u32 {
    3
}

fn default_chat_retry_base_ms() -> u64 {
    500
}

/// Channel metadata cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Seconds before a cached metadata entry expires.
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,

    /// Maximum number of cached entries; least-recently-used entries are
    /// evicted beyond this.
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl(),
            capacity: default_cache_capacity(),
        }
    }
}

fn default_cache_ttl() -> u64 {
    24 * 60 * 60
}

fn default_cache_capacity() -> usize {
    1024
}

/// Start-notification dedup configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NotifyConfig {
    /// Seconds a notified stream id is remembered after the stream ends,
    /// bounding the dedup set.
    #[serde(default = "default_dedup_grace")]
    pub dedup_grace_secs: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            dedup_grace_secs: default_dedup_grace(),
        }
    }
}

fn default_dedup_grace() -> u64 {
    600
}

/// Discord delivery configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DiscordConfig {
    /// Webhook URL per destination group id. Groups may also be registered
    /// at runtime; entries here are the seed set.
    #[serde(default)]
    pub webhooks: HashMap<String, String>,
}

/// Community store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Path to the communities JSON file.
    #[serde(default = "default_store_path")]
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> String {
    "communities.json".to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Metrics exporter configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Socket address for the Prometheus scrape endpoint. Metrics are
    /// recorded but not exported when unset.
    #[serde(default)]
    pub listen: Option<String>,
}
