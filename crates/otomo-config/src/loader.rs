// SPDX-FileCopyrightText: 2026 Otomo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./otomo.toml` > `~/.config/otomo/otomo.toml` >
//! `/etc/otomo/otomo.toml` with environment variable overrides via the
//! `OTOMO_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::OtomoConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/otomo/otomo.toml` (system-wide)
/// 3. `~/.config/otomo/otomo.toml` (user XDG config)
/// 4. `./otomo.toml` (local directory)
/// 5. `OTOMO_*` environment variables
pub fn load_config() -> Result<OtomoConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<OtomoConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(OtomoConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<OtomoConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(OtomoConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for
/// diagnostic use).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(OtomoConfig::default()))
        .merge(Toml::file("/etc/otomo/otomo.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("otomo/otomo.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("otomo.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `OTOMO_UPSTREAM_POLL_INTERVAL_SECS` must
/// map to `upstream.poll_interval_secs`, not `upstream.poll.interval.secs`.
fn env_provider() -> Env {
    Env::prefixed("OTOMO_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("upstream_", "upstream.", 1)
            .replacen("cache_", "cache.", 1)
            .replacen("notify_", "notify.", 1)
            .replacen("discord_", "discord.", 1)
            .replacen("store_", "store.", 1)
            .replacen("log_", "log.", 1);
        mapped.into()
    })
}
