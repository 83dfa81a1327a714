// SPDX-FileCopyrightText: 2026 Otomo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as non-zero intervals and well-formed URLs.

use crate::diagnostic::ConfigError;
use crate::model::OtomoConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &OtomoConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.upstream.base_url.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "upstream.base_url must not be empty".to_string(),
        });
    } else if !config.upstream.base_url.starts_with("http://")
        && !config.upstream.base_url.starts_with("https://")
    {
        errors.push(ConfigError::Validation {
            message: format!(
                "upstream.base_url `{}` must be an http(s) URL",
                config.upstream.base_url
            ),
        });
    }

    if config.upstream.poll_interval_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "upstream.poll_interval_secs must be at least 1".to_string(),
        });
    }

    if config.upstream.chat_fetch_interval_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "upstream.chat_fetch_interval_secs must be at least 1".to_string(),
        });
    }

    if config.upstream.chat_retry_max == 0 {
        errors.push(ConfigError::Validation {
            message: "upstream.chat_retry_max must be at least 1".to_string(),
        });
    }

    if config.cache.ttl_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "cache.ttl_secs must be at least 1".to_string(),
        });
    }

    if config.cache.capacity == 0 {
        errors.push(ConfigError::Validation {
            message: "cache.capacity must be at least 1".to_string(),
        });
    }

    if config.store.path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "store.path must not be empty".to_string(),
        });
    }

    if let Some(listen) = &config.metrics.listen {
        if listen.parse::<std::net::SocketAddr>().is_err() {
            errors.push(ConfigError::Validation {
                message: format!("metrics.listen `{listen}` is not a socket address"),
            });
        }
    }

    for (group, url) in &config.discord.webhooks {
        if url.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("discord.webhooks.{group} must not be empty"),
            });
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
