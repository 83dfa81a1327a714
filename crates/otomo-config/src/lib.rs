// SPDX-FileCopyrightText: 2026 Otomo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Otomo relay engine.
//!
//! Provides TOML configuration parsing with strict validation
//! (`deny_unknown_fields`), XDG file hierarchy lookup, environment variable
//! overrides, diagnostic error rendering with typo suggestions, and the
//! JSON-backed community store that the engine resolves destinations from.
//!
//! # Usage
//!
//! ```no_run
//! use otomo_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("polling every {}s", config.upstream.poll_interval_secs);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod store;
pub mod validation;

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::OtomoConfig;
pub use store::CommunityStore;

/// Load configuration from the XDG hierarchy and validate it.
///
/// This is the high-level entry point that:
/// 1. Loads config from TOML files + env vars via Figment
/// 2. On success: runs post-deserialization validation
/// 3. On Figment error: converts to miette diagnostics with typo suggestions
///
/// Returns either a valid `OtomoConfig` or a list of diagnostic errors.
pub fn load_and_validate() -> Result<OtomoConfig, Vec<ConfigError>> {
    match loader::load_config() {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(err)),
    }
}

/// Load configuration from an explicit TOML file and validate it.
pub fn load_and_validate_path(path: &std::path::Path) -> Result<OtomoConfig, Vec<ConfigError>> {
    match loader::load_config_from_path(path) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(err)),
    }
}

/// Load configuration from a specific TOML string and validate it.
///
/// Useful for testing and explicit configuration.
pub fn load_and_validate_str(toml_content: &str) -> Result<OtomoConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(err)),
    }
}
