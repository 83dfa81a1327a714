// SPDX-FileCopyrightText: 2026 Otomo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Otomo relay engine.

use thiserror::Error;

use crate::types::{GroupId, StreamId};

/// The primary error type used across all Otomo collaborator traits and core
/// operations.
#[derive(Debug, Error)]
pub enum OtomoError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// The upstream aggregation API is unreachable or returned a transient
    /// failure. Always retryable, never fatal.
    #[error("upstream unavailable: {message}")]
    UpstreamUnavailable {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The requested entity does not exist upstream. A semantic signal, not
    /// an exceptional failure.
    #[error("not found: {0}")]
    NotFound(String),

    /// The stream no longer exists upstream. The relay manager treats this
    /// as an implicit end-of-stream signal.
    #[error("stream not found: {0}")]
    StreamNotFound(StreamId),

    /// Delivery to a single destination group failed. Isolated per call;
    /// never aborts sibling deliveries.
    #[error("delivery to {group} failed: {message}")]
    Delivery {
        group: GroupId,
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Community store errors (file read/write, serialization).
    #[error("store error: {source}")]
    Store {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl OtomoError {
    /// True for errors that a caller should retry with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, OtomoError::UpstreamUnavailable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_unavailable_is_transient() {
        let err = OtomoError::UpstreamUnavailable {
            message: "connect timed out".into(),
            source: None,
        };
        assert!(err.is_transient());
    }

    #[test]
    fn semantic_signals_are_not_transient() {
        assert!(!OtomoError::NotFound("ch".into()).is_transient());
        assert!(!OtomoError::StreamNotFound(StreamId("s1".into())).is_transient());
    }

    #[test]
    fn delivery_error_names_the_group() {
        let err = OtomoError::Delivery {
            group: GroupId("g1".into()),
            message: "webhook revoked".into(),
            source: None,
        };
        assert!(err.to_string().contains("g1"));
    }
}
