// SPDX-FileCopyrightText: 2026 Otomo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator trait definitions for the Otomo relay engine.
//!
//! The engine only ever talks to the outside world through these seams:
//! the upstream aggregation API, the per-community destination
//! configuration, the delivery channel, and the operator health signal.
//! All async traits use `#[async_trait]` for dynamic dispatch.

pub mod health;
pub mod notifier;
pub mod resolver;
pub mod upstream;

// Re-export all traits at the traits module level for convenience.
pub use health::HealthSink;
pub use notifier::Notifier;
pub use resolver::DestinationResolver;
pub use upstream::UpstreamClient;
