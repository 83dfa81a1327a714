// SPDX-FileCopyrightText: 2026 Otomo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery trait for the downstream group-messaging platform.

use async_trait::async_trait;

use crate::error::OtomoError;
use crate::types::GroupId;

/// Delivers relayed content to one destination group.
///
/// A failed delivery is isolated to that call: the engine logs it and moves
/// on to sibling groups. Implementations must not panic on revoked or
/// deleted destinations.
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    /// Sends `content` to the destination group.
    async fn deliver(&self, group: &GroupId, content: &str) -> Result<(), OtomoError>;
}
