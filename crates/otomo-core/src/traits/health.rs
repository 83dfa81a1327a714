// SPDX-FileCopyrightText: 2026 Otomo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operator-facing degraded-health signal.

use async_trait::async_trait;

use crate::types::HealthEvent;

/// Receives degraded-health reports when poll or fetch failures exceed the
/// configured threshold. Reporting is fire-and-forget; the engine keeps
/// running regardless of what the sink does with the event.
#[async_trait]
pub trait HealthSink: Send + Sync + 'static {
    /// Reports a degraded condition for one channel or the whole poller.
    async fn report_degraded(&self, event: HealthEvent);
}
