// SPDX-FileCopyrightText: 2026 Otomo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Log-and-count health sink.

use async_trait::async_trait;
use metrics::counter;
use tracing::warn;

use otomo_core::{HealthEvent, HealthScope, HealthSink};

/// Surfaces degraded-health reports as warnings and a counter.
pub struct LogHealthSink;

#[async_trait]
impl HealthSink for LogHealthSink {
    async fn report_degraded(&self, event: HealthEvent) {
        let scope = match &event.scope {
            HealthScope::Global => "global".to_string(),
            HealthScope::Channel(channel) => channel.to_string(),
        };
        counter!("otomo_health_degraded_total", "scope" => scope.clone()).increment(1);
        warn!(scope, reason = %event.reason, "degraded health reported");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use otomo_core::ChannelId;

    #[tokio::test]
    async fn reports_do_not_panic() {
        let sink = LogHealthSink;
        sink.report_degraded(HealthEvent {
            scope: HealthScope::Global,
            reason: "poll failures".into(),
        })
        .await;
        sink.report_degraded(HealthEvent {
            scope: HealthScope::Channel(ChannelId("UC1".into())),
            reason: "fetch failures".into(),
        })
        .await;
    }
}
