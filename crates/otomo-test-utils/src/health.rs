// SPDX-FileCopyrightText: 2026 Otomo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recording [`HealthSink`] mock.

use std::sync::Mutex;

use async_trait::async_trait;

use otomo_core::{HealthEvent, HealthSink};

/// Collects degraded-health reports for assertion.
#[derive(Default)]
pub struct RecordingHealthSink {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<HealthEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl HealthSink for RecordingHealthSink {
    async fn report_degraded(&self, event: HealthEvent) {
        self.events.lock().unwrap().push(event);
    }
}
