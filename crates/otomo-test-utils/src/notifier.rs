// SPDX-FileCopyrightText: 2026 Otomo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recording [`Notifier`] mock.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use otomo_core::{GroupId, Notifier, OtomoError};

/// Records every delivery; groups can be marked as failing to exercise
/// per-group error isolation.
#[derive(Default)]
pub struct MockNotifier {
    deliveries: Mutex<Vec<(GroupId, String)>>,
    failing: Mutex<HashSet<GroupId>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded deliveries in order.
    pub fn deliveries(&self) -> Vec<(GroupId, String)> {
        self.deliveries.lock().unwrap().clone()
    }

    /// Contents delivered to one group, in order.
    pub fn deliveries_for(&self, group: &GroupId) -> Vec<String> {
        self.deliveries
            .lock()
            .unwrap()
            .iter()
            .filter(|(g, _)| g == group)
            .map(|(_, content)| content.clone())
            .collect()
    }

    /// Make deliveries to `group` fail until [`heal_group`](Self::heal_group).
    pub fn fail_group(&self, group: &GroupId) {
        self.failing.lock().unwrap().insert(group.clone());
    }

    pub fn heal_group(&self, group: &GroupId) {
        self.failing.lock().unwrap().remove(group);
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn deliver(&self, group: &GroupId, content: &str) -> Result<(), OtomoError> {
        if self.failing.lock().unwrap().contains(group) {
            return Err(OtomoError::Delivery {
                group: group.clone(),
                message: "scripted delivery failure".into(),
                source: None,
            });
        }
        self.deliveries
            .lock()
            .unwrap()
            .push((group.clone(), content.to_string()));
        Ok(())
    }
}
