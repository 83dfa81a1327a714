// SPDX-FileCopyrightText: 2026 Otomo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Discord delivery adapter.
//!
//! Implements [`otomo_core::Notifier`] over Discord webhooks: one webhook
//! URL per destination group, posted to with plain markdown content.

pub mod webhook;

pub use webhook::DiscordNotifier;
