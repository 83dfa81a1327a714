// SPDX-FileCopyrightText: 2026 Otomo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Holodex aggregation API client.
//!
//! Implements [`otomo_core::UpstreamClient`] over the Holodex REST API:
//! batched live-status polling, channel metadata lookup, and cursor-paginated
//! chat retrieval.

pub mod client;
pub mod types;

pub use client::HolodexClient;
