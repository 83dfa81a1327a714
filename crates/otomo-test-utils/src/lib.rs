// SPDX-FileCopyrightText: 2026 Otomo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scriptable mock collaborators for exercising the engine without a live
//! upstream or delivery platform.
//!
//! Each mock implements one of the `otomo-core` seams and records the calls
//! it receives, so tests can script upstream behavior and assert on what the
//! engine did with it.

pub mod health;
pub mod notifier;
pub mod resolver;
pub mod upstream;

pub use health::RecordingHealthSink;
pub use notifier::MockNotifier;
pub use resolver::StaticResolver;
pub use upstream::MockUpstream;
