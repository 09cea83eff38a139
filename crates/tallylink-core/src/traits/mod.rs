// SPDX-FileCopyrightText: 2026 Tallylink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! Adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod cloud;
pub mod connector;
pub mod observer;
pub mod queue;

pub use adapter::PluginAdapter;
pub use cloud::{CloudClient, CredentialsProvider};
pub use connector::TargetConnector;
pub use observer::{LogObserver, NoopObserver};
pub use queue::OfflineQueue;
