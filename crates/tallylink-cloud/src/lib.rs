// SPDX-FileCopyrightText: 2026 Tallylink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cloud side of the tallylink agent: the authenticated JSON client, the
//! poll and report wire types, and a config-backed credentials provider.

pub mod client;
pub mod credentials;
pub mod wire;

pub use client::HttpCloudClient;
pub use credentials::StaticCredentials;
pub use wire::{AgentStatus, PollRequest, PollResponse, ReportStatus, ResultReport};

/// Agent software version sent in poll requests and the `User-Agent` header.
pub const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Path of the poll endpoint, relative to the cloud base URL.
pub const POLL_PATH: &str = "/api/agent/poll";

/// Path of the result report endpoint.
pub const RESULT_PATH: &str = "/api/agent/result";
