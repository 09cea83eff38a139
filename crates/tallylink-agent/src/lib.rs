// SPDX-FileCopyrightText: 2026 Tallylink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Job routing and the cloud poll loop for the tallylink agent.
//!
//! The [`SyncEngine`] polls the cloud and hands each job to the
//! [`JobRouter`], which guarantees a job id executes against Tally at most
//! once and that its outcome is stored before it is reported.

pub mod backoff;
pub mod engine;
pub mod log;
pub mod router;
pub mod shutdown;
pub mod stats;

pub use backoff::PollInterval;
pub use engine::{EngineParts, EngineStatus, SyncEngine};
pub use log::AgentLog;
pub use router::{Execution, JobRouter};
pub use stats::{EngineSnapshot, PollStats};
