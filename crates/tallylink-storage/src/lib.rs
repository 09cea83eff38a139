// SPDX-FileCopyrightText: 2026 Tallylink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite offline queue for the tallylink agent.
//!
//! WAL-mode SQLite with embedded migrations and `synchronous = FULL`, so a
//! job outcome is on disk before anyone tries to report it. All access goes
//! through one `tokio-rusqlite` connection, which makes it the single writer.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteQueue;
pub use database::Database;
