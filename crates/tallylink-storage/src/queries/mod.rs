// SPDX-FileCopyrightText: 2026 Tallylink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed queries over the offline queue tables.

pub mod completed;
pub mod queue;
