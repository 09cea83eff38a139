// SPDX-FileCopyrightText: 2026 Tallylink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for tallylink integration tests.
//!
//! Provides mock collaborators and a harness for fast, deterministic tests
//! without a running Tally or cloud.
//!
//! # Components
//!
//! - [`MockConnector`] - scripted Tally with switchable availability
//! - [`MockCloud`] - scripted poll replies and captured result reports
//! - [`StaticTestCredentials`] - fixed registered or unregistered identity
//! - [`RecordingObserver`] - captures log observer entries
//! - [`TestHarness`] - engine wired to the mocks over a temp SQLite queue

pub mod harness;
pub mod mock_cloud;
pub mod mock_connector;
pub mod observer;

pub use harness::TestHarness;
pub use mock_cloud::{CloudReply, MockCloud};
pub use mock_connector::MockConnector;
pub use observer::{RecordingObserver, StaticTestCredentials};

/// Import response for a created master with id `101`.
pub const CREATED_RESPONSE: &str = "<ENVELOPE><BODY><IMPORTRESULT>\
<CREATED>1</CREATED><ALTERED>0</ALTERED><ERRORS>0</ERRORS><LASTMID>101</LASTMID>\
</IMPORTRESULT></BODY></ENVELOPE>";
