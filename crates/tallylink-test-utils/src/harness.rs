// SPDX-FileCopyrightText: 2026 Tallylink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end engine tests.
//!
//! `TestHarness` wires a [`SyncEngine`] to a [`MockConnector`], a
//! [`MockCloud`], and a real [`SqliteQueue`] in a temp directory.

use std::sync::Arc;

use tallylink_agent::{AgentLog, EngineParts, SyncEngine};
use tallylink_config::model::PollingConfig;
use tallylink_core::{AgentError, CredentialsProvider, OfflineQueue};
use tallylink_storage::SqliteQueue;

use crate::mock_cloud::MockCloud;
use crate::mock_connector::MockConnector;
use crate::observer::{RecordingObserver, StaticTestCredentials};

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    polling: PollingConfig,
    connector: MockConnector,
    credentials: StaticTestCredentials,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            polling: PollingConfig::default(),
            connector: MockConnector::new(),
            credentials: StaticTestCredentials::registered(),
        }
    }

    pub fn with_polling(mut self, polling: PollingConfig) -> Self {
        self.polling = polling;
        self
    }

    /// Start with Tally offline.
    pub fn tally_offline(mut self) -> Self {
        self.connector = MockConnector::unavailable();
        self
    }

    pub fn unregistered(mut self) -> Self {
        self.credentials = StaticTestCredentials::unregistered();
        self
    }

    pub async fn build(self) -> Result<TestHarness, AgentError> {
        let temp_dir = tempfile::TempDir::new().map_err(|e| AgentError::Persistence {
            source: Box::new(e),
        })?;
        let db_path = temp_dir
            .path()
            .join("queue.db")
            .to_string_lossy()
            .to_string();

        let queue = Arc::new(SqliteQueue::at_path(db_path.clone()));
        queue.initialize().await?;

        let connector = Arc::new(self.connector);
        let cloud = Arc::new(MockCloud::new());
        let credentials = Arc::new(self.credentials);
        let observer = Arc::new(RecordingObserver::new());
        let engine = new_engine(
            &self.polling,
            &connector,
            &queue,
            &cloud,
            &credentials,
            &observer,
        );
        Ok(TestHarness {
            connector,
            cloud,
            credentials,
            observer,
            polling: self.polling,
            queue,
            db_path,
            engine,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete engine environment with mock collaborators and temp storage.
pub struct TestHarness {
    pub connector: Arc<MockConnector>,
    pub cloud: Arc<MockCloud>,
    pub credentials: Arc<StaticTestCredentials>,
    pub observer: Arc<RecordingObserver>,
    pub polling: PollingConfig,
    pub queue: Arc<SqliteQueue>,
    db_path: String,
    engine: SyncEngine,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    /// Simulate a process restart: close the queue, reopen the same file,
    /// and build a fresh engine over it with zeroed stats.
    pub async fn restart(&mut self) -> Result<(), AgentError> {
        self.engine.stop().await;
        self.queue.close().await?;
        self.queue = Arc::new(SqliteQueue::at_path(self.db_path.clone()));
        self.queue.initialize().await?;
        self.engine = new_engine(
            &self.polling,
            &self.connector,
            &self.queue,
            &self.cloud,
            &self.credentials,
            &self.observer,
        );
        Ok(())
    }
}

fn new_engine(
    polling: &PollingConfig,
    connector: &Arc<MockConnector>,
    queue: &Arc<SqliteQueue>,
    cloud: &Arc<MockCloud>,
    credentials: &Arc<StaticTestCredentials>,
    observer: &Arc<RecordingObserver>,
) -> SyncEngine {
    let credentials: Arc<dyn CredentialsProvider> = credentials.clone();
    SyncEngine::new(
        polling,
        EngineParts {
            connector: connector.clone(),
            queue: queue.clone(),
            cloud: cloud.clone(),
            credentials,
            log: AgentLog::new(observer.clone()),
        },
    )
}
