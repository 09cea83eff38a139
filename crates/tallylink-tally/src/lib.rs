// SPDX-FileCopyrightText: 2026 Tallylink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tally connector for the tallylink agent.
//!
//! [`builder`] renders request documents, [`parser`] decodes responses,
//! [`operation`] ties both to job types, and [`TallyConnector`] carries
//! documents to the local Tally over HTTP.

pub mod builder;
pub mod client;
pub mod operation;
pub mod parser;
pub mod types;

use async_trait::async_trait;
use tallylink_config::model::TallyConfig;
use tallylink_core::{AdapterType, AgentError, HealthStatus, PluginAdapter, TargetConnector};
use tokio::sync::OnceCell;
use tracing::{debug, info};

pub use client::TallyClient;
pub use operation::TallyOperation;
pub use types::Edition;

/// [`TargetConnector`] for a Tally instance.
///
/// The edition and company name are looked up on first use and cached for
/// the connector's lifetime. A failed lookup is not cached.
pub struct TallyConnector {
    client: TallyClient,
    edition: OnceCell<Edition>,
    company: OnceCell<String>,
}

impl TallyConnector {
    pub fn new(config: &TallyConfig) -> Result<Self, AgentError> {
        Ok(Self::with_client(TallyClient::new(config)?))
    }

    pub fn with_client(client: TallyClient) -> Self {
        Self {
            client,
            edition: OnceCell::new(),
            company: OnceCell::new(),
        }
    }

    pub fn client(&self) -> &TallyClient {
        &self.client
    }

    /// Typed edition lookup behind [`TargetConnector::edition`].
    pub async fn detect_edition(&self) -> Result<Edition, AgentError> {
        self.edition
            .get_or_try_init(|| async {
                let response = self.client.post(&builder::system_info()?).await?;
                let edition = Edition::classify(&response);
                info!(%edition, "detected Tally edition");
                Ok(edition)
            })
            .await
            .copied()
    }

    /// Typed company lookup behind [`TargetConnector::company_name`].
    pub async fn detect_company(&self) -> Result<String, AgentError> {
        self.company
            .get_or_try_init(|| async {
                let response = self.client.post(&builder::company_info()?).await?;
                let name = parser::company_name(&response)?
                    .ok_or_else(|| AgentError::protocol("company info names no company"))?;
                info!(company = %name, "detected Tally company");
                Ok(name)
            })
            .await
            .cloned()
    }
}

#[async_trait]
impl PluginAdapter for TallyConnector {
    fn name(&self) -> &str {
        "tally"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Target
    }

    async fn health_check(&self) -> Result<HealthStatus, AgentError> {
        if self.client.ping().await {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Unhealthy(format!(
                "no response from {}",
                self.client.base_url()
            )))
        }
    }

    async fn shutdown(&self) -> Result<(), AgentError> {
        Ok(())
    }
}

#[async_trait]
impl TargetConnector for TallyConnector {
    async fn is_available(&self) -> bool {
        self.client.ping().await
    }

    async fn send(&self, document: &str) -> Result<String, AgentError> {
        self.client.post(document).await
    }

    async fn edition(&self) -> Option<String> {
        match self.detect_edition().await {
            Ok(edition) => Some(edition.to_string()),
            Err(e) => {
                debug!(error = %e, "edition detection failed");
                None
            }
        }
    }

    async fn company_name(&self) -> Option<String> {
        match self.detect_company().await {
            Ok(name) => Some(name),
            Err(e) => {
                debug!(error = %e, "company detection failed");
                None
            }
        }
    }
}
