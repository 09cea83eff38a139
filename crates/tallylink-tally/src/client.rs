// SPDX-FileCopyrightText: 2026 Tallylink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP transport to the local Tally instance.
//!
//! [`TallyClient`] posts XML documents and classifies transport failures:
//! a refused connection means Tally is not running, a timeout is
//! [`AgentError::Timeout`], and everything else is a transport error.

use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use tallylink_config::model::TallyConfig;
use tallylink_core::AgentError;
use tracing::debug;

use crate::builder::PING_DOCUMENT;

#[derive(Debug, Clone)]
pub struct TallyClient {
    client: reqwest::Client,
    base_url: String,
    liveness_timeout: Duration,
    request_timeout: Duration,
}

impl TallyClient {
    pub fn new(config: &TallyConfig) -> Result<Self, AgentError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/xml; charset=utf-8"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| AgentError::Transport {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url(),
            liveness_timeout: config.liveness_timeout(),
            request_timeout: config.request_timeout(),
        })
    }

    /// Point the client at another endpoint (used by tests against wiremock).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Post an empty envelope with the short liveness timeout. Any HTTP
    /// response at all counts as alive.
    pub async fn ping(&self) -> bool {
        match self
            .client
            .post(&self.base_url)
            .timeout(self.liveness_timeout)
            .body(PING_DOCUMENT)
            .send()
            .await
        {
            Ok(response) => {
                debug!(status = %response.status(), "tally liveness probe answered");
                true
            }
            Err(e) => {
                debug!(error = %e, "tally liveness probe failed");
                false
            }
        }
    }

    /// Post a document and return the response body.
    pub async fn post(&self, document: &str) -> Result<String, AgentError> {
        let response = self
            .client
            .post(&self.base_url)
            .timeout(self.request_timeout)
            .body(document.to_string())
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        debug!(status = %status, bytes = document.len(), "tally response received");
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::transport(format!(
                "Tally returned {status}: {}",
                body.trim()
            )));
        }

        response.text().await.map_err(|e| AgentError::Transport {
            message: format!("failed to read Tally response: {e}"),
            source: Some(Box::new(e)),
        })
    }

    fn classify(&self, e: reqwest::Error) -> AgentError {
        if is_connection_refused(&e) {
            return AgentError::TargetUnavailable(format!(
                "Tally is not running at {}. Please start Tally and try again.",
                self.base_url
            ));
        }
        if e.is_timeout() {
            return AgentError::Timeout {
                duration: self.request_timeout,
            };
        }
        AgentError::Transport {
            message: format!("request to Tally failed: {e}"),
            source: Some(Box::new(e)),
        }
    }
}

/// Walk the error chain looking for an OS-level connection refusal.
fn is_connection_refused(e: &reqwest::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> =
        Some(e as &(dyn std::error::Error + 'static));
    while let Some(err) = source {
        if let Some(io) = err.downcast_ref::<std::io::Error>()
            && io.kind() == std::io::ErrorKind::ConnectionRefused
        {
            return true;
        }
        source = err.source();
    }
    false
}
