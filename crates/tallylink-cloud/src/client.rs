// SPDX-FileCopyrightText: 2026 Tallylink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the cloud agent API.
//!
//! [`HttpCloudClient`] attaches the bearer token and agent `User-Agent` to
//! every request and maps HTTP failures onto the agent error taxonomy.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;
use tallylink_config::model::CloudConfig;
use tallylink_core::{AgentError, CloudClient, CredentialsProvider};
use tracing::debug;

use crate::AGENT_VERSION;

/// Reqwest-backed [`CloudClient`].
///
/// The base URL comes from the credentials provider when it supplies one,
/// falling back to the configured URL.
#[derive(Clone)]
pub struct HttpCloudClient {
    client: reqwest::Client,
    default_url: String,
    timeout: Duration,
    credentials: Arc<dyn CredentialsProvider>,
}

impl HttpCloudClient {
    pub fn new(
        config: &CloudConfig,
        credentials: Arc<dyn CredentialsProvider>,
    ) -> Result<Self, AgentError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let agent = format!("tallylink/{AGENT_VERSION}");
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&agent)
                .map_err(|e| AgentError::Config(format!("invalid user agent header: {e}")))?,
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
            default_url: config.url.clone(),
            timeout: config.request_timeout(),
            credentials,
        })
    }

    fn url_for(&self, path: &str) -> String {
        let base = self
            .credentials
            .cloud_url()
            .unwrap_or_else(|| self.default_url.clone());
        format!("{}{path}", base.trim_end_matches('/'))
    }

    fn classify(&self, e: reqwest::Error) -> AgentError {
        if e.is_timeout() {
            AgentError::Timeout {
                duration: self.timeout,
            }
        } else {
            AgentError::Transport {
                message: format!("cloud request failed: {e}"),
                source: Some(Box::new(e)),
            }
        }
    }
}

#[async_trait]
impl CloudClient for HttpCloudClient {
    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, AgentError> {
        let auth = self
            .credentials
            .auth_header()
            .ok_or_else(|| AgentError::Authentication("no API key configured".into()))?;
        let auth = HeaderValue::from_str(&auth)
            .map_err(|e| AgentError::Config(format!("invalid authorization header: {e}")))?;

        let url = self.url_for(path);
        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, auth)
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        debug!(%url, status = %status, "cloud response received");

        match status {
            StatusCode::UNAUTHORIZED => {
                return Err(AgentError::Authentication(format!(
                    "cloud rejected credentials ({status})"
                )));
            }
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(AgentError::RateLimited(format!("cloud returned {status}")));
            }
            s if !s.is_success() => {
                let body = response.text().await.unwrap_or_default();
                return Err(AgentError::transport(format!(
                    "cloud returned {status}: {}",
                    body.trim()
                )));
            }
            _ => {}
        }

        let text = response.text().await.map_err(|e| self.classify(e))?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| AgentError::Transport {
            message: format!("cloud returned invalid JSON: {e}"),
            source: Some(Box::new(e)),
        })
    }
}
