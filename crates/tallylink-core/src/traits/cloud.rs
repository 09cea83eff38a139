// SPDX-FileCopyrightText: 2026 Tallylink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cloud-facing collaborator traits: the HTTP client and the credential source.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::AgentError;

/// Supplies the agent's identity and bearer token.
///
/// Storage and retrieval of these values is owned by the host environment.
pub trait CredentialsProvider: Send + Sync {
    fn agent_id(&self) -> Option<String>;

    fn shop_id(&self) -> Option<String>;

    fn cloud_url(&self) -> Option<String>;

    /// Full `Authorization` header value, e.g. `Bearer <key>`.
    fn auth_header(&self) -> Option<String>;

    fn is_registered(&self) -> bool {
        self.auth_header().is_some() && self.agent_id().is_some()
    }
}

/// Authenticated JSON request primitive against the cloud API.
///
/// Implementations classify failures: an unauthorized status becomes
/// [`AgentError::Authentication`], throttling becomes [`AgentError::RateLimited`],
/// everything else is [`AgentError::Transport`].
#[async_trait]
pub trait CloudClient: Send + Sync {
    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, AgentError>;
}
