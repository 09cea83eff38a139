// SPDX-FileCopyrightText: 2026 Tallylink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credentials read from the `[cloud]` config section.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use tallylink_config::model::CloudConfig;
use tallylink_core::CredentialsProvider;

/// Fixed credentials loaded once at startup.
///
/// The API key is held as a [`SecretString`] and never appears in `Debug`
/// output.
#[derive(Clone)]
pub struct StaticCredentials {
    agent_id: Option<String>,
    shop_id: Option<String>,
    cloud_url: Option<String>,
    api_key: Option<SecretString>,
}

impl StaticCredentials {
    pub fn new(
        agent_id: Option<String>,
        shop_id: Option<String>,
        cloud_url: Option<String>,
        api_key: Option<SecretString>,
    ) -> Self {
        Self {
            agent_id: agent_id.filter(|s| !s.trim().is_empty()),
            shop_id: shop_id.filter(|s| !s.trim().is_empty()),
            cloud_url: cloud_url.filter(|s| !s.trim().is_empty()),
            api_key: api_key.filter(|k| !k.expose_secret().trim().is_empty()),
        }
    }

    pub fn from_config(config: &CloudConfig) -> Self {
        Self::new(
            config.agent_id.clone(),
            config.shop_id.clone(),
            Some(config.url.clone()),
            config.api_key.clone().map(SecretString::from),
        )
    }
}

impl fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("agent_id", &self.agent_id)
            .field("shop_id", &self.shop_id)
            .field("cloud_url", &self.cloud_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl CredentialsProvider for StaticCredentials {
    fn agent_id(&self) -> Option<String> {
        self.agent_id.clone()
    }

    fn shop_id(&self) -> Option<String> {
        self.shop_id.clone()
    }

    fn cloud_url(&self) -> Option<String> {
        self.cloud_url.clone()
    }

    fn auth_header(&self) -> Option<String> {
        self.api_key
            .as_ref()
            .map(|key| format!("Bearer {}", key.expose_secret()))
    }
}
