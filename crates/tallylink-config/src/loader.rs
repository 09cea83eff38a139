// SPDX-FileCopyrightText: 2026 Tallylink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading with Figment.
//!
//! Files are looked up in `/etc/tallylink/tallylink.toml`,
//! `~/.config/tallylink/tallylink.toml` and `./tallylink.toml`, later files
//! overriding earlier ones, with `TALLYLINK_*` environment variables applied last.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use tracing::debug;

use crate::model::TallylinkConfig;

/// Config file name used at every level of the hierarchy.
pub const CONFIG_FILE_NAME: &str = "tallylink.toml";

/// Top-level sections addressable from environment variables.
const ENV_SECTIONS: &[&str] = &["agent", "cloud", "tally", "polling", "storage", "queue"];

/// Candidate config files in merge order (lowest precedence first).
pub fn config_file_candidates() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/tallylink").join(CONFIG_FILE_NAME)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("tallylink").join(CONFIG_FILE_NAME));
    }
    paths.push(PathBuf::from(CONFIG_FILE_NAME));
    paths
}

/// Load configuration from the standard hierarchy with env var overrides.
pub fn load_config() -> Result<TallylinkConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from an inline TOML string, without env overrides.
pub fn load_config_from_str(toml_content: &str) -> Result<TallylinkConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TallylinkConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from one explicit file, with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<TallylinkConfig, figment::Error> {
    debug!(path = %path.display(), "loading config file");
    Figment::new()
        .merge(Serialized::defaults(TallylinkConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The Figment behind [`load_config`], before extraction.
pub fn build_figment() -> Figment {
    let mut figment = Figment::new().merge(Serialized::defaults(TallylinkConfig::default()));
    for path in config_file_candidates() {
        if path.exists() {
            debug!(path = %path.display(), "merging config file");
        }
        figment = figment.merge(Toml::file(path));
    }
    figment.merge(env_provider())
}

/// Map an env key (prefix stripped, lowercased) to a dotted config path.
///
/// Only the leading section name is split off, so `cloud_agent_id` becomes
/// `cloud.agent_id` rather than being split at every underscore.
pub fn map_env_key(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
            && !rest.is_empty()
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

fn env_provider() -> Env {
    Env::prefixed("TALLYLINK_").map(|key| map_env_key(key.as_str()).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_split_on_section_only() {
        assert_eq!(map_env_key("cloud_agent_id"), "cloud.agent_id");
        assert_eq!(map_env_key("polling_interval_secs"), "polling.interval_secs");
        assert_eq!(map_env_key("tally_port"), "tally.port");
        assert_eq!(map_env_key("agent_log_level"), "agent.log_level");
    }

    #[test]
    fn unmapped_keys_pass_through() {
        assert_eq!(map_env_key("verbose"), "verbose");
        assert_eq!(map_env_key("cloud_"), "cloud_");
    }

    #[test]
    fn local_file_has_highest_file_precedence() {
        let candidates = config_file_candidates();
        assert_eq!(candidates.first().unwrap(), &PathBuf::from("/etc/tallylink/tallylink.toml"));
        assert_eq!(candidates.last().unwrap(), &PathBuf::from("tallylink.toml"));
    }
}
