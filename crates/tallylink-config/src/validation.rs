// SPDX-FileCopyrightText: 2026 Tallylink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic checks that serde attributes cannot express.
//!
//! Every rule runs; the caller gets the full list of problems at once.

use crate::diagnostic::ConfigError;
use crate::model::TallylinkConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration.
pub fn validate_config(config: &TallylinkConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.agent.log_level.as_str()) {
        errors.push(ConfigError::validation(
            "agent.log_level",
            format!(
                "`{}` is not one of {}",
                config.agent.log_level,
                LOG_LEVELS.join(", ")
            ),
        ));
    }

    let url = config.cloud.url.trim();
    if url.is_empty() {
        errors.push(ConfigError::validation("cloud.url", "must not be empty"));
    } else if !(url.starts_with("http://") || url.starts_with("https://")) {
        errors.push(ConfigError::validation(
            "cloud.url",
            format!("`{url}` must start with http:// or https://"),
        ));
    }

    for (field, value) in [
        ("cloud.api_key", &config.cloud.api_key),
        ("cloud.agent_id", &config.cloud.agent_id),
        ("cloud.shop_id", &config.cloud.shop_id),
    ] {
        if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
            errors.push(ConfigError::validation(
                field,
                "must not be empty when set; remove the key instead",
            ));
        }
    }

    if config.tally.host.trim().is_empty() {
        errors.push(ConfigError::validation("tally.host", "must not be empty"));
    }
    if config.tally.port == 0 {
        errors.push(ConfigError::validation("tally.port", "must not be 0"));
    }

    for (field, value) in [
        ("cloud.request_timeout_secs", config.cloud.request_timeout_secs),
        ("tally.liveness_timeout_ms", config.tally.liveness_timeout_ms),
        ("tally.request_timeout_secs", config.tally.request_timeout_secs),
        ("polling.min_interval_secs", config.polling.min_interval_secs),
        ("queue.cleanup_interval_secs", config.queue.cleanup_interval_secs),
    ] {
        if value == 0 {
            errors.push(ConfigError::validation(field, "must be greater than 0"));
        }
    }

    let polling = &config.polling;
    if polling.min_interval_secs > polling.max_interval_secs {
        errors.push(ConfigError::validation(
            "polling.min_interval_secs",
            format!(
                "{} exceeds polling.max_interval_secs ({})",
                polling.min_interval_secs, polling.max_interval_secs
            ),
        ));
    } else if polling.interval_secs < polling.min_interval_secs
        || polling.interval_secs > polling.max_interval_secs
    {
        errors.push(ConfigError::validation(
            "polling.interval_secs",
            format!(
                "{} is outside [{}, {}]",
                polling.interval_secs, polling.min_interval_secs, polling.max_interval_secs
            ),
        ));
    }

    if !(polling.backoff_multiplier.is_finite() && polling.backoff_multiplier >= 1.0) {
        errors.push(ConfigError::validation(
            "polling.backoff_multiplier",
            format!("must be at least 1.0, got {}", polling.backoff_multiplier),
        ));
    }
    if polling.failure_threshold < 1 {
        errors.push(ConfigError::validation(
            "polling.failure_threshold",
            "must be at least 1",
        ));
    }
    if polling.unreported_batch_size < 1 {
        errors.push(ConfigError::validation(
            "polling.unreported_batch_size",
            "must be at least 1",
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::validation(
            "storage.database_path",
            "must not be empty",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(errors: &[ConfigError]) -> Vec<&str> {
        errors
            .iter()
            .filter_map(|e| match e {
                ConfigError::Validation { field, .. } => Some(field.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&TallylinkConfig::default()).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = TallylinkConfig::default();
        config.storage.database_path = "  ".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(fields(&errors), vec!["storage.database_path"]);
    }

    #[test]
    fn interval_must_sit_between_bounds() {
        let mut config = TallylinkConfig::default();
        config.polling.interval_secs = 5;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(fields(&errors), vec!["polling.interval_secs"]);
    }

    #[test]
    fn inverted_bounds_reported_once() {
        let mut config = TallylinkConfig::default();
        config.polling.min_interval_secs = 600;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(fields(&errors), vec!["polling.min_interval_secs"]);
    }

    #[test]
    fn shrinking_multiplier_rejected() {
        let mut config = TallylinkConfig::default();
        config.polling.backoff_multiplier = 0.5;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(fields(&errors), vec!["polling.backoff_multiplier"]);
    }

    #[test]
    fn all_problems_collected() {
        let mut config = TallylinkConfig::default();
        config.cloud.url = "ftp://example.com".to_string();
        config.tally.port = 0;
        config.polling.failure_threshold = 0;
        config.agent.log_level = "loud".to_string();
        let errors = validate_config(&config).unwrap_err();
        let fields = fields(&errors);
        assert_eq!(fields.len(), 4);
        assert!(fields.contains(&"cloud.url"));
        assert!(fields.contains(&"tally.port"));
        assert!(fields.contains(&"polling.failure_threshold"));
        assert!(fields.contains(&"agent.log_level"));
    }

    #[test]
    fn parsed_polling_section_checked_against_bounds() {
        let config: TallylinkConfig = toml::from_str(
            r#"
            [polling]
            interval_secs = 20
            min_interval_secs = 30
            max_interval_secs = 60
            "#,
        )
        .unwrap();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(fields(&errors), vec!["polling.interval_secs"]);
    }

    #[test]
    fn blank_credentials_rejected() {
        let mut config = TallylinkConfig::default();
        config.cloud.api_key = Some(String::new());
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(fields(&errors), vec!["cloud.api_key"]);
    }
}
