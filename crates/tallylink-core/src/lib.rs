// SPDX-FileCopyrightText: 2026 Tallylink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the tallylink agent.
//!
//! This crate provides the error taxonomy, the job and queue types, and the
//! adapter traits that the storage, target, cloud, and agent crates meet at.

pub mod error;
pub mod time;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::AgentError;
pub use types::{
    AdapterType, CompletedJob, ErrorKind, HealthStatus, Job, JobOutcome, JobType, LogLevel,
    QueueEntry, QueueStats, QueueStatus,
};

// Re-export all adapter traits at crate root.
pub use traits::{
    CloudClient, CredentialsProvider, LogObserver, NoopObserver, OfflineQueue, PluginAdapter,
    TargetConnector,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_error_has_all_variants() {
        let _config = AgentError::Config("test".into());
        let _transport = AgentError::transport("test");
        let _target = AgentError::TargetUnavailable("test".into());
        let _auth = AgentError::Authentication("test".into());
        let _rate = AgentError::RateLimited("test".into());
        let _protocol = AgentError::protocol("test");
        let _unknown = AgentError::UnknownJobType("test".into());
        let _payload = AgentError::InvalidPayload("test".into());
        let _persistence = AgentError::Persistence {
            source: Box::new(std::io::Error::other("test")),
        };
        let _timeout = AgentError::Timeout {
            duration: std::time::Duration::from_secs(10),
        };
        let _internal = AgentError::Internal("test".into());
    }

    #[test]
    fn adapter_type_round_trips_through_strings() {
        use std::str::FromStr;

        for variant in [AdapterType::Queue, AdapterType::Target, AdapterType::Cloud] {
            let parsed = AdapterType::from_str(&variant.to_string()).expect("should parse back");
            assert_eq!(variant, parsed);
        }
    }

    #[test]
    fn credentials_registration_requires_key_and_agent() {
        struct Partial;
        impl CredentialsProvider for Partial {
            fn agent_id(&self) -> Option<String> {
                Some("agent-1".into())
            }
            fn shop_id(&self) -> Option<String> {
                None
            }
            fn cloud_url(&self) -> Option<String> {
                None
            }
            fn auth_header(&self) -> Option<String> {
                None
            }
        }
        assert!(!Partial.is_registered());
    }

    #[test]
    fn all_trait_modules_are_exported() {
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_offline_queue<T: OfflineQueue>() {}
        fn _assert_target_connector<T: TargetConnector>() {}
        fn _assert_cloud_client<T: CloudClient>() {}
        fn _assert_credentials<T: CredentialsProvider>() {}
        fn _assert_observer<T: LogObserver>() {}
        _assert_observer::<NoopObserver>();
    }
}
