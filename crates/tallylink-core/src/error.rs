// SPDX-FileCopyrightText: 2026 Tallylink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the tallylink agent.

use thiserror::Error;

use crate::types::ErrorKind;

/// The primary error type used across all tallylink adapter traits and core operations.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Configuration errors (invalid TOML, missing credentials, bad header values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Network or HTTP failure talking to the cloud or the target application.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The target application refused the connection or failed its liveness probe.
    #[error("target application unavailable: {0}")]
    TargetUnavailable(String),

    /// The cloud rejected the agent's credentials.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The cloud asked the agent to slow down.
    #[error("rate limited by cloud: {0}")]
    RateLimited(String),

    /// Malformed XML, or a well-formed response carrying an error section.
    #[error("protocol error: {message}")]
    Protocol {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The router has no handler for the job's declared type.
    #[error("unknown job type: {0}")]
    UnknownJobType(String),

    /// The job payload does not match the shape its type requires.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// The durable store could not be read or written.
    #[error("persistence error: {source}")]
    Persistence {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AgentError {
    /// Shorthand for a protocol error without an underlying cause.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for a transport error without an underlying cause.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Wire classification reported to the cloud when this error ends a job.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TargetUnavailable(_) => ErrorKind::TallyUnavailable,
            Self::Protocol { .. } => ErrorKind::ProtocolError,
            Self::UnknownJobType(_) => ErrorKind::UnknownJobType,
            Self::InvalidPayload(_) => ErrorKind::InvalidPayload,
            Self::Transport { .. } | Self::Timeout { .. } => ErrorKind::TransportError,
            _ => ErrorKind::ExecutionError,
        }
    }

    /// Only a credential rejection stops the poll loop outright.
    pub fn is_fatal_to_engine(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }

    /// A broken durable store needs an operator, not a retry.
    pub fn is_local_fault(&self) -> bool {
        matches!(self, Self::Persistence { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_maps_job_level_failures() {
        assert_eq!(
            AgentError::TargetUnavailable("down".into()).kind(),
            ErrorKind::TallyUnavailable
        );
        assert_eq!(
            AgentError::protocol("bad xml").kind(),
            ErrorKind::ProtocolError
        );
        assert_eq!(
            AgentError::UnknownJobType("x.y".into()).kind(),
            ErrorKind::UnknownJobType
        );
        assert_eq!(
            AgentError::transport("reset").kind(),
            ErrorKind::TransportError
        );
        assert_eq!(
            AgentError::Internal("boom".into()).kind(),
            ErrorKind::ExecutionError
        );
    }

    #[test]
    fn only_authentication_is_fatal() {
        assert!(AgentError::Authentication("401".into()).is_fatal_to_engine());
        assert!(!AgentError::RateLimited("429".into()).is_fatal_to_engine());
        assert!(!AgentError::transport("timeout").is_fatal_to_engine());
    }

    #[test]
    fn persistence_is_local_fault() {
        let err = AgentError::Persistence {
            source: Box::new(std::io::Error::other("disk full")),
        };
        assert!(err.is_local_fault());
        assert!(err.to_string().contains("disk full"));
    }
}
