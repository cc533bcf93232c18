//! Lifecycle error types.
//!
//! This module defines the errors surfaced by the policy engine, the
//! template and stream managers and the ingestion engines.

use std::fmt;

use thiserror::Error;

use crate::errors::StoreError;

/// Kind of entity an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Policy,
    Template,
    Stream,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Policy => "policy",
            Self::Template => "index template",
            Self::Stream => "data stream",
        };
        f.write_str(name)
    }
}

/// A provisioning or teardown step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    RegisterPolicy,
    RegisterTemplate,
    CreateStream,
    VerifyStream,
    DeleteStream,
    DeleteTemplate,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RegisterPolicy => "register policy",
            Self::RegisterTemplate => "register template",
            Self::CreateStream => "create stream",
            Self::VerifyStream => "verify stream",
            Self::DeleteStream => "delete stream",
            Self::DeleteTemplate => "delete template",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while managing or writing into a data stream.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LifecycleError {
    /// The policy document is structurally invalid. Never sent to the store.
    #[error("Invalid policy '{id}': {reason}")]
    InvalidPolicy { id: String, reason: String },

    /// A template refers to a policy the store does not know.
    #[error("Policy not found: {0}")]
    PolicyNotFound(String),

    /// An entity with the same id but different content already exists.
    #[error("Conflict: {entity} '{name}' already exists with different content")]
    Conflict { entity: EntityKind, name: String },

    /// The addressed template or stream does not exist.
    #[error("{entity} not found: {name}")]
    NotFound { entity: EntityKind, name: String },

    /// A template cannot be removed while streams still use it.
    #[error("Index template '{template}' still backs streams: {}", .streams.join(", "))]
    HasDependentStream {
        template: String,
        streams: Vec<String>,
    },

    /// Transport failure, timeout or server-side outage.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// The store refused a request for a reason none of the other variants cover.
    #[error("Store rejected request with status {status}: {reason}")]
    StoreRejected { status: u16, reason: String },

    /// The store answered with a body this client cannot interpret.
    #[error("Unexpected store response: {0}")]
    UnexpectedResponse(String),

    /// A single record does not fit the stream.
    #[error("Record rejected: {0}")]
    RecordRejected(String),

    /// Batch size exceeds configured maximum.
    #[error("Batch size {provided} exceeds maximum {max}")]
    BatchSizeExceeded { provided: usize, max: usize },

    /// A provisioning or teardown step failed after earlier steps took effect.
    #[error("Step '{step}' failed for '{entity}': {source}")]
    StepFailed {
        step: Step,
        entity: String,
        #[source]
        source: Box<LifecycleError>,
    },
}

impl LifecycleError {
    /// Create an invalid policy error.
    pub fn invalid_policy(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPolicy {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Create a not found error.
    pub fn not_found(entity: EntityKind, name: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            name: name.into(),
        }
    }

    /// Create a conflict error.
    pub fn conflict(entity: EntityKind, name: impl Into<String>) -> Self {
        Self::Conflict {
            entity,
            name: name.into(),
        }
    }

    /// Create a record rejected error.
    pub fn record_rejected(reason: impl Into<String>) -> Self {
        Self::RecordRejected(reason.into())
    }

    /// Create a batch size exceeded error.
    pub fn batch_size_exceeded(provided: usize, max: usize) -> Self {
        Self::BatchSizeExceeded { provided, max }
    }

    /// Mark this error as the failure of a provisioning or teardown step.
    pub fn at_step(self, step: Step, entity: impl Into<String>) -> Self {
        Self::StepFailed {
            step,
            entity: entity.into(),
            source: Box::new(self),
        }
    }

    /// Map a store error that concerns a named entity onto the taxonomy.
    pub fn from_store(error: StoreError, entity: EntityKind, name: &str) -> Self {
        if error.is_unavailable() {
            return Self::StoreUnavailable(error.to_string());
        }
        match error {
            StoreError::NotFound(_) | StoreError::RequestFailed { status: 404, .. } => {
                Self::not_found(entity, name)
            }
            StoreError::AlreadyExists(_) | StoreError::RequestFailed { status: 409, .. } => {
                Self::conflict(entity, name)
            }
            StoreError::RequestFailed { status, body } => Self::StoreRejected {
                status,
                reason: body,
            },
            StoreError::ParseError(reason) => Self::UnexpectedResponse(reason),
            other => Self::StoreRejected {
                status: 400,
                reason: other.to_string(),
            },
        }
    }

    /// The step that failed, when this error carries a step marker.
    pub fn failed_step(&self) -> Option<Step> {
        match self {
            Self::StepFailed { step, .. } => Some(*step),
            _ => None,
        }
    }

    /// The underlying error with any step markers removed.
    pub fn root_cause(&self) -> &LifecycleError {
        match self {
            Self::StepFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Whether the error means the store could not be reached or did not answer.
    pub fn is_unavailable(&self) -> bool {
        matches!(self.root_cause(), Self::StoreUnavailable(_))
    }
}

impl From<StoreError> for LifecycleError {
    fn from(error: StoreError) -> Self {
        if error.is_unavailable() {
            return Self::StoreUnavailable(error.to_string());
        }
        match error {
            StoreError::RequestFailed { status, body } => Self::StoreRejected {
                status,
                reason: body,
            },
            StoreError::ParseError(reason) => Self::UnexpectedResponse(reason),
            other => Self::StoreRejected {
                status: 400,
                reason: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_store_maps_taxonomy() {
        let err = LifecycleError::from_store(
            StoreError::connection("refused"),
            EntityKind::Stream,
            "logs",
        );
        assert!(matches!(err, LifecycleError::StoreUnavailable(_)));

        let err = LifecycleError::from_store(
            StoreError::request_failed(404, "index_not_found_exception"),
            EntityKind::Template,
            "logs",
        );
        assert_eq!(err, LifecycleError::not_found(EntityKind::Template, "logs"));

        let err = LifecycleError::from_store(
            StoreError::already_exists("logs"),
            EntityKind::Policy,
            "logs",
        );
        assert_eq!(err, LifecycleError::conflict(EntityKind::Policy, "logs"));

        let err = LifecycleError::from_store(
            StoreError::request_failed(400, "mapper_parsing_exception"),
            EntityKind::Template,
            "logs",
        );
        assert!(matches!(err, LifecycleError::StoreRejected { status: 400, .. }));

        let err = LifecycleError::from_store(
            StoreError::parse("template response has no 'index_templates' array"),
            EntityKind::Template,
            "logs",
        );
        assert!(matches!(err, LifecycleError::UnexpectedResponse(_)));
        assert!(!err.is_unavailable());
    }

    #[test]
    fn test_step_marker_and_root_cause() {
        let err = LifecycleError::StoreUnavailable("timeout".to_string())
            .at_step(Step::CreateStream, "logs_hss");

        assert_eq!(err.failed_step(), Some(Step::CreateStream));
        assert!(err.is_unavailable());
        assert!(matches!(err.root_cause(), LifecycleError::StoreUnavailable(_)));
        assert!(err.to_string().contains("create stream"));
        assert!(err.to_string().contains("logs_hss"));
    }

    #[test]
    fn test_dependent_stream_message_lists_streams() {
        let err = LifecycleError::HasDependentStream {
            template: "logs".to_string(),
            streams: vec!["logs-a".to_string(), "logs-b".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Index template 'logs' still backs streams: logs-a, logs-b"
        );
    }
}
