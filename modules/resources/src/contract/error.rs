use thiserror::Error;

use crate::contract::model::ResourceKind;

/// Errors the orchestration engine reports back to the gateway.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("{kind} '{id}' not found")]
    NotFound { kind: ResourceKind, id: String },

    #[error("{kind} '{name}' already exists")]
    AlreadyExists { kind: ResourceKind, name: String },

    #[error("orchestration backend not available: {0}")]
    NotAvailable(String),

    #[error("orchestration backend timed out: {0}")]
    Timeout(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("request rejected by the backend: {0}")]
    InvalidRequest(String),

    #[error("unexpected backend response: {0}")]
    Protocol(String),

    #[error("backend error: {0}")]
    Internal(String),
}

impl BackendError {
    pub fn not_found(kind: ResourceKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn already_exists(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self::AlreadyExists {
            kind,
            name: name.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

pub type BackendResult<T> = Result<T, BackendError>;
