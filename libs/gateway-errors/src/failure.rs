use std::fmt;

use crate::catalog::FailureKind;

/// A failed request, produced by the marshaller, the dispatcher or a handler and
/// consumed only by the error mapper.
#[derive(Debug)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
    /// Offending field path or parameter name, when there is one.
    pub target: Option<String>,
    cause: Option<anyhow::Error>,
}

pub type FailureResult<T> = Result<T, Failure>;

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            target: None,
            cause: None,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_cause(mut self, cause: impl Into<anyhow::Error>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn cause(&self) -> Option<&anyhow::Error> {
        self.cause.as_ref()
    }

    // Convenience constructors.

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(FailureKind::NotFound, message)
    }

    pub fn missing_field(path: impl Into<String>) -> Self {
        let path = path.into();
        Self::new(
            FailureKind::MissingField,
            format!("missing required field '{path}'"),
        )
        .with_target(path)
    }

    pub fn type_mismatch(path: impl Into<String>, expected: impl fmt::Display, actual: &str) -> Self {
        let path = path.into();
        Self::new(
            FailureKind::TypeMismatch,
            format!("field '{path}': expected {expected}, got {actual}"),
        )
        .with_target(path)
    }

    pub fn invalid_enum_value(path: impl Into<String>, value: &str, allowed: &[String]) -> Self {
        let path = path.into();
        Self::new(
            FailureKind::InvalidEnumValue,
            format!(
                "field '{path}': '{value}' is not one of [{}]",
                allowed.join(", ")
            ),
        )
        .with_target(path)
    }

    pub fn missing_parameter(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(
            FailureKind::MissingParameter,
            format!("missing required parameter '{name}'"),
        )
        .with_target(name)
    }

    pub fn invalid_parameter(name: impl Into<String>, reason: impl fmt::Display) -> Self {
        let name = name.into();
        Self::new(
            FailureKind::InvalidParameter,
            format!("parameter '{name}': {reason}"),
        )
        .with_target(name)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Unauthorized, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Conflict, message)
    }

    pub fn backend_unavailable(message: impl Into<String>) -> Self {
        Self::new(FailureKind::BackendUnavailable, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Internal, message)
    }

    /// Message followed by every cause in the chain, for server-side logs only.
    pub fn detailed(&self) -> String {
        let mut out = self.message.clone();
        if let Some(cause) = &self.cause {
            for err in cause.chain() {
                out.push_str(": ");
                out.push_str(&err.to_string());
            }
        }
        out
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for Failure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|e| &**e as &(dyn std::error::Error + 'static))
    }
}
