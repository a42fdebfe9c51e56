use gateway_errors::Failure;

use crate::contract::BackendError;

/// Map backend errors to the failure taxonomy. Nothing above the handlers sees
/// a `BackendError`.
pub fn map_backend_error(err: BackendError) -> Failure {
    match err {
        BackendError::NotFound { .. } => Failure::not_found(err.to_string()),
        BackendError::AlreadyExists { .. } => Failure::conflict(err.to_string()),
        BackendError::NotAvailable(_) | BackendError::Timeout(_) => {
            Failure::backend_unavailable(err.to_string())
        }
        BackendError::PermissionDenied(_) => Failure::unauthorized(err.to_string()),
        BackendError::InvalidRequest(ref reason) => {
            Failure::invalid_parameter("body", reason.clone())
        }
        BackendError::Protocol(_) | BackendError::Internal(_) => {
            Failure::internal("orchestration backend call failed").with_cause(err)
        }
    }
}

impl From<BackendError> for Failure {
    fn from(err: BackendError) -> Self {
        map_backend_error(err)
    }
}
