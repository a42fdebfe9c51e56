use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{Failure, FailureKind};

/// Client-facing message for `Internal` failures; the real detail stays in the logs.
pub const INTERNAL_MESSAGE: &str = "internal error";

/// Wire shape of every failed response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl Failure {
    /// The error-mapper function: status plus body, never leaking internal detail.
    pub fn to_parts(&self) -> (StatusCode, ErrorBody) {
        let message = match self.kind {
            FailureKind::Internal => INTERNAL_MESSAGE.to_string(),
            _ => self.message.clone(),
        };
        (
            self.kind.status_code(),
            ErrorBody {
                kind: self.kind.as_str().to_string(),
                message,
                request_id: None,
            },
        )
    }
}

/// Axum response wrapper that renders a `Failure`, optionally tagged with the request id.
#[derive(Debug)]
pub struct FailureResponse {
    pub failure: Failure,
    pub request_id: Option<String>,
}

impl FailureResponse {
    pub fn new(failure: Failure) -> Self {
        Self {
            failure,
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }
}

impl From<Failure> for FailureResponse {
    fn from(failure: Failure) -> Self {
        Self::new(failure)
    }
}

impl IntoResponse for FailureResponse {
    fn into_response(self) -> Response {
        let (status, mut body) = self.failure.to_parts();
        let request_id = self.request_id.as_deref().unwrap_or("n/a");

        if status.is_server_error() {
            tracing::error!(
                request_id = %request_id,
                kind = %self.failure.kind,
                status = status.as_u16(),
                error = %self.failure.detailed(),
                "request failed"
            );
        } else if self.failure.kind.is_client_input() {
            tracing::debug!(
                request_id = %request_id,
                kind = %self.failure.kind,
                target = self.failure.target.as_deref().unwrap_or("-"),
                error = %self.failure.message,
                "request rejected"
            );
        } else {
            tracing::warn!(
                request_id = %request_id,
                kind = %self.failure.kind,
                status = status.as_u16(),
                error = %self.failure.message,
                "request failed"
            );
        }

        body.request_id = self.request_id;
        (status, Json(body)).into_response()
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        FailureResponse::new(self).into_response()
    }
}
