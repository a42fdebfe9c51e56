use axum::response::{IntoResponse, Response};
use gateway_errors::{Failure, FailureResponse};

use crate::request_id::XRequestId;

/// Render `failure` through the error mapper, tagged with the request id when known.
pub fn render_failure(failure: Failure, request_id: Option<&XRequestId>) -> Response {
    let response = FailureResponse::new(failure);
    match request_id {
        Some(XRequestId(id)) => response.with_request_id(id.clone()).into_response(),
        None => response.into_response(),
    }
}
