use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use treegrant_core::{ErrorEnvelope, ErrorKind, TreeGrantError, LIST_FILES_CODE};

pub struct AppError {
    pub status: StatusCode,
    pub body: ErrorEnvelope,
}

impl AppError {
    /// Request body that never reached the listing call (not JSON, no `uri`)
    pub fn bad_request_body(rejection: JsonRejection) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorEnvelope::new(
                LIST_FILES_CODE,
                ErrorKind::MalformedHandle,
                rejection.body_text(),
                "Send a JSON body of the form {\"uri\": \"tree://<authority>/<tree-id>\"}",
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, axum::Json(self.body)).into_response()
    }
}

impl From<TreeGrantError> for AppError {
    fn from(err: TreeGrantError) -> Self {
        let status = match err.kind() {
            ErrorKind::MalformedHandle => StatusCode::BAD_REQUEST,
            ErrorKind::GrantDenied => StatusCode::FORBIDDEN,
            ErrorKind::QueryUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::MalformedRow => StatusCode::BAD_GATEWAY,
            ErrorKind::Config | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            body: err.envelope(),
        }
    }
}
