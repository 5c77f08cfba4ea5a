use attrsql::{GenerationError, TableError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Error body returned by the JSON API: `{"error": ...}` or, for conditions the
/// page shows as a warning, `{"warning": ...}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            kind: "error",
            message: message.into(),
        }
    }

    pub fn warning(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            kind: "warning",
            message: message.into(),
        }
    }

    pub fn session_not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Session not found")
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ self.kind: self.message }))).into_response()
    }
}

impl From<TableError> for ApiError {
    fn from(err: TableError) -> Self {
        let status = match err {
            TableError::RowOutOfRange { .. } => StatusCode::NOT_FOUND,
            TableError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        };
        tracing::debug!("Table operation rejected: {}", err);
        ApiError::new(status, err.to_string())
    }
}

impl From<GenerationError> for ApiError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::EmptyTable => {
                ApiError::warning(StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
            }
        }
    }
}
