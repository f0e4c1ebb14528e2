use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use rag_types::ConsoleError;
use serde::Serialize;

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    details: Vec<String>,
}

/// Console error rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiFailure(pub ConsoleError);

impl ApiFailure {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ConsoleError::Authentication(_) => StatusCode::UNAUTHORIZED,
            ConsoleError::Authorization(_) => StatusCode::FORBIDDEN,
            ConsoleError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ConsoleError::Network(_) => StatusCode::BAD_GATEWAY,
            ConsoleError::Rejected { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
        }
    }
}

impl From<ConsoleError> for ApiFailure {
    fn from(err: ConsoleError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!("backend call failed: {}", self.0);
        }
        let body = ErrorResponse {
            error: self.0.to_string(),
            details: self.0.messages(),
        };
        (status, Json(body)).into_response()
    }
}
