use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::errors::HookscanError;

impl IntoResponse for HookscanError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            HookscanError::SignatureRejected(_) => StatusCode::UNAUTHORIZED,
            HookscanError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            HookscanError::RepositoryNotFound(_) => StatusCode::NOT_FOUND,
            HookscanError::RemoteAuth(_)
            | HookscanError::FetchTooLarge(_)
            | HookscanError::UnsafeArchiveEntry(_)
            | HookscanError::Fetch(_) => StatusCode::BAD_GATEWAY,
            HookscanError::ScanTimeout(_) | HookscanError::DeadlineExceeded(_) => {
                StatusCode::GATEWAY_TIMEOUT
            }
            HookscanError::QueueTimeout(_) | HookscanError::ResourceExhausted(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = json!({
            "error": self.to_string(),
            "error_kind": self.kind(),
        });
        (status, Json(body)).into_response()
    }
}
