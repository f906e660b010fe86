use serde::Serialize;
use axum::Json;
use axum::http::StatusCode;

/// Error body understood by the mobile client: `{"detail": "..."}`.
#[derive(Serialize)]
pub struct ErrorDetail {
    pub detail: String,
}

pub fn error(status: StatusCode, message: String) -> (StatusCode, Json<ErrorDetail>) {
    (status, Json(ErrorDetail { detail: message }))
}
