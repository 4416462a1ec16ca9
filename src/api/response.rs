use serde::Serialize;
use axum::Json;
use axum::http::StatusCode;

/// Body shape shared by every failed request: `{"status": "error", "message": ...}`.
#[derive(Serialize)]
pub struct ErrorBody {
    pub status: &'static str,
    pub message: String,
}

pub fn success<T: Serialize>(data: T) -> (StatusCode, Json<T>) {
    (StatusCode::OK, Json(data))
}

pub fn error(status: StatusCode, message: String) -> (StatusCode, Json<ErrorBody>) {
    (
        status,
        Json(ErrorBody {
            status: "error",
            message,
        }),
    )
}
