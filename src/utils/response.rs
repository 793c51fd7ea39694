use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

/// Success envelope: `{ "success": true, "data": ..., "message": ... }`.
#[derive(Serialize)]
pub struct ApiResponse<T>
where
    T: Serialize,
{
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    pub message: String,
}

/// Error envelope: `{ "success": false, "error": { code, message, details } }`.
#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub success: bool,
    pub error: ApiErrorBody,
}

#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

pub fn success<T>(data: T, message: impl Into<String>) -> Response
where
    T: Serialize,
{
    let body = ApiResponse {
        success: true,
        data: Some(data),
        message: message.into(),
    };
    (StatusCode::OK, Json(body)).into_response()
}

pub fn empty_success(message: impl Into<String>) -> Response {
    let body: ApiResponse<()> = ApiResponse {
        success: true,
        data: None,
        message: message.into(),
    };
    (StatusCode::OK, Json(body)).into_response()
}

pub fn error(
    code: &str,
    message: impl Into<String>,
    details: Option<Value>,
    status: StatusCode,
) -> Response {
    let body = ApiErrorResponse {
        success: false,
        error: ApiErrorBody {
            code: code.to_string(),
            message: message.into(),
            details,
        },
    };

    (status, Json(body)).into_response()
}
