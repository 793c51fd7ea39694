use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use constant_time_eq::constant_time_eq;

use crate::state::AppState;
use crate::utils::error::AppError;

/// The single staff gate in front of every non-health route.
///
/// With `STAFF_API_TOKEN` configured, requests must carry it as a bearer
/// token; without one the gate is open, which is the development mode.
/// There are no roles and no sessions, just this one check.
pub async fn require_staff(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(expected) = state.staff_api_token.as_deref() else {
        return Ok(next.run(request).await);
    };

    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    match presented {
        Some(token) if constant_time_eq(token.as_bytes(), expected.as_bytes()) => {
            Ok(next.run(request).await)
        }
        _ => Err(AppError::AuthError(
            "A valid staff token is required".to_string(),
        )),
    }
}
