//! One thin handler per route. Each delegates to a core module and wraps
//! the result in the JSON envelope; no SQL or SMTP lives here.

use axum::extract::{Multipart, Path, State};
use axum::response::Response;
use serde::Serialize;

use crate::checkin;
use crate::dispatch;
use crate::import;
use crate::issuer;
use crate::state::AppState;
use crate::store::{self, FlagOutcome};
use crate::utils::error::AppError;
use crate::utils::response::{empty_success, success};

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Response {
    let payload = HealthPayload {
        status: "ok",
        service: "turnstile-api",
    };

    success(payload, "Health check successful")
}

/// POST /attendees/import: multipart upload of the sign-up sheet CSV.
pub async fn import_attendees(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidPayload(format!("Malformed upload: {e}")))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::InvalidPayload(format!("Failed to read upload: {e}")))?;

            let summary = import::import_csv(&state.pool, &bytes).await?;
            return Ok(success(summary, "Sheet processed"));
        }
    }

    Err(AppError::InvalidPayload(
        "Upload must contain a 'file' field".to_string(),
    ))
}

/// GET /attendees: the reporting view, flags and credential state included.
pub async fn list_attendees(State(state): State<AppState>) -> Result<Response, AppError> {
    let attendees = store::list_attendees(&state.pool).await?;
    Ok(success(attendees, "Attendees fetched"))
}

/// GET /checkin/{id}: resolve a scanned credential payload.
pub async fn resolve_scan(
    State(state): State<AppState>,
    Path(payload): Path<String>,
) -> Result<Response, AppError> {
    let report = checkin::resolve(&state.pool, &payload).await?;
    Ok(success(report, "Scan resolved"))
}

fn flag_response(outcome: FlagOutcome, what: &str) -> Response {
    match outcome {
        FlagOutcome::Updated => empty_success(format!("{what} validated")),
        FlagOutcome::AlreadySet => empty_success(format!("{what} was already validated")),
    }
}

pub async fn mark_entry(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let outcome = checkin::mark_entry(&state.pool, id).await?;
    Ok(flag_response(outcome, "Entry"))
}

pub async fn mark_food_collected(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let outcome = checkin::mark_food_collected(&state.pool, id).await?;
    Ok(flag_response(outcome, "Food collection"))
}

pub async fn mark_parking_validated(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let outcome = checkin::mark_parking_validated(&state.pool, id).await?;
    Ok(flag_response(outcome, "Parking"))
}

/// POST /credentials/{id}/issue: idempotent single issuance.
pub async fn issue_credential(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let existed = store::find_credential(&state.pool, id).await?.is_some();
    let credential = issuer::issue(&state.pool, id).await?;

    let message = if existed {
        "Credential already issued"
    } else {
        "Credential issued"
    };
    Ok(success(credential, message))
}

/// POST /credentials/issue-all: batch issuance with per-id failures.
pub async fn issue_all_credentials(State(state): State<AppState>) -> Result<Response, AppError> {
    let summary = issuer::issue_all(&state.pool).await?;
    Ok(success(summary, "Batch issuance complete"))
}

/// POST /notifications/{id}/send: email the credential to one attendee.
pub async fn send_notification(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    dispatch::send_one(
        &state.pool,
        &state.mailer,
        &state.templates,
        &state.artifact_dir,
        id,
    )
    .await?;

    Ok(empty_success("Credential emailed"))
}

/// POST /notifications/{id}/resend: explicit redelivery, sent flag or not.
pub async fn resend_notification(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    dispatch::send_one(
        &state.pool,
        &state.mailer,
        &state.templates,
        &state.artifact_dir,
        id,
    )
    .await?;

    Ok(empty_success("Credential re-emailed"))
}

/// POST /notifications/send-pending: email everyone not yet marked sent.
pub async fn send_pending_notifications(
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let summary = dispatch::send_all_pending(
        &state.pool,
        &state.mailer,
        &state.templates,
        &state.artifact_dir,
    )
    .await?;

    Ok(success(summary, "Pending dispatch complete"))
}
