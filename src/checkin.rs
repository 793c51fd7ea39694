//! The gate workflow: resolve a scanned payload to an attendee and apply
//! one of the three validation transitions.

use serde::Serialize;
use sqlx::PgPool;

use crate::models::{AttendeeDetails, FoodQuantities};
use crate::store::{self, FlagOutcome, ValidationFlag};
use crate::utils::error::AppError;

/// Everything the gate screen shows after a scan: the record, the current
/// flags, and how many of each food item the attendee paid for.
#[derive(Debug, Serialize)]
pub struct ScanReport {
    #[serde(flatten)]
    pub details: AttendeeDetails,
    #[serde(flatten)]
    pub food: FoodQuantities,
}

/// A credential payload is nothing but the attendee id in decimal.
pub fn parse_payload(payload: &str) -> Result<i64, AppError> {
    payload
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id >= 0)
        .ok_or_else(|| {
            AppError::InvalidPayload(format!("Scanned payload {payload:?} is not an attendee id"))
        })
}

/// Resolve a scanned payload. The food quantities are derived for display
/// only and never persisted.
pub async fn resolve(pool: &PgPool, payload: &str) -> Result<ScanReport, AppError> {
    let id = parse_payload(payload)?;
    let details = store::get_attendee(pool, id).await?;
    let food = FoodQuantities::for_attendee(&details.attendee);

    Ok(ScanReport { details, food })
}

/// Each transition is one conditional UPDATE in the store, so a duplicate
/// scan reports `AlreadySet` instead of erroring and two concurrent scans
/// cannot lose an update.
pub async fn mark_entry(pool: &PgPool, id: i64) -> Result<FlagOutcome, AppError> {
    store::set_flag(pool, id, ValidationFlag::Entry).await
}

pub async fn mark_food_collected(pool: &PgPool, id: i64) -> Result<FlagOutcome, AppError> {
    store::set_flag(pool, id, ValidationFlag::Food).await
}

pub async fn mark_parking_validated(pool: &PgPool, id: i64) -> Result<FlagOutcome, AppError> {
    store::set_flag(pool, id, ValidationFlag::Parking).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_payloads_resolve_to_ids() {
        assert_eq!(parse_payload("1").unwrap(), 1);
        assert_eq!(parse_payload("0").unwrap(), 0);
        assert_eq!(parse_payload(" 42 ").unwrap(), 42);
    }

    #[test]
    fn malformed_payloads_are_rejected() {
        for payload in ["", "abc", "1.5", "-3", "1e3", "0x10"] {
            assert!(
                matches!(parse_payload(payload), Err(AppError::InvalidPayload(_))),
                "payload {payload:?} should be rejected"
            );
        }
    }
}
