//! All persistence for attendees, validation flags, and credentials.
//!
//! Every same-row race is settled inside Postgres: multi-row writes run in
//! a transaction and flag transitions are single conditional UPDATEs, so
//! request code never does read-modify-write and never holds a lock across
//! an await.

use sqlx::PgPool;

use crate::models::{AttendeeDetails, AttendeeOverview, Credential, NewAttendee};
use crate::utils::error::AppError;

/// One of the three gate flags an attendee can have validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationFlag {
    Entry,
    Food,
    Parking,
}

impl ValidationFlag {
    fn column(self) -> &'static str {
        match self {
            ValidationFlag::Entry => "entry_validated",
            ValidationFlag::Food => "food_collected",
            ValidationFlag::Parking => "parking_validated",
        }
    }
}

/// Result of a flag transition. `AlreadySet` is success, not an error: a
/// second scan of the same credential must behave like the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagOutcome {
    Updated,
    AlreadySet,
}

/// Insert an attendee and its zero-valued validation row in one
/// transaction. Neither row exists if the other cannot be written.
pub async fn create_attendee(pool: &PgPool, attendee: &NewAttendee) -> Result<i64, AppError> {
    let mut tx = pool.begin().await?;

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO attendees
            (registered_at, email_address, first_name, last_name, mobile_number,
             ticket_count, car_parking, effigy_torch, samosa, dabeli,
             vada_idli_combo, jalebi, car_registration, payable_total, payable_status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        RETURNING id
        "#,
    )
    .bind(attendee.registered_at)
    .bind(&attendee.email_address)
    .bind(&attendee.first_name)
    .bind(&attendee.last_name)
    .bind(&attendee.mobile_number)
    .bind(&attendee.ticket_count)
    .bind(&attendee.car_parking)
    .bind(&attendee.effigy_torch)
    .bind(&attendee.samosa)
    .bind(&attendee.dabeli)
    .bind(&attendee.vada_idli_combo)
    .bind(&attendee.jalebi)
    .bind(&attendee.car_registration)
    .bind(&attendee.payable_total)
    .bind(&attendee.payable_status)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("INSERT INTO validation_status (attendee_id) VALUES ($1)")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(id)
}

/// Fetch one attendee joined with its validation flags.
pub async fn get_attendee(pool: &PgPool, id: i64) -> Result<AttendeeDetails, AppError> {
    sqlx::query_as::<_, AttendeeDetails>(
        r#"
        SELECT a.*, vs.entry_validated, vs.food_collected, vs.parking_validated
        FROM attendees a
        JOIN validation_status vs ON vs.attendee_id = a.id
        WHERE a.id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("No attendee with id {id}")))
}

/// Every attendee ascending by id, with credential metadata where issued.
pub async fn list_attendees(pool: &PgPool) -> Result<Vec<AttendeeOverview>, AppError> {
    let rows = sqlx::query_as::<_, AttendeeOverview>(
        r#"
        SELECT a.*, vs.entry_validated, vs.food_collected, vs.parking_validated,
               c.image_uri AS credential_uri, c.sent AS credential_sent
        FROM attendees a
        JOIN validation_status vs ON vs.attendee_id = a.id
        LEFT JOIN credentials c ON c.attendee_id = a.id
        ORDER BY a.id ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Flip one flag false -> true with a single conditional statement.
///
/// Concurrent duplicate scans both succeed: exactly one caller observes
/// `Updated`, the rest observe `AlreadySet`, and the flag ends true either
/// way. The no-transition case needs a second lookup only to distinguish
/// "already validated" from "no such attendee".
pub async fn set_flag(
    pool: &PgPool,
    id: i64,
    flag: ValidationFlag,
) -> Result<FlagOutcome, AppError> {
    let column = flag.column();
    let statement = format!(
        "UPDATE validation_status SET {column} = TRUE \
         WHERE attendee_id = $1 AND {column} = FALSE"
    );

    let result = sqlx::query(&statement).bind(id).execute(pool).await?;
    if result.rows_affected() == 1 {
        return Ok(FlagOutcome::Updated);
    }

    let exists: Option<i64> =
        sqlx::query_scalar("SELECT attendee_id FROM validation_status WHERE attendee_id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

    match exists {
        Some(_) => Ok(FlagOutcome::AlreadySet),
        None => Err(AppError::NotFound(format!("No attendee with id {id}"))),
    }
}

pub async fn attendee_exists(pool: &PgPool, id: i64) -> Result<bool, AppError> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM attendees WHERE id = $1)")
        .bind(id)
        .fetch_one(pool)
        .await?;

    Ok(exists)
}

pub async fn all_attendee_ids(pool: &PgPool) -> Result<Vec<i64>, AppError> {
    let ids = sqlx::query_scalar("SELECT id FROM attendees ORDER BY id ASC")
        .fetch_all(pool)
        .await?;

    Ok(ids)
}

pub async fn find_credential(pool: &PgPool, id: i64) -> Result<Option<Credential>, AppError> {
    let credential = sqlx::query_as::<_, Credential>(
        "SELECT attendee_id, image_uri, sent, issued_at FROM credentials WHERE attendee_id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(credential)
}

/// Insert a credential row unless one already exists. Returns false when a
/// concurrent issuance won the race; the caller adopts the existing row.
pub async fn insert_credential(pool: &PgPool, id: i64, image_uri: &str) -> Result<bool, AppError> {
    let result = sqlx::query(
        "INSERT INTO credentials (attendee_id, image_uri) VALUES ($1, $2) \
         ON CONFLICT (attendee_id) DO NOTHING",
    )
    .bind(id)
    .bind(image_uri)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Mark the credential delivered. Fails when no credential was ever issued.
pub async fn mark_credential_sent(pool: &PgPool, id: i64) -> Result<(), AppError> {
    let result = sqlx::query("UPDATE credentials SET sent = TRUE WHERE attendee_id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "No credential issued for attendee {id}"
        )));
    }

    Ok(())
}

/// Ids still owed an email: no credential yet, or one that never got a
/// delivery confirmation. Already-sent attendees are never selected here.
pub async fn pending_dispatch_ids(pool: &PgPool) -> Result<Vec<i64>, AppError> {
    let ids = sqlx::query_scalar(
        r#"
        SELECT a.id
        FROM attendees a
        LEFT JOIN credentials c ON c.attendee_id = a.id
        WHERE c.attendee_id IS NULL OR c.sent = FALSE
        ORDER BY a.id ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(ids)
}
