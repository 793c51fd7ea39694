use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// The scannable pass for one attendee. The QR payload is the attendee id
/// rendered as a decimal string; `image_uri` holds the PNG as a data URI.
/// At most one row exists per attendee and it is never re-rendered.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Credential {
    pub attendee_id: i64,
    pub image_uri: String,
    pub sent: bool,
    pub issued_at: DateTime<Utc>,
}

impl Credential {
    /// The string encoded into the QR image for this attendee.
    pub fn payload(&self) -> String {
        self.attendee_id.to_string()
    }
}
