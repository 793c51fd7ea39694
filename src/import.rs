//! Bulk import of the sign-up sheet export. Rows are attempted
//! independently; a malformed row is reported, never batch-fatal.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{debug, warn};

use crate::models::NewAttendee;
use crate::store;
use crate::utils::error::AppError;

/// Timestamp format used by the sheet export.
const SHEET_TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// One CSV row, keyed on the export's literal column headers.
#[derive(Debug, Deserialize)]
struct SheetRow {
    #[serde(rename = "Timestamp", default)]
    timestamp: Option<String>,
    #[serde(rename = "Email address")]
    email_address: String,
    #[serde(rename = "First Name")]
    first_name: String,
    #[serde(rename = "Last Name")]
    last_name: String,
    #[serde(rename = "Mobile Number", default)]
    mobile_number: Option<String>,
    #[serde(rename = "Number of Tickets", default)]
    ticket_count: Option<String>,
    #[serde(rename = "Car Parking", default)]
    car_parking: Option<String>,
    #[serde(rename = "Torch/Burn Ravan Effigy", default)]
    effigy_torch: Option<String>,
    #[serde(rename = "Samosa", default)]
    samosa: Option<String>,
    #[serde(rename = "Dabeli", default)]
    dabeli: Option<String>,
    #[serde(rename = "Vada-Idli Combo", default)]
    vada_idli_combo: Option<String>,
    #[serde(rename = "Jalebi", default)]
    jalebi: Option<String>,
    #[serde(rename = "Car Registration Number", default)]
    car_registration: Option<String>,
    #[serde(rename = "Payable Total", default)]
    payable_total: Option<String>,
    #[serde(rename = "Payable Status", default)]
    payable_status: Option<String>,
}

impl SheetRow {
    fn into_new_attendee(self) -> NewAttendee {
        let registered_at = self.timestamp.as_deref().and_then(parse_sheet_timestamp);

        NewAttendee {
            registered_at,
            email_address: self.email_address,
            first_name: self.first_name,
            last_name: self.last_name,
            mobile_number: self.mobile_number,
            ticket_count: self.ticket_count,
            car_parking: self.car_parking,
            effigy_torch: self.effigy_torch,
            samosa: self.samosa,
            dabeli: self.dabeli,
            vada_idli_combo: self.vada_idli_combo,
            jalebi: self.jalebi,
            car_registration: self.car_registration,
            payable_total: self.payable_total,
            payable_status: self.payable_status,
        }
    }
}

/// Unparseable timestamps import as NULL rather than failing the row.
fn parse_sheet_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let parsed = NaiveDateTime::parse_from_str(raw.trim(), SHEET_TIMESTAMP_FORMAT).ok();
    if parsed.is_none() {
        warn!(timestamp = raw, "Invalid sheet timestamp, storing NULL");
    }
    parsed
}

#[derive(Debug, Serialize)]
pub struct ImportFailure {
    /// 1-based line in the uploaded file, counting the header line.
    pub row: usize,
    pub reason: String,
}

#[derive(Debug, Default, Serialize)]
pub struct ImportSummary {
    pub imported: u32,
    pub failures: Vec<ImportFailure>,
}

/// Import every row of an uploaded CSV export.
pub async fn import_csv(pool: &PgPool, bytes: &[u8]) -> Result<ImportSummary, AppError> {
    let mut reader = csv::Reader::from_reader(bytes);
    let mut summary = ImportSummary::default();

    for (index, record) in reader.deserialize::<SheetRow>().enumerate() {
        let row = index + 2;

        let sheet_row = match record {
            Ok(sheet_row) => sheet_row,
            Err(e) => {
                warn!(row, error = %e, "Skipping malformed sheet row");
                summary.failures.push(ImportFailure {
                    row,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        match store::create_attendee(pool, &sheet_row.into_new_attendee()).await {
            Ok(id) => {
                debug!(row, attendee_id = id, "Imported sheet row");
                summary.imported += 1;
            }
            Err(e) => {
                warn!(row, error = %e, "Failed to insert sheet row");
                summary.failures.push(ImportFailure {
                    row,
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Timestamp,Email address,First Name,Last Name,Mobile Number,\
Number of Tickets,Car Parking,Torch/Burn Ravan Effigy,Samosa,Dabeli,\
Vada-Idli Combo,Jalebi,Car Registration Number,Payable Total,Payable Status";

    #[test]
    fn sheet_timestamps_parse_day_first() {
        let parsed = parse_sheet_timestamp("25/12/2024 18:30:00").unwrap();
        assert_eq!(parsed.format("%Y-%m-%d %H:%M:%S").to_string(), "2024-12-25 18:30:00");
    }

    #[test]
    fn bad_timestamps_become_null() {
        assert!(parse_sheet_timestamp("2024-12-25 18:30:00").is_none());
        assert!(parse_sheet_timestamp("soon").is_none());
        assert!(parse_sheet_timestamp("").is_none());
    }

    #[test]
    fn rows_deserialize_by_sheet_header() {
        let csv_text = format!(
            "{HEADER}\n25/12/2024 18:30:00,a@b.com,A,B,07700 900123,2,Yes,No,1 - £2,,2 - £4,,AB12 CDE,£14,Paid\n"
        );
        let mut reader = csv::Reader::from_reader(csv_text.as_bytes());
        let row: SheetRow = reader.deserialize().next().unwrap().unwrap();

        assert_eq!(row.email_address, "a@b.com");
        assert_eq!(row.first_name, "A");
        assert_eq!(row.last_name, "B");
        assert_eq!(row.samosa.as_deref(), Some("1 - £2"));
        assert_eq!(row.dabeli, None);

        let attendee = row.into_new_attendee();
        assert!(attendee.registered_at.is_some());
        assert_eq!(attendee.payable_status.as_deref(), Some("Paid"));
    }

    #[test]
    fn empty_optional_fields_import_as_none() {
        let csv_text = format!("{HEADER}\n,b@c.com,C,D,,,,,,,,,,,\n");
        let mut reader = csv::Reader::from_reader(csv_text.as_bytes());
        let row: SheetRow = reader.deserialize().next().unwrap().unwrap();

        assert_eq!(row.timestamp, None);
        assert_eq!(row.mobile_number, None);
        assert_eq!(row.jalebi, None);

        let attendee = row.into_new_attendee();
        assert!(attendee.registered_at.is_none());
    }
}
