use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A registrant as imported from the sign-up sheet. Everything except the
/// id and `registered_at` is pass-through text, stored exactly as exported.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Attendee {
    pub id: i64,
    pub registered_at: Option<NaiveDateTime>,
    pub email_address: String,
    pub first_name: String,
    pub last_name: String,
    pub mobile_number: Option<String>,
    pub ticket_count: Option<String>,
    pub car_parking: Option<String>,
    pub effigy_torch: Option<String>,
    pub samosa: Option<String>,
    pub dabeli: Option<String>,
    pub vada_idli_combo: Option<String>,
    pub jalebi: Option<String>,
    pub car_registration: Option<String>,
    pub payable_total: Option<String>,
    pub payable_status: Option<String>,
}

/// Field set for inserting a new attendee, before an id exists.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewAttendee {
    pub registered_at: Option<NaiveDateTime>,
    pub email_address: String,
    pub first_name: String,
    pub last_name: String,
    pub mobile_number: Option<String>,
    pub ticket_count: Option<String>,
    pub car_parking: Option<String>,
    pub effigy_torch: Option<String>,
    pub samosa: Option<String>,
    pub dabeli: Option<String>,
    pub vada_idli_combo: Option<String>,
    pub jalebi: Option<String>,
    pub car_registration: Option<String>,
    pub payable_total: Option<String>,
    pub payable_status: Option<String>,
}

/// The three gate flags. Each moves false -> true exactly once; there is
/// no undo path anywhere in the service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, FromRow)]
pub struct ValidationStatus {
    pub entry_validated: bool,
    pub food_collected: bool,
    pub parking_validated: bool,
}

/// Attendee joined with its validation flags.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AttendeeDetails {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub attendee: Attendee,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub status: ValidationStatus,
}

/// Reporting row: attendee, flags, and credential metadata if issued.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AttendeeOverview {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub attendee: Attendee,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub status: ValidationStatus,
    pub credential_uri: Option<String>,
    pub credential_sent: Option<bool>,
}

/// Quantities extracted from the four food-selection strings. Derived for
/// display at the food counter, never written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FoodQuantities {
    pub samosa_count: u32,
    pub dabeli_count: u32,
    pub vada_idli_combo_count: u32,
    pub jalebi_count: u32,
}

impl FoodQuantities {
    pub fn for_attendee(attendee: &Attendee) -> Self {
        Self {
            samosa_count: parse_food_quantity(attendee.samosa.as_deref()),
            dabeli_count: parse_food_quantity(attendee.dabeli.as_deref()),
            vada_idli_combo_count: parse_food_quantity(attendee.vada_idli_combo.as_deref()),
            jalebi_count: parse_food_quantity(attendee.jalebi.as_deref()),
        }
    }
}

/// Extract the leading quantity from a selection string like `"2 - £3"`.
/// Missing, empty, or non-numeric selections count as zero.
pub fn parse_food_quantity(selection: Option<&str>) -> u32 {
    let Some(selection) = selection else {
        return 0;
    };
    selection
        .split(" - £")
        .next()
        .and_then(|quantity| quantity.trim().parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_extracted_from_selection_string() {
        assert_eq!(parse_food_quantity(Some("2 - £3")), 2);
        assert_eq!(parse_food_quantity(Some("10 - £15")), 10);
        assert_eq!(parse_food_quantity(Some("1 - £2")), 1);
    }

    #[test]
    fn missing_or_empty_selection_counts_as_zero() {
        assert_eq!(parse_food_quantity(None), 0);
        assert_eq!(parse_food_quantity(Some("")), 0);
    }

    #[test]
    fn non_numeric_quantity_counts_as_zero() {
        assert_eq!(parse_food_quantity(Some("abc - £3")), 0);
        assert_eq!(parse_food_quantity(Some("- £3")), 0);
    }

    #[test]
    fn quantities_derived_per_item() {
        let attendee = Attendee {
            id: 1,
            registered_at: None,
            email_address: "a@b.com".to_string(),
            first_name: "A".to_string(),
            last_name: "B".to_string(),
            mobile_number: None,
            ticket_count: Some("2".to_string()),
            car_parking: Some("Yes".to_string()),
            effigy_torch: None,
            samosa: Some("1 - £2".to_string()),
            dabeli: Some("3 - £6".to_string()),
            vada_idli_combo: None,
            jalebi: Some("bad".to_string()),
            car_registration: None,
            payable_total: Some("£14".to_string()),
            payable_status: Some("Paid".to_string()),
        };

        let quantities = FoodQuantities::for_attendee(&attendee);
        assert_eq!(quantities.samosa_count, 1);
        assert_eq!(quantities.dabeli_count, 3);
        assert_eq!(quantities.vada_idli_combo_count, 0);
        assert_eq!(quantities.jalebi_count, 0);
    }
}
