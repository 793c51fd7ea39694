pub mod attendee;
pub mod credential;

pub use attendee::{
    Attendee, AttendeeDetails, AttendeeOverview, FoodQuantities, NewAttendee, ValidationStatus,
};
pub use credential::Credential;
