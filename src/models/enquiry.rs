// src/models/enquiry.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::common::time::RawTimestamp;

// --- STATUS VALUES ---
// The status field is an uncontrolled string; these are only the values
// the reports give a meaning to.

pub mod status {
    pub const NEW: &str = "New";
    pub const ACTIVE: &str = "Active";
    pub const FOLLOW_UP: &str = "Follow-up";
    pub const IN_PROGRESS: &str = "In Progress";
    pub const PENDING: &str = "Pending";
    pub const CLOSED: &str = "Closed";
    pub const CONVERTED: &str = "Converted";
    pub const LOST: &str = "Lost";
    pub const ORDER: &str = "Order";
    pub const INVOICED: &str = "Invoiced";
    pub const BOOKING: &str = "Booking";
    pub const RETAIL: &str = "Retail";
    pub const CALL_BACK: &str = "Call Back";
}

pub mod lead_status {
    pub const CALL_CONNECTED: &str = "Call Connected";
    pub const CALL_NOT_CONNECTED: &str = "Call Not Connected";
}

// --- NORMALIZED (what the engine sees) ---

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackEntry {
    pub id: String,
    pub date: String,
    pub feedback: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnquiryRecord {
    pub id: String,

    // Customer
    pub customer_name: String,
    pub mobile_number: String,
    pub enquiry_no: String,
    pub office_phone: String,
    pub email_id: String,
    pub address: String,
    pub pin_code: String,
    pub company_institution: String,
    pub team_lead_name: String,
    pub dse_name: String,

    // Classification
    pub enquiry_status: String,
    pub lead_status: String,
    pub source: String,
    pub buyer_type: String,

    // Vehicle
    pub model_name: String,
    pub variant_name: String,
    pub colour_name: String,

    // Scheduling
    pub enquiry_date: NaiveDate,
    pub test_drive_appt: bool,
    pub test_drive_date: Option<NaiveDate>,
    pub home_visit_appt: bool,
    // Home visit / evaluation appointment day
    pub evaluation_date: Option<NaiveDate>,
    pub next_follow_up_date: Option<NaiveDate>,

    // Narrative
    pub lost_or_drop_reason: String,
    pub feedback_remarks: Vec<FeedbackEntry>,

    // Ownership / audit
    pub created_by: String,
    // Resolved from the user directory; the raw id when the owner is unknown
    pub created_by_name: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl EnquiryRecord {
    /// Latest of the two audit stamps, if any.
    pub fn last_touched(&self) -> Option<DateTime<Utc>> {
        self.created_at.max(self.updated_at)
    }

    pub fn has_status(&self, wanted: &str) -> bool {
        self.enquiry_status == wanted
    }
}

// --- RAW (what the store hands over) ---

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawFeedbackEntry {
    pub id: Option<String>,
    pub date: Option<String>,
    pub feedback: Option<String>,
    pub created_at: Option<RawTimestamp>,
}

// Every field is optional here; `validate()` decides whether the record
// is usable.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct RawEnquiry {
    #[validate(required, length(min = 1))]
    pub id: Option<String>,

    #[validate(required, length(min = 1))]
    pub customer_name: Option<String>,
    #[validate(required, length(min = 1))]
    pub mobile_number: Option<String>,
    pub enquiry_no: Option<String>,
    pub office_phone: Option<String>,
    pub email_id: Option<String>,
    pub address: Option<String>,
    pub pin_code: Option<String>,
    pub company_institution: Option<String>,
    pub team_lead_name: Option<String>,
    pub dse_name: Option<String>,

    #[validate(required, length(min = 1))]
    pub enquiry_status: Option<String>,
    pub lead_status: Option<String>,
    pub source: Option<String>,
    pub buyer_type: Option<String>,

    pub model_name: Option<String>,
    pub variant_name: Option<String>,
    #[serde(rename = "ColourName", alias = "colourName")]
    pub colour_name: Option<String>,

    #[validate(required, length(min = 1))]
    pub enquiry_date: Option<String>,
    pub test_drive_appt: Option<bool>,
    pub test_drive_date: Option<String>,
    pub home_visit_appt: Option<bool>,
    pub evaluation_date: Option<String>,
    pub next_follow_up_date: Option<String>,

    pub lost_or_drop_reason: Option<String>,
    pub feedback_remarks: Option<Vec<RawFeedbackEntry>>,

    pub created_by: Option<String>,
    pub created_at: Option<RawTimestamp>,
    pub updated_at: Option<RawTimestamp>,
}
