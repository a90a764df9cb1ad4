// src/services/normalize_service.rs

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde_json::Value;
use validator::Validate;

use crate::{
    common::{
        error::{AppError, RecordError},
        time::{parse_calendar_date, RawTimestamp},
    },
    models::{
        enquiry::{EnquiryRecord, FeedbackEntry, RawEnquiry, RawFeedbackEntry},
        user::{RawUser, Role, UserAccount},
    },
};

// --- RESULT OF ONE BATCH ---

#[derive(Debug)]
pub struct SkippedRecord {
    // Position in the raw snapshot
    pub index: usize,
    pub id: Option<String>,
    pub reason: RecordError,
}

/// Normalized records plus the tally of raw records that were left out.
#[derive(Debug)]
pub struct NormalizedBatch<T> {
    pub records: Vec<T>,
    pub skipped: Vec<SkippedRecord>,
}

impl<T> NormalizedBatch<T> {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}

// =============================================================================
//  OWNER DIRECTORY (pre-fetched id -> display name)
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct OwnerDirectory {
    names: HashMap<String, String>,
}

impl OwnerDirectory {
    pub fn from_users(users: &[UserAccount]) -> Self {
        let names = users
            .iter()
            .map(|user| (user.uid.clone(), user.label().to_string()))
            .collect();
        Self { names }
    }

    /// Display name for an owner id; dangling ids fall back to themselves.
    pub fn display_name<'a>(&'a self, uid: &'a str) -> &'a str {
        self.names.get(uid).map(String::as_str).unwrap_or(uid)
    }

    pub fn contains(&self, uid: &str) -> bool {
        self.names.contains_key(uid)
    }
}

// =============================================================================
//  ADAPTER
// =============================================================================

#[derive(Debug, Clone, Copy)]
pub struct NormalizeService {
    // Used for zone-less timestamps and for reducing instants to days
    offset: FixedOffset,
}

impl NormalizeService {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Fails fast unless the snapshot is a list, then normalizes it.
    pub fn normalize_enquiry_snapshot(
        &self,
        snapshot: &Value,
        directory: &OwnerDirectory,
    ) -> Result<NormalizedBatch<EnquiryRecord>, AppError> {
        let raw = expect_list(snapshot, "enquiries")?;
        Ok(self.normalize_enquiries(raw, directory))
    }

    pub fn normalize_user_snapshot(&self, snapshot: &Value) -> Result<NormalizedBatch<UserAccount>, AppError> {
        let raw = expect_list(snapshot, "users")?;
        Ok(self.normalize_users(raw))
    }

    pub fn normalize_enquiries(&self, raw: &[Value], directory: &OwnerDirectory) -> NormalizedBatch<EnquiryRecord> {
        let batch = collect_batch(raw, |value| self.normalize_enquiry(value, directory));

        if !batch.skipped.is_empty() {
            tracing::warn!(
                kept = batch.records.len(),
                skipped = batch.skipped.len(),
                "Some enquiry records were left out of the snapshot"
            );
        }

        batch
    }

    pub fn normalize_users(&self, raw: &[Value]) -> NormalizedBatch<UserAccount> {
        collect_batch(raw, |value| self.normalize_user(value))
    }

    pub fn normalize_enquiry(&self, value: &Value, directory: &OwnerDirectory) -> Result<EnquiryRecord, RecordError> {
        if !value.is_object() {
            return Err(RecordError::NotAnObject);
        }

        let raw: RawEnquiry = serde_json::from_value(value.clone())?;

        // A. Required fields
        raw.validate()?;

        // B. Dates and timestamps
        let enquiry_date = self
            .optional_date("enquiryDate", raw.enquiry_date.as_deref())?
            .ok_or(RecordError::InvalidDate { field: "enquiryDate", value: String::new() })?;
        let test_drive_date = self.optional_date("testDriveDate", raw.test_drive_date.as_deref())?;
        let evaluation_date = self.optional_date("evaluationDate", raw.evaluation_date.as_deref())?;
        let next_follow_up_date = self.optional_date("nextFollowUpDate", raw.next_follow_up_date.as_deref())?;
        let created_at = self.timestamp("createdAt", raw.created_at.as_ref())?;
        let updated_at = self.timestamp("updatedAt", raw.updated_at.as_ref())?;

        let feedback_remarks = raw
            .feedback_remarks
            .unwrap_or_default()
            .into_iter()
            .map(|entry| self.feedback_entry(entry))
            .collect::<Result<Vec<_>, _>>()?;

        // C. Ownership
        let created_by = raw.created_by.unwrap_or_default();
        let created_by_name = directory.display_name(&created_by).to_string();

        Ok(EnquiryRecord {
            id: raw.id.unwrap_or_default(),
            customer_name: raw.customer_name.unwrap_or_default(),
            mobile_number: raw.mobile_number.unwrap_or_default(),
            enquiry_no: raw.enquiry_no.unwrap_or_default(),
            office_phone: raw.office_phone.unwrap_or_default(),
            email_id: raw.email_id.unwrap_or_default(),
            address: raw.address.unwrap_or_default(),
            pin_code: raw.pin_code.unwrap_or_default(),
            company_institution: raw.company_institution.unwrap_or_default(),
            team_lead_name: raw.team_lead_name.unwrap_or_default(),
            dse_name: raw.dse_name.unwrap_or_default(),
            enquiry_status: raw.enquiry_status.unwrap_or_default(),
            lead_status: raw.lead_status.unwrap_or_default(),
            source: raw.source.unwrap_or_default(),
            buyer_type: raw.buyer_type.unwrap_or_default(),
            model_name: raw.model_name.unwrap_or_default(),
            variant_name: raw.variant_name.unwrap_or_default(),
            colour_name: raw.colour_name.unwrap_or_default(),
            enquiry_date,
            test_drive_appt: raw.test_drive_appt.unwrap_or(false),
            test_drive_date,
            home_visit_appt: raw.home_visit_appt.unwrap_or(false),
            evaluation_date,
            next_follow_up_date,
            lost_or_drop_reason: raw.lost_or_drop_reason.unwrap_or_default(),
            feedback_remarks,
            created_by,
            created_by_name,
            created_at,
            updated_at,
        })
    }

    pub fn normalize_user(&self, value: &Value) -> Result<UserAccount, RecordError> {
        if !value.is_object() {
            return Err(RecordError::NotAnObject);
        }

        let raw: RawUser = serde_json::from_value(value.clone())?;

        // The uid field wins; older documents only carry the document id
        let uid = raw
            .uid
            .filter(|uid| !uid.is_empty())
            .or(raw.id.filter(|id| !id.is_empty()))
            .ok_or(RecordError::MissingIdentity)?;

        // Unknown roles get the least privilege
        let role = raw
            .role
            .as_deref()
            .and_then(|role| role.parse::<Role>().ok())
            .unwrap_or_default();

        Ok(UserAccount {
            uid,
            email: raw.email.unwrap_or_default(),
            display_name: raw.display_name.unwrap_or_default(),
            role,
            created_at: self.timestamp("createdAt", raw.created_at.as_ref())?,
        })
    }

    fn feedback_entry(&self, raw: RawFeedbackEntry) -> Result<FeedbackEntry, RecordError> {
        Ok(FeedbackEntry {
            id: raw.id.unwrap_or_default(),
            date: raw.date.unwrap_or_default(),
            feedback: raw.feedback.unwrap_or_default(),
            created_at: self.timestamp("feedbackRemarks.createdAt", raw.created_at.as_ref())?,
        })
    }

    fn timestamp(
        &self,
        field: &'static str,
        raw: Option<&RawTimestamp>,
    ) -> Result<Option<DateTime<Utc>>, RecordError> {
        match raw {
            Some(raw) => raw.resolve(field, self.offset),
            None => Ok(None),
        }
    }

    fn optional_date(&self, field: &'static str, raw: Option<&str>) -> Result<Option<NaiveDate>, RecordError> {
        match raw.map(str::trim) {
            None | Some("") => Ok(None),
            Some(text) => parse_calendar_date(text, self.offset)
                .map(Some)
                .ok_or_else(|| RecordError::InvalidDate { field, value: text.to_string() }),
        }
    }
}

// --- HELPERS ---

fn expect_list<'a>(snapshot: &'a Value, what: &str) -> Result<&'a [Value], AppError> {
    snapshot
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| AppError::InvalidSnapshot(format!("{what} snapshot is not a list")))
}

fn collect_batch<T, F>(raw: &[Value], mut normalize: F) -> NormalizedBatch<T>
where
    F: FnMut(&Value) -> Result<T, RecordError>,
{
    let mut records = Vec::with_capacity(raw.len());
    let mut skipped = Vec::new();

    for (index, value) in raw.iter().enumerate() {
        match normalize(value) {
            Ok(record) => records.push(record),
            Err(reason) => {
                let id = value.get("id").and_then(Value::as_str).map(str::to_string);
                tracing::warn!(index, id = ?id, %reason, "Skipping malformed record");
                skipped.push(SkippedRecord { index, id, reason });
            }
        }
    }

    NormalizedBatch { records, skipped }
}
