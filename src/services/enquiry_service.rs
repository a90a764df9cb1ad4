// src/services/enquiry_service.rs

use std::cmp::Reverse;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        enquiry::{EnquiryRecord, FeedbackEntry},
        user::AuthenticatedUser,
    },
};

/// Record-level operations of the enquiry screens. Every mutation hands
/// back a new record; the snapshot the caller holds is left alone.
pub struct EnquiryService;

impl EnquiryService {
    /// Admins see every record, users only the ones they created.
    pub fn visible_to<'r>(records: &'r [EnquiryRecord], requester: &AuthenticatedUser) -> Vec<&'r EnquiryRecord> {
        records
            .iter()
            .filter(|record| requester.is_admin() || record.created_by == requester.id)
            .collect()
    }

    /// Newest first; records without a creation stamp go last.
    pub fn sort_by_created_desc(records: &[EnquiryRecord]) -> Vec<&EnquiryRecord> {
        let mut sorted: Vec<&EnquiryRecord> = records.iter().collect();
        // None < Some, so reversing puts the unstamped records at the end
        sorted.sort_by_key(|record| Reverse(record.created_at));
        sorted
    }

    pub fn recent(records: &[EnquiryRecord], limit: usize) -> Vec<&EnquiryRecord> {
        let mut sorted = Self::sort_by_created_desc(records);
        sorted.truncate(limit);
        sorted
    }

    pub fn append_feedback(record: &EnquiryRecord, text: &str, now: DateTime<Utc>) -> Result<EnquiryRecord, AppError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::EmptyFeedback);
        }

        let mut updated = record.clone();
        updated.feedback_remarks.push(FeedbackEntry {
            id: Uuid::new_v4().to_string(),
            date: now.date_naive().format("%Y-%m-%d").to_string(),
            feedback: text.to_string(),
            created_at: Some(now),
        });
        updated.updated_at = Some(now);

        tracing::debug!(enquiry = %record.id, remarks = updated.feedback_remarks.len(), "Feedback appended");
        Ok(updated)
    }

    pub fn change_status(record: &EnquiryRecord, status: &str, now: DateTime<Utc>) -> EnquiryRecord {
        let mut updated = record.clone();
        updated.enquiry_status = status.trim().to_string();
        updated.updated_at = Some(now);
        updated
    }

    pub fn change_lead_status(record: &EnquiryRecord, lead_status: &str, now: DateTime<Utc>) -> EnquiryRecord {
        let mut updated = record.clone();
        updated.lead_status = lead_status.trim().to_string();
        updated.updated_at = Some(now);
        updated
    }

    pub fn authorize_delete(requester: &AuthenticatedUser, record: &EnquiryRecord) -> Result<(), AppError> {
        if requester.is_admin() || record.created_by == requester.id {
            return Ok(());
        }

        tracing::warn!(requester = %requester.id, enquiry = %record.id, "Delete refused");
        Err(AppError::Forbidden(format!(
            "enquiry {} belongs to another user",
            record.id
        )))
    }
}
