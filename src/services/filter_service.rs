// src/services/filter_service.rs

use std::str::FromStr;

use chrono::NaiveDate;

use crate::{
    common::error::AppError,
    models::{
        enquiry::EnquiryRecord,
        user::{Role, UserWithStats},
    },
};

/// Pulls one searchable string out of a record.
pub type SearchField<T> = fn(&T) -> &str;

// --- FIELD SETS PER VIEW ---

// Enquiry list: name, enquiry number, mobile, e-mail
pub const ENQUIRY_LIST_SEARCH: &[SearchField<EnquiryRecord>] = &[
    |e| e.customer_name.as_str(),
    |e| e.enquiry_no.as_str(),
    |e| e.mobile_number.as_str(),
    |e| e.email_id.as_str(),
];

// Enquiry table: only enquiry number and mobile
pub const ENQUIRY_TABLE_SEARCH: &[SearchField<EnquiryRecord>] = &[|e| e.enquiry_no.as_str(), |e| e.mobile_number.as_str()];

// User management: name, e-mail, role and the derived activity label
pub const USER_SEARCH: &[SearchField<UserWithStats>] = &[
    |u| u.account.display_name.as_str(),
    |u| u.account.email.as_str(),
    |u| u.account.role.as_str(),
    |u| u.activity_label(),
];

// =============================================================================
//  PREDICATES
// =============================================================================

/// Case-insensitive substring match on any of `fields`. A blank term
/// matches everything.
pub fn matches_text<T>(record: &T, term: &str, fields: &[SearchField<T>]) -> bool {
    let term = term.trim().to_lowercase();
    matches_lowered(record, &term, fields)
}

fn matches_lowered<T>(record: &T, lowered_term: &str, fields: &[SearchField<T>]) -> bool {
    lowered_term.is_empty()
        || fields
            .iter()
            .any(|field| field(record).to_lowercase().contains(lowered_term))
}

pub fn apply_text_filter<'r, T>(records: &'r [T], term: &str, fields: &[SearchField<T>]) -> Vec<&'r T> {
    let term = term.trim().to_lowercase();
    records
        .iter()
        .filter(|record| matches_lowered(*record, &term, fields))
        .collect()
}

// --- CATEGORICAL ---

/// Exact-match filter on one categorical value; `All` lets everything through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(String),
}

impl CategoryFilter {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "" | "all" => CategoryFilter::All,
            other => CategoryFilter::Only(other.to_string()),
        }
    }

    pub fn accepts(&self, value: &str) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(wanted) => wanted == value,
        }
    }
}

pub fn apply_status_filter<'r>(records: &'r [EnquiryRecord], filter: &CategoryFilter) -> Vec<&'r EnquiryRecord> {
    apply_category_filter(records, filter, |e| e.enquiry_status.as_str())
}

pub fn apply_category_filter<'r, T>(
    records: &'r [T],
    filter: &CategoryFilter,
    key: SearchField<T>,
) -> Vec<&'r T> {
    records.iter().filter(|&record| filter.accepts(key(record))).collect()
}

/// Filter choices of the user management screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UserFilter {
    #[default]
    All,
    Active,
    Inactive,
    Role(Role),
}

impl UserFilter {
    pub fn accepts(&self, user: &UserWithStats) -> bool {
        match self {
            UserFilter::All => true,
            UserFilter::Active => user.activity.is_active,
            UserFilter::Inactive => !user.activity.is_active,
            UserFilter::Role(role) => user.account.role == *role,
        }
    }
}

impl FromStr for UserFilter {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "" | "all" => Ok(UserFilter::All),
            "active" => Ok(UserFilter::Active),
            "inactive" => Ok(UserFilter::Inactive),
            other => other.parse::<Role>().map(UserFilter::Role),
        }
    }
}

// =============================================================================
//  COMPOSITION
// =============================================================================

/// Text term AND categorical filter. Both default to identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterQuery<C> {
    pub term: String,
    pub category: C,
}

impl FilterQuery<CategoryFilter> {
    pub fn apply_enquiries<'r>(
        &self,
        records: &'r [EnquiryRecord],
        fields: &[SearchField<EnquiryRecord>],
    ) -> Vec<&'r EnquiryRecord> {
        let term = self.term.trim().to_lowercase();
        records
            .iter()
            .filter(|record| self.category.accepts(&record.enquiry_status))
            .filter(|record| matches_lowered(*record, &term, fields))
            .collect()
    }
}

impl FilterQuery<UserFilter> {
    pub fn apply_users<'r>(&self, users: &'r [UserWithStats]) -> Vec<&'r UserWithStats> {
        let term = self.term.trim().to_lowercase();
        users
            .iter()
            .filter(|user| self.category.accepts(user))
            .filter(|user| matches_lowered(*user, &term, USER_SEARCH))
            .collect()
    }
}

/// Enquiries dated within `[start, end]`, both ends inclusive.
pub fn filter_by_date_range(records: &[EnquiryRecord], start: NaiveDate, end: NaiveDate) -> Vec<&EnquiryRecord> {
    records
        .iter()
        .filter(|record| record.enquiry_date >= start && record.enquiry_date <= end)
        .collect()
}
