// src/common/error.rs

use chrono::{DateTime, FixedOffset};
use thiserror::Error;

// Errors raised to the immediate caller. Everything here is either a
// contract violation (bad as-of, snapshot that is not a list) or a failure
// at the edges (files, fonts, PDF rendering).
#[derive(Debug, Error)]
pub enum AppError {
    #[error("As-of timestamp {0} precedes the Unix epoch")]
    InvalidAsOf(DateTime<FixedOffset>),

    #[error("Snapshot must be a list of records: {0}")]
    InvalidSnapshot(String),

    #[error("Unknown filter value '{0}'")]
    InvalidFilter(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Feedback text must not be blank")]
    EmptyFeedback,

    #[error("Font not found: {0}")]
    FontNotFound(String),

    #[error("PDF error: {0}")]
    Pdf(#[from] genpdf::error::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Anything unexpected, with the context attached by anyhow.
    #[error("Internal error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable code, independent of the message text.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidAsOf(_) => "invalid_as_of",
            AppError::InvalidSnapshot(_) => "invalid_snapshot",
            AppError::InvalidFilter(_) => "invalid_filter",
            AppError::Forbidden(_) => "forbidden",
            AppError::EmptyFeedback => "empty_feedback",
            AppError::FontNotFound(_) => "font_not_found",
            AppError::Pdf(_) => "pdf_error",
            AppError::Io(_) => "io_error",
            AppError::Json(_) => "json_error",
            AppError::Internal(_) => "internal_error",
        }
    }
}

// Why a single raw record was left out of a batch. Never propagated as a
// failure: the adapter collects these into the skipped tally and moves on.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("record is not an object")]
    NotAnObject,

    #[error("record has no id")]
    MissingIdentity,

    #[error("record has an unexpected shape: {0}")]
    Shape(#[from] serde_json::Error),

    #[error("missing required fields: {}", missing_fields(.0).join(", "))]
    Validation(#[from] validator::ValidationErrors),

    #[error("unparseable timestamp in '{field}': {value}")]
    InvalidTimestamp { field: &'static str, value: String },

    #[error("unparseable date in '{field}': {value}")]
    InvalidDate { field: &'static str, value: String },
}

/// Field names that failed validation, sorted for stable messages.
pub fn missing_fields(errors: &validator::ValidationErrors) -> Vec<String> {
    let mut fields: Vec<String> = errors
        .field_errors()
        .keys()
        .map(|field| field.to_string())
        .collect();
    fields.sort();
    fields
}
