// src/common/time.rs

use chrono::{Datelike, DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::Deserialize;

use crate::common::error::RecordError;

// The store hands timestamps back in three shapes depending on which
// client wrote (or exported) the document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    // Store-native timestamp object (`{"_seconds": .., "_nanoseconds": ..}`)
    Native {
        #[serde(rename = "_seconds")]
        seconds: i64,
        #[serde(rename = "_nanoseconds", default)]
        nanoseconds: u32,
    },
    // Plain epoch-seconds pair (`{"seconds": .., "nanoseconds": ..}`)
    Epoch {
        seconds: i64,
        #[serde(default)]
        nanoseconds: u32,
    },
    // ISO or locale-formatted string
    Text(String),
}

impl RawTimestamp {
    /// Resolves to a UTC instant. `Ok(None)` means "no value" (empty text).
    pub fn resolve(
        &self,
        field: &'static str,
        offset: FixedOffset,
    ) -> Result<Option<DateTime<Utc>>, RecordError> {
        let invalid = || RecordError::InvalidTimestamp { field, value: self.describe() };

        match self {
            RawTimestamp::Native { seconds, nanoseconds }
            | RawTimestamp::Epoch { seconds, nanoseconds } => DateTime::from_timestamp(*seconds, *nanoseconds)
                .map(Some)
                .ok_or_else(invalid),
            RawTimestamp::Text(text) => {
                let text = text.trim();
                if text.is_empty() {
                    return Ok(None);
                }
                parse_timestamp_text(text, offset).map(Some).ok_or_else(invalid)
            }
        }
    }

    pub fn describe(&self) -> String {
        match self {
            RawTimestamp::Native { seconds, nanoseconds }
            | RawTimestamp::Epoch { seconds, nanoseconds } => format!("{seconds}s+{nanoseconds}ns"),
            RawTimestamp::Text(text) => text.clone(),
        }
    }
}

// Zone-less formats are read in the report offset.
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%m/%d/%Y, %I:%M:%S %p",
    "%d/%m/%Y, %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d-%m-%Y"];

/// Parses the textual timestamp shapes seen in stored records: RFC 3339,
/// JS `Date.toString()`, naive ISO date-times and bare dates (midnight).
pub fn parse_timestamp_text(text: &str, offset: FixedOffset) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }

    // "Sun Jun 15 2025 10:00:00 GMT+0530 (India Standard Time)"
    let without_zone_name = text.split(" (").next().unwrap_or(text);
    if let Ok(parsed) = DateTime::parse_from_str(without_zone_name, "%a %b %d %Y %H:%M:%S GMT%z") {
        return Some(parsed.with_timezone(&Utc));
    }

    let naive = NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
                .map(|date| date.and_time(NaiveTime::MIN))
        })?;

    offset
        .from_local_datetime(&naive)
        .single()
        .map(|local| local.with_timezone(&Utc))
}

/// Parses a calendar date. Full timestamps are reduced to their local day.
pub fn parse_calendar_date(text: &str, offset: FixedOffset) -> Option<NaiveDate> {
    let text = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .or_else(|| {
            parse_timestamp_text(text, offset).map(|instant| instant.with_timezone(&offset).date_naive())
        })
}

/// First calendar day of the month containing `date`.
pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}
