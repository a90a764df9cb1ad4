// src/models/user.rs

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::common::error::AppError;
use crate::common::time::RawTimestamp;

// The only authorization axis: admins see everything, users see their own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(AppError::InvalidFilter(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    pub uid: String,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub created_at: Option<DateTime<Utc>>,
}

impl UserAccount {
    /// Display name, else e-mail, else the raw uid.
    pub fn label(&self) -> &str {
        if !self.display_name.is_empty() {
            &self.display_name
        } else if !self.email.is_empty() {
            &self.email
        } else {
            &self.uid
        }
    }
}

// Who is asking. Supplied by the caller; the module trusts it as given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: String,
    pub role: Role,
}

impl AuthenticatedUser {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self { id: id.into(), role }
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserActivity {
    pub last_activity: Option<DateTime<Utc>>,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserWithStats {
    #[serde(flatten)]
    pub account: UserAccount,

    pub total_enquiries: usize,
    pub active_enquiries: usize,
    pub converted_enquiries: usize,
    // Percentage, one decimal place
    pub conversion_rate: Decimal,

    #[serde(flatten)]
    pub activity: UserActivity,
}

impl UserWithStats {
    pub fn activity_label(&self) -> &'static str {
        if self.activity.is_active { "active" } else { "inactive" }
    }
}

// --- RAW ---

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawUser {
    pub id: Option<String>,
    pub uid: Option<String>,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub role: Option<String>,
    pub created_at: Option<RawTimestamp>,
}
