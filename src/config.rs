// src/config.rs

use std::{env, path::PathBuf};

use anyhow::{bail, Context};
use chrono::{
    format::{Item, StrftimeItems},
    FixedOffset,
};

use crate::{
    models::{
        export::ExportOptions,
        user::{AuthenticatedUser, Role},
    },
    services::{DashboardService, ExportService, NormalizeService, StatusPolicy, UserService},
};

/// Everything one report run needs, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub enquiries_snapshot: PathBuf,
    pub users_snapshot: PathBuf,
    pub output_dir: PathBuf,
    pub fonts_dir: PathBuf,
    pub font_family: String,
    pub offset: FixedOffset,
    pub date_format: String,
    pub requester: AuthenticatedUser,
    pub status_policy: StatusPolicy,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        // A missing .env is fine; the variables may come from the shell
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let required = |key: &str| lookup(key).filter(|v| !v.trim().is_empty()).with_context(|| format!("{key} must be set"));
        let optional = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let offset_minutes: i32 = optional("REPORT_UTC_OFFSET_MINUTES", "0")
            .trim()
            .parse()
            .context("REPORT_UTC_OFFSET_MINUTES must be a whole number of minutes")?;
        let offset = FixedOffset::east_opt(offset_minutes * 60)
            .with_context(|| format!("REPORT_UTC_OFFSET_MINUTES out of range: {offset_minutes}"))?;

        let date_format = optional("REPORT_DATE_FORMAT", "%d/%m/%Y");
        if StrftimeItems::new(&date_format).any(|item| matches!(item, Item::Error)) {
            bail!("REPORT_DATE_FORMAT is not a valid chrono format: {date_format}");
        }

        let role: Role = optional("REPORT_USER_ROLE", "user")
            .parse()
            .context("REPORT_USER_ROLE must be admin or user")?;

        let status_policy: StatusPolicy = optional("REPORT_STATUS_POLICY", StatusPolicy::ACTIVE_INCLUDES_NEW.name)
            .parse()
            .context("REPORT_STATUS_POLICY must be active-includes-new or active-excludes-new")?;

        Ok(Self {
            enquiries_snapshot: required("ENQUIRIES_SNAPSHOT")?.into(),
            users_snapshot: required("USERS_SNAPSHOT")?.into(),
            output_dir: optional("REPORT_OUTPUT_DIR", "./reports").into(),
            fonts_dir: optional("REPORT_FONTS_DIR", "./fonts").into(),
            font_family: optional("REPORT_FONT_FAMILY", "Roboto"),
            offset,
            date_format,
            requester: AuthenticatedUser::new(required("REPORT_USER_ID")?, role),
            status_policy,
        })
    }

    // --- Service graph ---

    pub fn normalize_service(&self) -> NormalizeService {
        NormalizeService::new(self.offset)
    }

    pub fn dashboard_service(&self) -> DashboardService {
        DashboardService::new(self.status_policy)
    }

    pub fn user_service(&self) -> UserService {
        UserService::new()
    }

    pub fn export_service(&self) -> ExportService {
        ExportService::new(
            ExportOptions::new(self.date_format.clone(), self.offset),
            self.fonts_dir.clone(),
            self.font_family.clone(),
        )
    }
}
