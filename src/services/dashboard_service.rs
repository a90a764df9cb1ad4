// src/services/dashboard_service.rs

use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::{
    common::{error::AppError, time::first_of_month},
    models::{
        dashboard::{
            DashboardReport, DashboardStats, LeadMetrics, MonthlyTrendEntry, RecentEnquiry, ReportSummary,
            SourceSlice, StatusSlice, UserRollupRow,
        },
        enquiry::{lead_status, status, EnquiryRecord},
        user::{AuthenticatedUser, UserAccount},
    },
    services::enquiry_service::EnquiryService,
};

pub const ADMIN_ROLLUP_LABEL: &str = "Admin (All Enquiries)";

// The reports page never counts `New` as active, whatever the dashboard uses
const REPORT_SUMMARY_POLICY: StatusPolicy = StatusPolicy::ACTIVE_EXCLUDES_NEW;

const MONTHLY_TREND_BUCKETS: usize = 6;
const RECENT_ENQUIRIES: usize = 5;

// Fixed order and palette of the status pie chart
const STATUS_PALETTE: [(&str, &str); 7] = [
    (status::NEW, "#3B82F6"),
    (status::ACTIVE, "#10B981"),
    (status::FOLLOW_UP, "#F59E0B"),
    (status::IN_PROGRESS, "#EF4444"),
    (status::CLOSED, "#6B7280"),
    (status::CONVERTED, "#8B5CF6"),
    (status::LOST, "#EF4444"),
];

// =============================================================================
//  STATUS PARTITION POLICY
// =============================================================================

/// Which statuses count as active, completed and pending. The buckets are
/// allowed to overlap; `New` sits in both active and pending under the
/// default policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusPolicy {
    pub name: &'static str,
    pub active: &'static [&'static str],
    pub completed: &'static [&'static str],
    pub pending: &'static [&'static str],
}

impl StatusPolicy {
    /// Default for the dashboard cards; always used by user management.
    pub const ACTIVE_INCLUDES_NEW: StatusPolicy = StatusPolicy {
        name: "active-includes-new",
        active: &[status::ACTIVE, status::FOLLOW_UP, status::IN_PROGRESS, status::NEW],
        completed: &[status::CLOSED, status::CONVERTED],
        pending: &[status::NEW, status::PENDING],
    };

    /// Always used by the reports page; selectable for the dashboard cards.
    pub const ACTIVE_EXCLUDES_NEW: StatusPolicy = StatusPolicy {
        name: "active-excludes-new",
        active: &[status::ACTIVE, status::FOLLOW_UP, status::IN_PROGRESS],
        completed: &[status::CLOSED, status::CONVERTED],
        pending: &[status::NEW, status::PENDING],
    };

    pub fn is_active(&self, record: &EnquiryRecord) -> bool {
        self.active.contains(&record.enquiry_status.as_str())
    }

    pub fn is_completed(&self, record: &EnquiryRecord) -> bool {
        self.completed.contains(&record.enquiry_status.as_str())
    }

    pub fn is_pending(&self, record: &EnquiryRecord) -> bool {
        self.pending.contains(&record.enquiry_status.as_str())
    }
}

impl Default for StatusPolicy {
    fn default() -> Self {
        StatusPolicy::ACTIVE_INCLUDES_NEW
    }
}

impl FromStr for StatusPolicy {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        [StatusPolicy::ACTIVE_INCLUDES_NEW, StatusPolicy::ACTIVE_EXCLUDES_NEW]
            .into_iter()
            .find(|policy| policy.name == value.trim())
            .ok_or_else(|| AppError::InvalidFilter(value.to_string()))
    }
}

/// Rejects as-of values the engine cannot reason about.
pub fn ensure_as_of(as_of: DateTime<FixedOffset>) -> Result<DateTime<FixedOffset>, AppError> {
    if as_of.timestamp() < 0 {
        return Err(AppError::InvalidAsOf(as_of));
    }
    Ok(as_of)
}

/// Percentage with one decimal place, halves rounded away from zero;
/// zero when there is nothing to divide.
pub fn percentage(part: usize, whole: usize) -> Decimal {
    if whole == 0 {
        return Decimal::ZERO;
    }
    (Decimal::from(part) * Decimal::ONE_HUNDRED / Decimal::from(whole))
        .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
}

// =============================================================================
//  AGGREGATION ENGINE
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct DashboardService {
    policy: StatusPolicy,
}

impl DashboardService {
    pub fn new(policy: StatusPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &StatusPolicy {
        &self.policy
    }

    // 1. Summary cards
    pub fn dashboard_stats<R: Borrow<EnquiryRecord>>(
        &self,
        records: &[R],
        as_of: DateTime<FixedOffset>,
    ) -> Result<DashboardStats, AppError> {
        let today = ensure_as_of(as_of)?.date_naive();

        let mut stats = DashboardStats { total: records.len(), ..Default::default() };
        for record in views(records) {
            stats.active_count += usize::from(self.policy.is_active(record));
            stats.completed_count += usize::from(self.policy.is_completed(record));
            stats.pending_count += usize::from(self.policy.is_pending(record));
            stats.today_count += usize::from(record.enquiry_date == today);
        }

        tracing::debug!(policy = self.policy.name, ?stats, "Dashboard stats computed");
        Ok(stats)
    }

    // 2. Lead funnel
    pub fn lead_metrics<R: Borrow<EnquiryRecord>>(
        &self,
        records: &[R],
        as_of: DateTime<FixedOffset>,
    ) -> Result<LeadMetrics, AppError> {
        let today = ensure_as_of(as_of)?.date_naive();
        let month_start = first_of_month(today);

        let mut metrics = LeadMetrics { total_leads: records.len(), ..Default::default() };
        for record in views(records) {
            metrics.total_leads_generated += usize::from(!record.has_status(status::LOST));
            metrics.total_connected += usize::from(record.lead_status == lead_status::CALL_CONNECTED);
            metrics.not_connected += usize::from(record.lead_status == lead_status::CALL_NOT_CONNECTED);
            metrics.call_back += usize::from(record.has_status(status::CALL_BACK));
            metrics.total_booking += usize::from(record.has_status(status::BOOKING));
            metrics.total_retail += usize::from(record.has_status(status::RETAIL));
            metrics.today_leads += usize::from(record.enquiry_date == today);
            metrics.mtd_leads += usize::from(in_range(record.enquiry_date, month_start, today));
        }

        Ok(metrics)
    }

    // 3. Per-user report table
    pub fn user_rollup<R: Borrow<EnquiryRecord>>(
        &self,
        records: &[R],
        users: &[UserAccount],
        requester: &AuthenticatedUser,
    ) -> Vec<UserRollupRow> {
        // Group once instead of rescanning the snapshot per user
        let mut by_owner: HashMap<&str, Vec<&EnquiryRecord>> = HashMap::new();
        for record in views(records) {
            by_owner.entry(record.created_by.as_str()).or_default().push(record);
        }

        let mut rows = Vec::with_capacity(users.len() + 1);

        if requester.is_admin() {
            let all: Vec<&EnquiryRecord> = views(records).collect();
            rows.push(rollup_row(ADMIN_ROLLUP_LABEL, &all));
        }

        let empty = Vec::new();
        rows.extend(
            users
                .iter()
                .filter(|user| requester.is_admin() || user.uid == requester.id)
                .map(|user| {
                    let owned = by_owner.get(user.uid.as_str()).unwrap_or(&empty);
                    rollup_row(user.label(), owned)
                }),
        );

        rows
    }

    // 4. Status pie chart
    pub fn status_distribution<R: Borrow<EnquiryRecord>>(&self, records: &[R]) -> Vec<StatusSlice> {
        STATUS_PALETTE
            .iter()
            .map(|&(name, color)| StatusSlice {
                status: name,
                count: views(records).filter(|r| r.has_status(name)).count(),
                color,
            })
            .filter(|slice| slice.count > 0)
            .collect()
    }

    // 5. Source bar chart: most frequent first, ties by name
    pub fn source_distribution<R: Borrow<EnquiryRecord>>(&self, records: &[R]) -> Vec<SourceSlice> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for record in views(records) {
            let source = record.source.trim();
            if !source.is_empty() {
                *counts.entry(source).or_default() += 1;
            }
        }

        let mut slices: Vec<SourceSlice> = counts
            .into_iter()
            .map(|(source, count)| SourceSlice { source: source.to_string(), count })
            .collect();
        // Stable sort keeps the BTreeMap's name order among equal counts
        slices.sort_by(|a, b| b.count.cmp(&a.count));
        slices
    }

    // 6. Monthly trend, oldest first, last six months with data
    pub fn monthly_trend<R: Borrow<EnquiryRecord>>(&self, records: &[R]) -> Vec<MonthlyTrendEntry> {
        let mut buckets: BTreeMap<NaiveDate, usize> = BTreeMap::new();
        for record in views(records) {
            *buckets.entry(first_of_month(record.enquiry_date)).or_default() += 1;
        }

        let skip = buckets.len().saturating_sub(MONTHLY_TREND_BUCKETS);
        buckets
            .into_iter()
            .skip(skip)
            .map(|(month, count)| MonthlyTrendEntry { month_label: month.format("%b %Y").to_string(), count })
            .collect()
    }

    // 7. Reports page key metrics
    pub fn report_summary<R: Borrow<EnquiryRecord>>(&self, records: &[R]) -> ReportSummary {
        let count = |wanted: &str| views(records).filter(|r| r.has_status(wanted)).count();

        let total = records.len();
        let converted = count(status::CONVERTED);

        ReportSummary {
            total,
            active: views(records).filter(|r| REPORT_SUMMARY_POLICY.is_active(r)).count(),
            converted,
            lost: count(status::LOST),
            conversion_rate: percentage(converted, total),
        }
    }

    /// Every figure of one dashboard render, computed from the same slice.
    pub fn build_report(
        &self,
        records: &[EnquiryRecord],
        users: &[UserAccount],
        requester: &AuthenticatedUser,
        as_of: DateTime<FixedOffset>,
    ) -> Result<DashboardReport, AppError> {
        let as_of = ensure_as_of(as_of)?;

        let recent_enquiries = EnquiryService::recent(records, RECENT_ENQUIRIES)
            .into_iter()
            .map(|record| RecentEnquiry {
                id: record.id.clone(),
                customer_name: record.customer_name.clone(),
                mobile_number: record.mobile_number.clone(),
                enquiry_no: record.enquiry_no.clone(),
                enquiry_status: record.enquiry_status.clone(),
                enquiry_date: record.enquiry_date,
            })
            .collect();

        let report = DashboardReport {
            generated_at: as_of.with_timezone(&Utc),
            record_count: records.len(),
            skipped_records: 0,
            stats: self.dashboard_stats(records, as_of)?,
            lead_metrics: self.lead_metrics(records, as_of)?,
            summary: self.report_summary(records),
            status_distribution: self.status_distribution(records),
            source_distribution: self.source_distribution(records),
            monthly_trend: self.monthly_trend(records),
            user_rollup: self.user_rollup(records, users, requester),
            recent_enquiries,
        };

        tracing::info!(
            requester = %requester.id,
            records = report.record_count,
            policy = self.policy.name,
            "Dashboard report built"
        );

        Ok(report)
    }
}

fn views<R: Borrow<EnquiryRecord>>(records: &[R]) -> impl Iterator<Item = &EnquiryRecord> {
    records.iter().map(<R as Borrow<EnquiryRecord>>::borrow)
}

fn in_range(date: NaiveDate, start: NaiveDate, end: NaiveDate) -> bool {
    date >= start && date <= end
}

// `totalGenerated` counts any record with a status, which is nearly every
// record. Kept as the report has always shown it.
fn rollup_row(username: &str, records: &[&EnquiryRecord]) -> UserRollupRow {
    let count = |predicate: fn(&EnquiryRecord) -> bool| records.iter().filter(|r| predicate(r)).count();

    UserRollupRow {
        username: username.to_string(),
        total_enquiry: records.len(),
        total_generated: count(|r| !r.enquiry_status.is_empty()),
        test_drive_appt_count: count(|r| r.test_drive_appt),
        home_visit_appt_count: count(|r| r.home_visit_appt),
        evaluation_appt_count: count(|r| r.evaluation_date.is_some()),
        total_booking: count(|r| r.has_status(status::ORDER)),
        total_invoice: count(|r| r.has_status(status::INVOICED)),
    }
}
