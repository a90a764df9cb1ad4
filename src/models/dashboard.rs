// src/models/dashboard.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

// 1. Summary cards at the top of the dashboard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total: usize,
    pub active_count: usize,
    pub completed_count: usize,
    pub pending_count: usize,
    pub today_count: usize,
}

// 2. Lead funnel counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadMetrics {
    pub total_leads: usize,
    pub total_leads_generated: usize,
    pub total_connected: usize,
    pub not_connected: usize,
    pub call_back: usize,
    pub total_booking: usize,
    pub total_retail: usize,
    pub today_leads: usize,
    pub mtd_leads: usize,
}

// 3. One row of the per-user report table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRollupRow {
    pub username: String,
    pub total_enquiry: usize,
    pub total_generated: usize,
    pub test_drive_appt_count: usize,
    pub home_visit_appt_count: usize,
    pub evaluation_appt_count: usize,
    pub total_booking: usize,
    pub total_invoice: usize,
}

// 4. Pie chart slice
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSlice {
    pub status: &'static str,
    pub count: usize,
    pub color: &'static str,
}

// 5. Bar chart entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSlice {
    pub source: String,
    pub count: usize,
}

// 6. Line chart point
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyTrendEntry {
    pub month_label: String,
    pub count: usize,
}

// 7. Key metrics of the reports page
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total: usize,
    pub active: usize,
    pub converted: usize,
    pub lost: usize,
    // Percentage, one decimal place
    pub conversion_rate: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentEnquiry {
    pub id: String,
    pub customer_name: String,
    pub mobile_number: String,
    pub enquiry_no: String,
    pub enquiry_status: String,
    pub enquiry_date: NaiveDate,
}

// Everything one dashboard render needs, derived from a single snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardReport {
    pub generated_at: DateTime<Utc>,
    pub record_count: usize,
    // Raw records the adapter had to leave out of this snapshot
    pub skipped_records: usize,
    pub stats: DashboardStats,
    pub lead_metrics: LeadMetrics,
    pub summary: ReportSummary,
    pub status_distribution: Vec<StatusSlice>,
    pub source_distribution: Vec<SourceSlice>,
    pub monthly_trend: Vec<MonthlyTrendEntry>,
    pub user_rollup: Vec<UserRollupRow>,
    pub recent_enquiries: Vec<RecentEnquiry>,
}

impl DashboardReport {
    pub fn with_skipped_records(mut self, skipped: usize) -> Self {
        self.skipped_records = skipped;
        self
    }
}
