// src/services/export_service.rs

use std::borrow::Borrow;
use std::path::PathBuf;

use chrono::NaiveDate;
use genpdf::{elements, style, Element};

use crate::{
    common::error::AppError,
    models::{
        dashboard::UserRollupRow,
        enquiry::EnquiryRecord,
        export::{Column, ColumnSpec, ExportOptions, FlatRow, FlatTable},
        user::UserWithStats,
    },
};

fn yes_no(flag: bool) -> String {
    let text = if flag { "Yes" } else { "No" };
    text.to_string()
}

fn feedback_joined(record: &EnquiryRecord) -> String {
    record
        .feedback_remarks
        .iter()
        .map(|entry| entry.feedback.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

// =============================================================================
//  COLUMN SPECS
// =============================================================================

/// Full enquiry export of the admin table. Owner first.
pub fn enquiry_table_columns() -> ColumnSpec<EnquiryRecord> {
    let mut columns = vec![Column::new("User Name", |e: &EnquiryRecord, _| e.created_by_name.clone())];
    columns.extend(enquiry_list_columns().columns().iter().copied());
    ColumnSpec::new(columns)
}

/// Enquiry export of a user's own list. Same as the table without the owner.
pub fn enquiry_list_columns() -> ColumnSpec<EnquiryRecord> {
    ColumnSpec::new(vec![
        Column::new("Customer Name", |e: &EnquiryRecord, _| e.customer_name.clone()),
        Column::new("Enquiry No.", |e, _| e.enquiry_no.clone()),
        Column::new("Enquiry Date", |e, opts| opts.date(e.enquiry_date)),
        Column::new("Mobile Number", |e, _| e.mobile_number.clone()),
        Column::new("Office Phone", |e, _| e.office_phone.clone()),
        Column::new("Email ID", |e, _| e.email_id.clone()),
        Column::new("Address", |e, _| e.address.clone()),
        Column::new("Pin Code", |e, _| e.pin_code.clone()),
        Column::new("Company/Institution", |e, _| e.company_institution.clone()),
        Column::new("Team Lead Name", |e, _| e.team_lead_name.clone()),
        Column::new("DSE Name", |e, _| e.dse_name.clone()),
        Column::new("Enquiry Status", |e, _| e.enquiry_status.clone()),
        Column::new("Model Name", |e, _| e.model_name.clone()),
        Column::new("Variant Name", |e, _| e.variant_name.clone()),
        Column::new("Colour Name", |e, _| e.colour_name.clone()),
        Column::new("Source", |e, _| e.source.clone()),
        Column::new("Buyer Type", |e, _| e.buyer_type.clone()),
        Column::new("Test Drive Appointment", |e, _| yes_no(e.test_drive_appt)),
        Column::new("Test Drive Date", |e, opts| opts.optional_date(e.test_drive_date)),
        Column::new("Home Visit Appointment", |e, _| yes_no(e.home_visit_appt)),
        Column::new("Evaluation Date", |e, opts| opts.optional_date(e.evaluation_date)),
        Column::new("Lost or Drop Reason", |e, _| e.lost_or_drop_reason.clone()),
        Column::new("Feedback Remarks", |e, _| feedback_joined(e)),
    ])
}

/// Compact layout that fits a landscape page.
pub fn enquiry_pdf_columns() -> ColumnSpec<EnquiryRecord> {
    ColumnSpec::new(vec![
        Column::new("User Name", |e: &EnquiryRecord, _| e.created_by_name.clone()),
        Column::new("Customer Name", |e, _| e.customer_name.clone()),
        Column::new("Enquiry No.", |e, _| e.enquiry_no.clone()),
        Column::new("Date", |e, opts| opts.date(e.enquiry_date)),
        Column::new("Mobile", |e, _| e.mobile_number.clone()),
        Column::new("Email", |e, _| e.email_id.clone()),
        Column::new("Status", |e, _| e.enquiry_status.clone()),
        Column::new("Model", |e, _| e.model_name.clone()),
        Column::new("Source", |e, _| e.source.clone()),
    ])
}

pub fn user_columns() -> ColumnSpec<UserWithStats> {
    ColumnSpec::new(vec![
        Column::new("Name", |u: &UserWithStats, _| {
            if u.account.display_name.is_empty() { "N/A".to_string() } else { u.account.display_name.clone() }
        }),
        Column::new("Email", |u, _| u.account.email.clone()),
        Column::new("Role", |u, _| u.account.role.to_string()),
        Column::new("Status", |u, _| {
            let label = if u.activity.is_active { "Active" } else { "Inactive" };
            label.to_string()
        }),
        Column::new("Total Enquiries", |u, _| u.total_enquiries.to_string()),
        Column::new("Active Enquiries", |u, _| u.active_enquiries.to_string()),
        Column::new("Converted Enquiries", |u, _| u.converted_enquiries.to_string()),
        Column::new("Conversion Rate", |u, _| {
            if u.total_enquiries == 0 { "0%".to_string() } else { format!("{:.1}%", u.conversion_rate) }
        }),
        Column::new("Last Activity", |u, opts| {
            u.activity.last_activity.map(|at| opts.instant_date(at)).unwrap_or_else(|| "Never".to_string())
        }),
        Column::new("Member Since", |u, opts| {
            u.account.created_at.map(|at| opts.instant_date(at)).unwrap_or_default()
        }),
    ])
}

pub fn rollup_columns() -> ColumnSpec<UserRollupRow> {
    ColumnSpec::new(vec![
        Column::new("Username", |r: &UserRollupRow, _| r.username.clone()),
        Column::new("Total Enquiry", |r, _| r.total_enquiry.to_string()),
        Column::new("Total Generated", |r, _| r.total_generated.to_string()),
        Column::new("Test Drive Appt", |r, _| r.test_drive_appt_count.to_string()),
        Column::new("Home Visit Appt", |r, _| r.home_visit_appt_count.to_string()),
        Column::new("Evaluation Appt", |r, _| r.evaluation_appt_count.to_string()),
        Column::new("Total Booking", |r, _| r.total_booking.to_string()),
        Column::new("Total Invoice", |r, _| r.total_invoice.to_string()),
    ])
}

/// `enquiries` + 2025-06-15 + `csv` ⇒ `enquiries_2025-06-15.csv`
pub fn export_file_name(prefix: &str, date: NaiveDate, extension: &str) -> String {
    format!("{}_{}.{}", prefix, date.format("%Y-%m-%d"), extension)
}

// =============================================================================
//  RENDERERS
// =============================================================================

#[derive(Debug, Clone)]
pub struct ExportService {
    options: ExportOptions,
    fonts_dir: PathBuf,
    font_family: String,
}

impl ExportService {
    pub fn new(options: ExportOptions, fonts_dir: impl Into<PathBuf>, font_family: impl Into<String>) -> Self {
        Self { options, fonts_dir: fonts_dir.into(), font_family: font_family.into() }
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Flattens `records` through `spec`. Accepts owned slices and the
    /// borrowed views the filters return.
    pub fn to_flat_rows<T, R: Borrow<T>>(&self, records: &[R], spec: &ColumnSpec<T>) -> FlatTable {
        let rows = records
            .iter()
            .map(<R as Borrow<T>>::borrow)
            .map(|record| {
                FlatRow::new(
                    spec.columns()
                        .iter()
                        .map(|column| (column.header, (column.extract)(record, &self.options)))
                        .collect(),
                )
            })
            .collect();

        FlatTable { headers: spec.headers(), rows }
    }

    /// RFC 4180: CRLF rows, fields quoted when they hold a comma, quote or
    /// line break, quotes doubled.
    pub fn render_csv(&self, table: &FlatTable) -> String {
        let mut out = String::new();
        push_csv_line(&mut out, table.headers.iter().copied());
        for row in &table.rows {
            push_csv_line(&mut out, row.values());
        }
        out
    }

    pub fn render_pdf(&self, table: &FlatTable, title: &str, generated_on: NaiveDate) -> Result<Vec<u8>, AppError> {
        // 1. Fonts from the configured folder
        let font_family = genpdf::fonts::from_files(&self.fonts_dir, &self.font_family, None).map_err(|_| {
            AppError::FontNotFound(format!("{} in {}", self.font_family, self.fonts_dir.display()))
        })?;

        // 2. Landscape A4 document
        let mut doc = genpdf::Document::new(font_family);
        doc.set_title(title);
        doc.set_paper_size(genpdf::Size::new(297, 210));
        let mut decorator = genpdf::SimplePageDecorator::new();
        decorator.set_margins(10);
        doc.set_page_decorator(decorator);

        // --- HEADER ---
        doc.push(elements::Paragraph::new(title).styled(style::Style::new().bold().with_font_size(16)));
        doc.push(
            elements::Paragraph::new(format!("Generated on: {}", self.options.date(generated_on)))
                .styled(style::Style::new().with_font_size(10)),
        );
        doc.push(
            elements::Paragraph::new(format!("Total Records: {}", table.len()))
                .styled(style::Style::new().with_font_size(10)),
        );
        doc.push(elements::Break::new(1.5));

        // --- TABLE ---
        let mut layout = elements::TableLayout::new(vec![1; table.headers.len()]);
        layout.set_cell_decorator(elements::FrameCellDecorator::new(true, true, false));

        let head_style = style::Style::new().bold().with_font_size(8);
        let mut head = layout.row();
        for header in &table.headers {
            head = head.element(elements::Paragraph::new(*header).styled(head_style));
        }
        head.push()?;

        let body_style = style::Style::new().with_font_size(8);
        for row in &table.rows {
            let mut line = layout.row();
            for value in row.values() {
                line = line.element(elements::Paragraph::new(value).styled(body_style));
            }
            line.push()?;
        }

        doc.push(layout);

        // 3. Render to memory
        let mut buffer = Vec::new();
        doc.render(&mut buffer)?;

        tracing::debug!(title, rows = table.len(), bytes = buffer.len(), "PDF rendered");
        Ok(buffer)
    }
}

fn push_csv_line<'a>(out: &mut String, fields: impl Iterator<Item = &'a str>) {
    for (i, field) in fields.enumerate() {
        if i > 0 {
            out.push(',');
        }
        if field.contains([',', '"', '\r', '\n']) {
            out.push('"');
            out.push_str(&field.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(field);
        }
    }
    out.push_str("\r\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        enquiry::FeedbackEntry,
        user::{Role, UserAccount, UserActivity},
    };
    use chrono::{FixedOffset, TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    fn record() -> EnquiryRecord {
        EnquiryRecord {
            id: "e1".into(),
            customer_name: "Sharma, Rohit".into(),
            mobile_number: "9811100000".into(),
            enquiry_no: "ENQ-7".into(),
            office_phone: String::new(),
            email_id: "rohit@mail.com".into(),
            address: "12 \"Green\" Park".into(),
            pin_code: "110016".into(),
            company_institution: String::new(),
            team_lead_name: "Neha".into(),
            dse_name: "Imran".into(),
            enquiry_status: "Follow-up".into(),
            lead_status: "Call Connected".into(),
            source: "Walk-in".into(),
            buyer_type: "First Time".into(),
            model_name: "Nexon".into(),
            variant_name: "XZ+".into(),
            colour_name: "Blue".into(),
            enquiry_date: NaiveDate::from_ymd_opt(2025, 6, 3).unwrap(),
            test_drive_appt: true,
            test_drive_date: NaiveDate::from_ymd_opt(2025, 6, 7),
            home_visit_appt: false,
            evaluation_date: None,
            next_follow_up_date: None,
            lost_or_drop_reason: String::new(),
            feedback_remarks: vec![
                FeedbackEntry { id: "f1".into(), date: "2025-06-03".into(), feedback: "Wants EMI".into(), created_at: None },
                FeedbackEntry { id: "f2".into(), date: "2025-06-04".into(), feedback: "Callback Sat".into(), created_at: None },
            ],
            created_by: "u1".into(),
            created_by_name: "Imran Khan".into(),
            created_at: None,
            updated_at: None,
        }
    }

    fn service() -> ExportService {
        ExportService::new(ExportOptions::default(), "./fonts", "Roboto")
    }

    #[test]
    fn table_columns_start_with_owner_and_keep_their_order() {
        let spec = enquiry_table_columns();
        assert_eq!(spec.len(), 24);
        assert_eq!(spec.headers()[0], "User Name");
        assert_eq!(spec.headers()[1..], enquiry_list_columns().headers()[..]);
        assert_eq!(spec.headers()[23], "Feedback Remarks");
    }

    #[test]
    fn rows_render_dates_flags_and_feedback() {
        let table = service().to_flat_rows(&[record()], &enquiry_table_columns());
        let row = &table.rows[0];

        assert_eq!(row.get("User Name"), Some("Imran Khan"));
        assert_eq!(row.get("Enquiry Date"), Some("03/06/2025"));
        assert_eq!(row.get("Test Drive Appointment"), Some("Yes"));
        assert_eq!(row.get("Test Drive Date"), Some("07/06/2025"));
        assert_eq!(row.get("Home Visit Appointment"), Some("No"));
        assert_eq!(row.get("Evaluation Date"), Some(""));
        assert_eq!(row.get("Feedback Remarks"), Some("Wants EMI; Callback Sat"));
    }

    #[test]
    fn flat_rows_accept_filtered_views() {
        let records = vec![record()];
        let view: Vec<&EnquiryRecord> = records.iter().collect();
        let table = service().to_flat_rows(&view, &enquiry_pdf_columns());
        assert_eq!(table.headers.len(), 9);
        assert_eq!(table.rows[0].values().count(), 9);
    }

    #[test]
    fn csv_quotes_only_where_needed() {
        let table = service().to_flat_rows(&[record()], &enquiry_pdf_columns());
        let csv = service().render_csv(&table);

        let mut lines = csv.split("\r\n");
        assert_eq!(
            lines.next(),
            Some("User Name,Customer Name,Enquiry No.,Date,Mobile,Email,Status,Model,Source")
        );
        assert_eq!(
            lines.next(),
            Some("Imran Khan,\"Sharma, Rohit\",ENQ-7,03/06/2025,9811100000,rohit@mail.com,Follow-up,Nexon,Walk-in")
        );
        assert_eq!(lines.next(), Some(""));

        let full = service().render_csv(&service().to_flat_rows(&[record()], &enquiry_list_columns()));
        assert!(full.contains("\"12 \"\"Green\"\" Park\""));
    }

    #[test]
    fn empty_table_still_has_headers() {
        let empty: Vec<EnquiryRecord> = Vec::new();
        let table = service().to_flat_rows(&empty, &enquiry_table_columns());
        assert!(table.is_empty());
        assert_eq!(service().render_csv(&table).matches("\r\n").count(), 1);
    }

    #[test]
    fn user_report_formats_rate_and_activity() {
        let ist = FixedOffset::east_opt(330 * 60).unwrap();
        let exporter = ExportService::new(ExportOptions::new("%d/%m/%Y", ist), "./fonts", "Roboto");
        let user = UserWithStats {
            account: UserAccount {
                uid: "u1".into(),
                email: "u1@dealer.in".into(),
                display_name: String::new(),
                role: Role::Admin,
                created_at: Some(Utc.with_ymd_and_hms(2025, 1, 1, 20, 0, 0).unwrap()),
            },
            total_enquiries: 2,
            active_enquiries: 1,
            converted_enquiries: 1,
            conversion_rate: Decimal::new(50, 0),
            activity: UserActivity { last_activity: None, is_active: false },
        };

        let table = exporter.to_flat_rows(&[user], &user_columns());
        let row = &table.rows[0];
        assert_eq!(row.get("Name"), Some("N/A"));
        assert_eq!(row.get("Role"), Some("admin"));
        assert_eq!(row.get("Status"), Some("Inactive"));
        assert_eq!(row.get("Conversion Rate"), Some("50.0%"));
        assert_eq!(row.get("Last Activity"), Some("Never"));
        // 20:00 UTC is already the next day in IST
        assert_eq!(row.get("Member Since"), Some("02/01/2025"));
    }

    #[test]
    fn file_names_are_date_stamped() {
        let day = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        assert_eq!(export_file_name("enquiries", day, "csv"), "enquiries_2025-06-15.csv");
        assert_eq!(export_file_name("users_report", day, "pdf"), "users_report_2025-06-15.pdf");
    }

    #[test]
    fn missing_fonts_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = ExportService::new(ExportOptions::default(), dir.path(), "Roboto");
        let table = exporter.to_flat_rows(&[record()], &enquiry_pdf_columns());

        let err = exporter
            .render_pdf(&table, "Enquiries Report", NaiveDate::from_ymd_opt(2025, 6, 15).unwrap())
            .unwrap_err();
        assert_eq!(err.code(), "font_not_found");
    }
}
