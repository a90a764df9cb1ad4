// src/main.rs

use std::fs;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use tracing_subscriber::EnvFilter;

use presales_crm::{
    common::error::AppError,
    config::AppConfig,
    db::SnapshotRepository,
    models::{enquiry::EnquiryRecord, export::FlatTable},
    services::{
        export_service::{
            enquiry_list_columns, enquiry_pdf_columns, enquiry_table_columns, export_file_name, rollup_columns,
            user_columns,
        },
        EnquiryService, ExportService, OwnerDirectory, UserService,
    },
};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let config = AppConfig::from_env().context("Failed to load report configuration")?;
    run(&config)
}

fn run(config: &AppConfig) -> anyhow::Result<()> {
    let as_of = Utc::now().with_timezone(&config.offset);
    let today = as_of.date_naive();
    let normalizer = config.normalize_service();

    // 1. Users first: they resolve owner names for the enquiries
    let users_snapshot = SnapshotRepository::new(&config.users_snapshot)
        .load()
        .with_context(|| format!("Failed to read {}", config.users_snapshot.display()))?;
    let users = normalizer.normalize_user_snapshot(&users_snapshot)?;
    let directory = OwnerDirectory::from_users(&users.records);

    // 2. Enquiries, scoped to what the requester may see
    let enquiries_snapshot = SnapshotRepository::new(&config.enquiries_snapshot)
        .load()
        .with_context(|| format!("Failed to read {}", config.enquiries_snapshot.display()))?;
    let enquiries = normalizer.normalize_enquiry_snapshot(&enquiries_snapshot, &directory)?;
    let visible: Vec<EnquiryRecord> = EnquiryService::visible_to(&enquiries.records, &config.requester)
        .into_iter()
        .cloned()
        .collect();

    tracing::info!(
        requester = %config.requester.id,
        role = %config.requester.role,
        visible = visible.len(),
        skipped = enquiries.skipped_count(),
        "Snapshot ready"
    );

    // 3. Dashboard
    let report = config
        .dashboard_service()
        .build_report(&visible, &users.records, &config.requester, as_of)?
        .with_skipped_records(enquiries.skipped_count());

    fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("Failed to create {}", config.output_dir.display()))?;
    write_output(config, &export_file_name("dashboard", today, "json"), serde_json::to_string_pretty(&report)?.as_bytes())?;

    // 4. Exports
    let exporter = config.export_service();
    let admin = config.requester.is_admin();

    let (prefix, title, columns) = if admin {
        ("enquiries", "Enquiries Report", enquiry_table_columns())
    } else {
        ("my_enquiries", "My Enquiries Report", enquiry_list_columns())
    };
    let table = exporter.to_flat_rows(&visible, &columns);
    write_output(config, &export_file_name(prefix, today, "csv"), exporter.render_csv(&table).as_bytes())?;

    let pdf_table = exporter.to_flat_rows(&visible, &enquiry_pdf_columns());
    write_pdf(config, &exporter, &pdf_table, today, prefix, title)?;

    let rollup = exporter.to_flat_rows(&report.user_rollup, &rollup_columns());
    write_output(config, &export_file_name("user_rollup", today, "csv"), exporter.render_csv(&rollup).as_bytes())?;

    if admin {
        UserService::authorize_management(&config.requester)?;
        let stats = config.user_service().users_with_stats(&users.records, &enquiries.records, as_of)?;
        let users_table = exporter.to_flat_rows(&stats, &user_columns());
        write_output(config, &export_file_name("users_report", today, "csv"), exporter.render_csv(&users_table).as_bytes())?;
        write_pdf(config, &exporter, &users_table, today, "users_report", "Users Management Report")?;
    }

    tracing::info!(output = %config.output_dir.display(), "Reports written");
    Ok(())
}

fn write_output(config: &AppConfig, file_name: &str, contents: &[u8]) -> anyhow::Result<()> {
    let path = config.output_dir.join(file_name);
    fs::write(&path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!(file = %path.display(), bytes = contents.len(), "Report file written");
    Ok(())
}

// Missing fonts only cost the PDF; the CSV of the same table is already on disk
fn write_pdf(
    config: &AppConfig,
    exporter: &ExportService,
    table: &FlatTable,
    today: NaiveDate,
    prefix: &str,
    title: &str,
) -> anyhow::Result<()> {
    match exporter.render_pdf(table, title, today) {
        Ok(bytes) => write_output(config, &export_file_name(prefix, today, "pdf"), &bytes),
        Err(AppError::FontNotFound(detail)) => {
            tracing::warn!(%detail, "Skipping PDF export, fonts not available");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}
