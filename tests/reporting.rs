// tests/reporting.rs

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use presales_crm::{
    db::SnapshotRepository,
    models::{
        enquiry::EnquiryRecord,
        user::{AuthenticatedUser, Role, UserAccount},
    },
    services::{
        dashboard_service::ADMIN_ROLLUP_LABEL,
        export_service::{enquiry_table_columns, user_columns},
        filter_service::{CategoryFilter, FilterQuery, ENQUIRY_LIST_SEARCH},
        DashboardService, EnquiryService, ExportService, NormalizeService, OwnerDirectory, StatusPolicy,
        UserService,
    },
};

fn ist() -> FixedOffset {
    FixedOffset::east_opt(330 * 60).unwrap()
}

fn as_of() -> DateTime<FixedOffset> {
    ist().with_ymd_and_hms(2025, 6, 15, 18, 0, 0).unwrap()
}

fn users_snapshot() -> Value {
    json!([
        { "uid": "anita", "email": "anita@dealer.in", "displayName": "Anita Rao", "role": "user",
          "createdAt": { "_seconds": 1735689600, "_nanoseconds": 0 } },
        { "id": "vikram", "email": "vikram@dealer.in", "displayName": "Vikram S", "role": "user" },
        { "uid": "root", "email": "owner@dealer.in", "role": "admin" }
    ])
}

fn enquiry(id: &str, owner: &str, status: &str, date: &str) -> Value {
    json!({
        "id": id,
        "customerName": format!("Customer {id}"),
        "mobileNumber": format!("98{id:0>8}"),
        "enquiryNo": format!("ENQ-{id}"),
        "enquiryStatus": status,
        "enquiryDate": date,
        "source": "Walk-in",
        "createdBy": owner,
    })
}

// Anita owns 3, Vikram owns 5
fn enquiries_snapshot() -> Value {
    let mut docs = vec![
        enquiry("1", "anita", "New", "2025-06-15"),
        enquiry("2", "anita", "Order", "2025-06-01"),
        enquiry("3", "anita", "Converted", "2025-05-31"),
        enquiry("4", "vikram", "Invoiced", "2025-06-10"),
        enquiry("5", "vikram", "Lost", "2025-04-02"),
        enquiry("6", "vikram", "Follow-up", "2025-06-14"),
        enquiry("7", "vikram", "Booking", "2025-06-03"),
    ];
    let mut with_visit = enquiry("8", "vikram", "Active", "2025-06-12");
    with_visit["testDriveAppt"] = json!(true);
    with_visit["homeVisitAppt"] = json!(true);
    with_visit["evaluationDate"] = json!("2025-06-20");
    docs.push(with_visit);
    Value::Array(docs)
}

fn load() -> (Vec<UserAccount>, Vec<EnquiryRecord>) {
    let normalizer = NormalizeService::new(ist());
    let users = normalizer.normalize_user_snapshot(&users_snapshot()).unwrap();
    let directory = OwnerDirectory::from_users(&users.records);
    let enquiries = normalizer.normalize_enquiry_snapshot(&enquiries_snapshot(), &directory).unwrap();
    assert_eq!(enquiries.skipped_count(), 0);
    (users.records, enquiries.records)
}

#[test]
fn malformed_record_is_skipped_not_fatal() {
    let mut docs: Vec<Value> = (1..=5).map(|i| enquiry(&i.to_string(), "anita", "New", "2025-06-01")).collect();
    docs[2].as_object_mut().unwrap().remove("customerName");

    let batch = NormalizeService::new(ist()).normalize_enquiries(&docs, &OwnerDirectory::default());

    assert_eq!(batch.records.len(), 4);
    assert_eq!(batch.skipped_count(), 1);
    assert_eq!(batch.skipped[0].index, 2);
    assert_eq!(batch.skipped[0].id.as_deref(), Some("3"));
}

#[test]
fn admin_rollup_adds_synthetic_row() {
    let (users, records) = load();
    let service = DashboardService::default();

    let rows = service.user_rollup(&records, &users, &AuthenticatedUser::new("root", Role::Admin));
    let summary: Vec<(&str, usize)> = rows.iter().map(|r| (r.username.as_str(), r.total_enquiry)).collect();
    assert_eq!(
        summary,
        vec![(ADMIN_ROLLUP_LABEL, 8), ("Anita Rao", 3), ("Vikram S", 5), ("owner@dealer.in", 0)]
    );
    assert_eq!(rows[0].total_booking, 1);
    assert_eq!(rows[0].total_invoice, 1);
    assert_eq!(rows[2].test_drive_appt_count, 1);
    assert_eq!(rows[2].home_visit_appt_count, 1);
    assert_eq!(rows[2].evaluation_appt_count, 1);

    let own = service.user_rollup(&records, &users, &AuthenticatedUser::new("vikram", Role::User));
    assert_eq!(own.len(), 1);
    assert_eq!(own[0].username, "Vikram S");
    assert_eq!(own[0].total_enquiry, 5);
}

#[test]
fn month_to_date_starts_on_the_first() {
    let (_, records) = load();
    let metrics = DashboardService::default().lead_metrics(&records, as_of()).unwrap();

    // Everything dated 2025-06-01..=2025-06-15: ids 1, 2, 4, 6, 7, 8
    assert_eq!(metrics.mtd_leads, 6);
    assert_eq!(metrics.today_leads, 1);
    assert_eq!(metrics.total_leads_generated, 7);
    assert_eq!(metrics.total_booking, 1);
}

#[test]
fn single_record_lands_in_several_buckets() {
    let record = NormalizeService::new(ist())
        .normalize_enquiry(&enquiry("1", "anita", "New", "2025-06-15"), &OwnerDirectory::default())
        .unwrap();
    let records = vec![record];
    let service = DashboardService::new(StatusPolicy::ACTIVE_INCLUDES_NEW);

    assert_eq!(service.lead_metrics(&records, as_of()).unwrap().today_leads, 1);
    let stats = service.dashboard_stats(&records, as_of()).unwrap();
    assert_eq!((stats.active_count, stats.pending_count), (1, 1));
}

#[test]
fn empty_snapshot_is_all_zero() {
    let service = DashboardService::default();
    let report = service
        .build_report(&[], &[], &AuthenticatedUser::new("root", Role::Admin), as_of())
        .unwrap();

    assert_eq!(report.stats.total, 0);
    assert_eq!(report.lead_metrics.mtd_leads, 0);
    assert!(report.status_distribution.is_empty());
    assert!(report.recent_enquiries.is_empty());
    // Only the synthetic admin row, with nothing in it
    assert_eq!(report.user_rollup.len(), 1);
    assert_eq!(report.user_rollup[0].total_enquiry, 0);
}

#[test]
fn status_distribution_covers_known_statuses_only() {
    let (_, records) = load();
    let known = ["New", "Active", "Follow-up", "In Progress", "Closed", "Converted", "Lost"];

    let slices = DashboardService::default().status_distribution(&records);
    let charted: usize = slices.iter().map(|s| s.count).sum();
    let expected = records.iter().filter(|r| known.contains(&r.enquiry_status.as_str())).count();

    assert_eq!(charted, expected);
    assert!(slices.iter().all(|s| s.count > 0));
}

#[test]
fn activity_window_boundary() {
    let just_outside = as_of() - Duration::days(30) - Duration::seconds(1);
    let inside = as_of() - Duration::days(29);

    let mut docs = vec![
        enquiry("1", "anita", "New", "2025-05-01"),
        enquiry("2", "vikram", "New", "2025-05-01"),
    ];
    docs[0]["updatedAt"] = json!({ "_seconds": just_outside.timestamp(), "_nanoseconds": 0 });
    docs[1]["updatedAt"] = json!({ "seconds": inside.timestamp(), "nanoseconds": 0 });

    let normalizer = NormalizeService::new(ist());
    let users = normalizer.normalize_user_snapshot(&users_snapshot()).unwrap().records;
    let records = normalizer
        .normalize_enquiries(&docs, &OwnerDirectory::from_users(&users))
        .records;

    let stats = UserService::default().users_with_stats(&users[..2], &records, as_of()).unwrap();
    assert!(!stats[0].activity.is_active);
    assert!(stats[1].activity.is_active);
}

#[test]
fn aggregations_are_repeatable_and_leave_input_alone() {
    let (users, records) = load();
    let before = records.clone();
    let admin = AuthenticatedUser::new("root", Role::Admin);
    let service = DashboardService::default();

    let first = service.build_report(&records, &users, &admin, as_of()).unwrap();
    let second = service.build_report(&records, &users, &admin, as_of()).unwrap();
    assert_eq!(first, second);

    let exporter = ExportService::new(Default::default(), "./fonts", "Roboto");
    let query = FilterQuery { term: "customer".to_string(), category: CategoryFilter::parse("New") };
    let filtered = query.apply_enquiries(&records, ENQUIRY_LIST_SEARCH);
    let stats = UserService::default().users_with_stats(&users, &records, as_of()).unwrap();
    let table = exporter.to_flat_rows(&records, &enquiry_table_columns());

    // Only id 1 is New
    assert_eq!(filtered.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), vec!["1"]);
    assert_eq!(stats.len(), 3);
    assert_eq!(table.len(), 8);

    assert_eq!(records, before);
}

#[test]
fn each_screen_keeps_its_own_active_partition() {
    let (users, records) = load();
    let service = DashboardService::default();

    // Active statuses in the snapshot: New (1), Follow-up (6), Active (8)
    assert_eq!(service.dashboard_stats(&records, as_of()).unwrap().active_count, 3);
    assert_eq!(service.report_summary(&records).active, 2);

    let strict = DashboardService::new(StatusPolicy::ACTIVE_EXCLUDES_NEW);
    assert_eq!(strict.dashboard_stats(&records, as_of()).unwrap().active_count, 2);
    assert_eq!(strict.report_summary(&records).active, 2);

    let stats = UserService::default().users_with_stats(&users, &records, as_of()).unwrap();
    let active: Vec<usize> = stats.iter().map(|s| s.active_enquiries).collect();
    assert_eq!(active, vec![1, 2, 0]);
}

#[test]
fn owner_without_enquiries_has_no_activity() {
    let normalizer = NormalizeService::new(ist());
    let joined = as_of() - Duration::days(1);
    let mut snapshot = users_snapshot();
    snapshot[2]["createdAt"] = json!({ "_seconds": joined.timestamp(), "_nanoseconds": 0 });
    let users = normalizer.normalize_user_snapshot(&snapshot).unwrap().records;
    let (_, records) = load();

    let stats = UserService::default().users_with_stats(&users, &records, as_of()).unwrap();
    assert_eq!(stats[2].total_enquiries, 0);
    assert_eq!(stats[2].activity.last_activity, None);
    assert!(!stats[2].activity.is_active);

    let exporter = ExportService::new(Default::default(), "./fonts", "Roboto");
    let table = exporter.to_flat_rows(&stats, &user_columns());
    assert_eq!(table.rows[2].get("Last Activity"), Some("Never"));
    assert_eq!(table.rows[2].get("Status"), Some("Inactive"));
}

#[test]
fn export_rows_are_stable() {
    let (users, records) = load();
    let exporter = ExportService::new(Default::default(), "./fonts", "Roboto");

    let first = exporter.to_flat_rows(&records, &enquiry_table_columns());
    let second = exporter.to_flat_rows(&records, &enquiry_table_columns());
    assert_eq!(first, second);
    assert_eq!(exporter.render_csv(&first), exporter.render_csv(&second));
    assert_eq!(first.rows[0].get("User Name"), Some("Anita Rao"));

    let stats = UserService::default().users_with_stats(&users, &records, as_of()).unwrap();
    let table = exporter.to_flat_rows(&stats, &user_columns());
    assert_eq!(table.rows[0].get("Conversion Rate"), Some("33.3%"));
}

#[test]
fn user_view_only_sees_own_enquiries() {
    let (users, records) = load();
    let anita = AuthenticatedUser::new("anita", Role::User);

    let visible: Vec<EnquiryRecord> = EnquiryService::visible_to(&records, &anita).into_iter().cloned().collect();
    let report = DashboardService::default().build_report(&visible, &users, &anita, as_of()).unwrap();

    assert_eq!(report.stats.total, 3);
    assert_eq!(report.user_rollup.len(), 1);
    assert!(UserService::authorize_management(&anita).is_err());
}

#[test]
fn report_serializes_in_camel_case() {
    let (users, records) = load();
    let report = DashboardService::default()
        .build_report(&records, &users, &AuthenticatedUser::new("root", Role::Admin), as_of())
        .unwrap()
        .with_skipped_records(2);

    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["skippedRecords"], json!(2));
    assert_eq!(value["leadMetrics"]["mtdLeads"], json!(6));
    assert_eq!(value["userRollup"][0]["username"], json!(ADMIN_ROLLUP_LABEL));
    assert_eq!(value["recentEnquiries"].as_array().map(Vec::len), Some(5));
    assert_eq!(value["summary"]["conversionRate"], json!(12.5));
}

#[test]
fn keyed_snapshot_files_feed_the_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("enquiries.json");
    std::fs::write(
        &path,
        json!({
            "docA": { "customerName": "Lata", "mobileNumber": "9000000001", "enquiryStatus": "New",
                      "enquiryDate": "06/14/2025", "createdBy": "ghost" },
            "docB": { "customerName": "Mohan", "mobileNumber": "9000000002", "enquiryStatus": "Active",
                      "enquiryDate": "not a date" }
        })
        .to_string(),
    )
    .unwrap();

    let snapshot = SnapshotRepository::new(&path).load().unwrap();
    let batch = NormalizeService::new(ist())
        .normalize_enquiry_snapshot(&snapshot, &OwnerDirectory::default())
        .unwrap();

    assert_eq!(batch.records.len(), 1);
    assert_eq!(batch.records[0].id, "docA");
    assert_eq!(batch.records[0].enquiry_date, NaiveDate::from_ymd_opt(2025, 6, 14).unwrap());
    // Dangling owner keeps the raw id as its name
    assert_eq!(batch.records[0].created_by_name, "ghost");
    assert_eq!(batch.skipped_count(), 1);
}
