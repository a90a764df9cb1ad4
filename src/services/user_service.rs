// src/services/user_service.rs

use std::collections::HashMap;

use chrono::{DateTime, Duration, FixedOffset};

use crate::{
    common::error::AppError,
    models::{
        enquiry::{status, EnquiryRecord},
        user::{AuthenticatedUser, UserAccount, UserActivity, UserWithStats},
    },
    services::dashboard_service::{ensure_as_of, percentage, StatusPolicy},
};

// A user is active while their latest touch is strictly younger than this
const ACTIVITY_WINDOW_DAYS: i64 = 30;

// User management counts `New` as active regardless of the dashboard setting
const USER_STATS_POLICY: StatusPolicy = StatusPolicy::ACTIVE_INCLUDES_NEW;

#[derive(Debug, Clone, Copy, Default)]
pub struct UserService;

impl UserService {
    pub fn new() -> Self {
        Self
    }

    /// Latest create/update stamp over `owned`. A user who owns nothing has
    /// no activity and is never active.
    pub fn user_activity(
        &self,
        user: &UserAccount,
        owned: &[&EnquiryRecord],
        as_of: DateTime<FixedOffset>,
    ) -> Result<UserActivity, AppError> {
        let as_of = ensure_as_of(as_of)?;

        let last_activity = owned
            .iter()
            .filter_map(|record| record.last_touched())
            .max();

        let is_active = last_activity
            .is_some_and(|last| as_of.signed_duration_since(last) < Duration::days(ACTIVITY_WINDOW_DAYS));

        Ok(UserActivity { last_activity, is_active })
    }

    pub fn users_with_stats(
        &self,
        users: &[UserAccount],
        records: &[EnquiryRecord],
        as_of: DateTime<FixedOffset>,
    ) -> Result<Vec<UserWithStats>, AppError> {
        let mut by_owner: HashMap<&str, Vec<&EnquiryRecord>> = HashMap::new();
        for record in records {
            by_owner.entry(record.created_by.as_str()).or_default().push(record);
        }

        let empty = Vec::new();
        let stats = users
            .iter()
            .map(|user| {
                let owned = by_owner.get(user.uid.as_str()).unwrap_or(&empty);
                let total = owned.len();
                let converted = owned.iter().filter(|r| r.has_status(status::CONVERTED)).count();

                Ok(UserWithStats {
                    account: user.clone(),
                    total_enquiries: total,
                    active_enquiries: owned.iter().filter(|r| USER_STATS_POLICY.is_active(r)).count(),
                    converted_enquiries: converted,
                    conversion_rate: percentage(converted, total),
                    activity: self.user_activity(user, owned, as_of)?,
                })
            })
            .collect::<Result<Vec<_>, AppError>>()?;

        tracing::debug!(users = stats.len(), "User stats computed");
        Ok(stats)
    }

    /// The user management screen is admin-only.
    pub fn authorize_management(requester: &AuthenticatedUser) -> Result<(), AppError> {
        if requester.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden("user management requires the admin role".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Role;
    use chrono::{NaiveDate, TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    fn account(uid: &str, created_at: Option<DateTime<chrono::Utc>>) -> UserAccount {
        UserAccount {
            uid: uid.into(),
            email: format!("{uid}@dealer.in"),
            display_name: uid.to_uppercase(),
            role: Role::User,
            created_at,
        }
    }

    fn record(owner: &str, status: &str, touched: Option<DateTime<Utc>>) -> EnquiryRecord {
        EnquiryRecord {
            id: format!("{owner}-{status}"),
            customer_name: "Dev".into(),
            mobile_number: "9000000002".into(),
            enquiry_no: String::new(),
            office_phone: String::new(),
            email_id: String::new(),
            address: String::new(),
            pin_code: String::new(),
            company_institution: String::new(),
            team_lead_name: String::new(),
            dse_name: String::new(),
            enquiry_status: status.into(),
            lead_status: String::new(),
            source: String::new(),
            buyer_type: String::new(),
            model_name: String::new(),
            variant_name: String::new(),
            colour_name: String::new(),
            enquiry_date: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
            test_drive_appt: false,
            test_drive_date: None,
            home_visit_appt: false,
            evaluation_date: None,
            next_follow_up_date: None,
            lost_or_drop_reason: String::new(),
            feedback_remarks: Vec::new(),
            created_by: owner.into(),
            created_by_name: owner.into(),
            created_at: touched,
            updated_at: None,
        }
    }

    fn as_of() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0).unwrap().with_ymd_and_hms(2025, 6, 30, 12, 0, 0).unwrap()
    }

    #[test]
    fn activity_window_is_exclusive_at_thirty_days() {
        let service = UserService::default();
        let user = account("u1", None);
        let exactly_thirty = as_of().with_timezone(&Utc) - Duration::days(30);
        let just_inside = exactly_thirty + Duration::seconds(1);

        let stale = record("u1", "New", Some(exactly_thirty));
        let activity = service.user_activity(&user, &[&stale], as_of()).unwrap();
        assert_eq!(activity.last_activity, Some(exactly_thirty));
        assert!(!activity.is_active);

        let fresh = record("u1", "New", Some(just_inside));
        assert!(service.user_activity(&user, &[&fresh], as_of()).unwrap().is_active);
    }

    #[test]
    fn no_owned_enquiries_means_no_activity() {
        let service = UserService::default();
        // Signed up the day before: still not active without any enquiry
        let joined = Utc.with_ymd_and_hms(2025, 6, 29, 0, 0, 0).unwrap();

        let activity = service.user_activity(&account("u1", Some(joined)), &[], as_of()).unwrap();
        assert_eq!(activity, UserActivity { last_activity: None, is_active: false });

        let nothing = service.user_activity(&account("u2", None), &[], as_of()).unwrap();
        assert_eq!(nothing, UserActivity { last_activity: None, is_active: false });
    }

    #[test]
    fn stats_count_owned_records_only() {
        let touched = Utc.with_ymd_and_hms(2025, 6, 25, 9, 0, 0).unwrap();
        let users = vec![account("u1", None), account("u2", None)];
        let records = vec![
            record("u1", "Converted", Some(touched)),
            record("u1", "New", None),
            record("u1", "Lost", None),
            record("u3", "Converted", None),
        ];

        let stats = UserService::default().users_with_stats(&users, &records, as_of()).unwrap();

        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].total_enquiries, 3);
        assert_eq!(stats[0].active_enquiries, 1);
        assert_eq!(stats[0].converted_enquiries, 1);
        assert_eq!(stats[0].conversion_rate, Decimal::new(333, 1));
        assert!(stats[0].activity.is_active);
        assert_eq!(stats[1].total_enquiries, 0);
        assert_eq!(stats[1].conversion_rate, Decimal::ZERO);
        assert_eq!(stats[1].activity_label(), "inactive");
    }

    #[test]
    fn user_stats_count_new_as_active() {
        let users = vec![account("u1", None)];
        let records = vec![record("u1", "New", None), record("u1", "Active", None), record("u1", "Closed", None)];

        let stats = UserService::new().users_with_stats(&users, &records, as_of()).unwrap();
        assert_eq!(stats[0].active_enquiries, 2);
    }

    #[test]
    fn management_is_admin_only() {
        assert!(UserService::authorize_management(&AuthenticatedUser::new("a", Role::Admin)).is_ok());
        assert_eq!(
            UserService::authorize_management(&AuthenticatedUser::new("u", Role::User)).unwrap_err().code(),
            "forbidden"
        );
    }
}
