//! Timer reminder dispatch.
//!
//! Called many times a day by an external scheduler, once per time zone. Each
//! call reminds every active user in that zone who has a workday record for
//! today with no hours on it, is not on PTO, and has not been reminded yet.
//! The persisted `timer_reminder_sent` flag is the only dedup mechanism, so
//! re-running or running zones in parallel from separate processes is safe.

use crate::{
    config::Settings,
    core::{
        calendar::{local_today, parse_time_zone, threshold_passed},
        day::{find_day, mark_reminder_sent},
        user::{active_users_in_time_zone, time_zones},
    },
    entities::{day, user},
    errors::{Error, Result},
    notify::{Notifier, Template},
};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::DatabaseConnection;
use tracing::{debug, info, instrument, warn};

/// Why a user was not reminded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The tracking integration has not produced a record for today
    NoDayRecord,
    /// The day is paid time off
    Pto,
    /// Today is not one of the user's workdays
    NotWorkday,
    /// Some hours are already on the day
    AlreadyTracked,
    /// A reminder already went out today
    AlreadyReminded,
}

/// Outcome for a single user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderOutcome {
    /// The reminder was delivered and the day flagged
    Reminded,
    /// No reminder was due
    Skipped(SkipReason),
}

/// Result of one dispatch run for one zone and date.
#[derive(Debug)]
pub struct DispatchReport {
    /// Zone the run was for
    pub time_zone: String,
    /// "Today" in that zone
    pub reference_date: NaiveDate,
    /// False when the run stopped early because the local threshold was not reached
    pub threshold_passed: bool,
    /// Users reminded in this run
    pub reminded: Vec<i64>,
    /// Users considered but not reminded
    pub skipped: Vec<(i64, SkipReason)>,
    /// Users whose processing failed; their day stays unflagged
    pub failures: Vec<(i64, Error)>,
}

impl DispatchReport {
    fn new(time_zone: &str, reference_date: NaiveDate, threshold_passed: bool) -> Self {
        Self {
            time_zone: time_zone.to_string(),
            reference_date,
            threshold_passed,
            reminded: Vec::new(),
            skipped: Vec::new(),
            failures: Vec::new(),
        }
    }
}

/// Result of sweeping every zone that has active users.
#[derive(Debug, Default)]
pub struct SweepReport {
    /// One report per zone that could be processed
    pub reports: Vec<DispatchReport>,
    /// Zones that could not be processed at all
    pub failures: Vec<(String, Error)>,
}

impl SweepReport {
    /// Total reminders sent across all zones.
    #[must_use]
    pub fn reminded_count(&self) -> usize {
        self.reports.iter().map(|r| r.reminded.len()).sum()
    }
}

/// Decides whether an existing day record still needs a reminder.
///
/// Checks run in a fixed order so the reported reason is stable.
#[must_use]
pub fn skip_reason(day: &day::Model) -> Option<SkipReason> {
    if day.pto {
        Some(SkipReason::Pto)
    } else if !day.workday {
        Some(SkipReason::NotWorkday)
    } else if day.tracked_hours() > 0.0 {
        Some(SkipReason::AlreadyTracked)
    } else if day.timer_reminder_sent {
        Some(SkipReason::AlreadyReminded)
    } else {
        None
    }
}

/// Reminds one user for `reference_date` if due.
///
/// The flag is only written after the notifier accepted the message. A
/// delivery error leaves the day untouched so the next run retries.
pub async fn remind_user(
    db: &DatabaseConnection,
    notifier: &dyn Notifier,
    user: &user::Model,
    reference_date: NaiveDate,
) -> Result<ReminderOutcome> {
    let Some(day) = find_day(db, user.id, reference_date).await? else {
        return Ok(ReminderOutcome::Skipped(SkipReason::NoDayRecord));
    };
    if let Some(reason) = skip_reason(&day) {
        return Ok(ReminderOutcome::Skipped(reason));
    }

    notifier.send(&user.email, Template::TimerReminder).await?;

    if !mark_reminder_sent(db, day.id).await? {
        debug!(user_id = user.id, day_id = day.id, "Day was flagged by a concurrent run");
    }
    Ok(ReminderOutcome::Reminded)
}

/// Sends timer reminders for one zone and date.
///
/// Does nothing until the local clock in `time_zone` reaches
/// `settings.threshold` on `reference_date`. Per-user failures are collected
/// in the report and do not stop the run.
///
/// # Errors
/// [`Error::InvalidTimeZone`] for an unknown zone and database errors while
/// listing users.
#[instrument(skip(db, notifier, settings))]
pub async fn dispatch(
    db: &DatabaseConnection,
    notifier: &dyn Notifier,
    settings: &Settings,
    time_zone: &str,
    reference_date: NaiveDate,
    now: DateTime<Utc>,
) -> Result<DispatchReport> {
    let tz = parse_time_zone(time_zone)?;

    if !threshold_passed(now, tz, reference_date, settings.threshold) {
        debug!("Reminder threshold not reached yet");
        return Ok(DispatchReport::new(time_zone, reference_date, false));
    }

    let mut report = DispatchReport::new(time_zone, reference_date, true);

    for user in active_users_in_time_zone(db, time_zone).await? {
        match remind_user(db, notifier, &user, reference_date).await {
            Ok(ReminderOutcome::Reminded) => {
                info!(user_id = user.id, "Sent timer reminder");
                report.reminded.push(user.id);
            }
            Ok(ReminderOutcome::Skipped(reason)) => {
                debug!(user_id = user.id, ?reason, "No reminder due");
                report.skipped.push((user.id, reason));
            }
            Err(e) => {
                warn!(user_id = user.id, "Timer reminder failed: {e}");
                report.failures.push((user.id, e));
            }
        }
    }

    info!(
        reminded = report.reminded.len(),
        skipped = report.skipped.len(),
        failures = report.failures.len(),
        "Finished reminder dispatch"
    );
    Ok(report)
}

/// [`dispatch`] using the wall clock, with today's date in `time_zone`.
pub async fn dispatch_now(
    db: &DatabaseConnection,
    notifier: &dyn Notifier,
    settings: &Settings,
    time_zone: &str,
) -> Result<DispatchReport> {
    let now = Utc::now();
    let reference_date = local_today(now, parse_time_zone(time_zone)?);
    dispatch(db, notifier, settings, time_zone, reference_date, now).await
}

/// Runs [`dispatch`] for every zone that has active users, each with its own
/// local date at `now`.
///
/// One hourly cron entry calling this covers every zone. A zone that fails
/// entirely (e.g. an unparseable name left in the table) is recorded and the
/// sweep moves on.
#[instrument(skip(db, notifier, settings))]
pub async fn dispatch_all_zones(
    db: &DatabaseConnection,
    notifier: &dyn Notifier,
    settings: &Settings,
    now: DateTime<Utc>,
) -> Result<SweepReport> {
    let mut sweep = SweepReport::default();

    for zone in time_zones(db).await? {
        let result = match parse_time_zone(&zone) {
            Ok(tz) => dispatch(db, notifier, settings, &zone, local_today(now, tz), now).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(report) => sweep.reports.push(report),
            Err(e) => {
                warn!(time_zone = %zone, "Reminder dispatch failed: {e}");
                sweep.failures.push((zone, e));
            }
        }
    }

    Ok(sweep)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::day::get_day;
    use crate::test_utils::*;
    use chrono::TimeZone;

    const CAIRO: &str = "Africa/Cairo";
    const ALASKA: &str = "America/Anchorage";

    fn today() -> NaiveDate {
        test_date(2026, 1, 15)
    }

    /// 20:00 UTC: 22:00 in Cairo, 11:00 in Anchorage
    fn evening() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 20, 0, 0).unwrap()
    }

    /// 06:00 UTC: 08:00 in Cairo
    fn early_morning() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 6, 0, 0).unwrap()
    }

    #[test]
    fn test_skip_reason_order() {
        let base = day::Model {
            id: 1,
            user_id: 1,
            date: today(),
            client_hours: 0.0,
            internal_hours: 0.0,
            pto: false,
            timer_reminder_sent: false,
            tracked_in_real_time: false,
            workday: true,
        };
        assert_eq!(skip_reason(&base), None);

        let pto = day::Model {
            pto: true,
            workday: false,
            client_hours: 3.0,
            timer_reminder_sent: true,
            ..base.clone()
        };
        assert_eq!(skip_reason(&pto), Some(SkipReason::Pto));

        let weekend = day::Model {
            workday: false,
            ..base.clone()
        };
        assert_eq!(skip_reason(&weekend), Some(SkipReason::NotWorkday));

        let internal = day::Model {
            internal_hours: 1.0,
            ..base.clone()
        };
        assert_eq!(skip_reason(&internal), Some(SkipReason::AlreadyTracked));

        let reminded = day::Model {
            timer_reminder_sent: true,
            ..base
        };
        assert_eq!(skip_reason(&reminded), Some(SkipReason::AlreadyReminded));
    }

    #[tokio::test]
    async fn test_reminds_only_users_without_hours() -> Result<()> {
        let db = setup_test_db().await?;
        let notifier = RecordingNotifier::default();
        let john = create_test_user(&db, "john@example.com", CAIRO).await?;
        let jane = create_test_user(&db, "jane@example.com", CAIRO).await?;
        record_test_day(&db, john.id, today(), 0.0, 1.0, false).await?;
        record_test_day(&db, jane.id, today(), 0.0, 0.0, false).await?;

        let report =
            dispatch(&db, &notifier, &test_settings(), CAIRO, today(), evening()).await?;

        assert!(report.threshold_passed);
        assert_eq!(report.reminded, vec![jane.id]);
        assert_eq!(report.skipped, vec![(john.id, SkipReason::AlreadyTracked)]);
        assert_eq!(
            notifier.sent(),
            vec![("jane@example.com".to_string(), Template::TimerReminder)]
        );
        assert!(!get_day(&db, john.id, today()).await?.timer_reminder_sent);
        assert!(get_day(&db, jane.id, today()).await?.timer_reminder_sent);

        Ok(())
    }

    #[tokio::test]
    async fn test_only_reminds_users_in_requested_zone() -> Result<()> {
        let db = setup_test_db().await?;
        let notifier = RecordingNotifier::default();
        let cairo = create_test_user(&db, "cairo@example.com", CAIRO).await?;
        let alaska = create_test_user(&db, "alaska@example.com", ALASKA).await?;
        record_test_day(&db, cairo.id, today(), 0.0, 0.0, false).await?;
        record_test_day(&db, alaska.id, today(), 0.0, 0.0, false).await?;

        let report =
            dispatch(&db, &notifier, &test_settings(), ALASKA, today(), evening()).await?;

        assert_eq!(report.reminded, vec![alaska.id]);
        assert_eq!(notifier.sent_to("cairo@example.com"), 0);
        assert_eq!(notifier.sent_to("alaska@example.com"), 1);
        assert!(!get_day(&db, cairo.id, today()).await?.timer_reminder_sent);
        assert!(get_day(&db, alaska.id, today()).await?.timer_reminder_sent);

        Ok(())
    }

    #[tokio::test]
    async fn test_nothing_happens_before_threshold() -> Result<()> {
        let db = setup_test_db().await?;
        let notifier = RecordingNotifier::default();
        let user = create_test_user(&db, "john@example.com", CAIRO).await?;
        record_test_day(&db, user.id, today(), 0.0, 0.0, false).await?;

        let report =
            dispatch(&db, &notifier, &test_settings(), CAIRO, today(), early_morning()).await?;

        assert!(!report.threshold_passed);
        assert!(report.reminded.is_empty());
        assert!(report.skipped.is_empty());
        assert!(notifier.sent().is_empty());
        assert!(!get_day(&db, user.id, today()).await?.timer_reminder_sent);

        Ok(())
    }

    #[tokio::test]
    async fn test_only_one_reminder_per_day() -> Result<()> {
        let db = setup_test_db().await?;
        let notifier = RecordingNotifier::default();
        let user = create_test_user(&db, "john@example.com", CAIRO).await?;
        record_test_day(&db, user.id, today(), 0.0, 0.0, false).await?;

        dispatch(&db, &notifier, &test_settings(), CAIRO, today(), evening()).await?;
        assert_eq!(notifier.sent_to("john@example.com"), 1);

        let second =
            dispatch(&db, &notifier, &test_settings(), CAIRO, today(), evening()).await?;
        assert_eq!(notifier.sent_to("john@example.com"), 1);
        assert_eq!(second.skipped, vec![(user.id, SkipReason::AlreadyReminded)]);

        Ok(())
    }

    #[tokio::test]
    async fn test_no_reminder_on_pto_day() -> Result<()> {
        let db = setup_test_db().await?;
        let notifier = RecordingNotifier::default();
        let user = create_test_user(&db, "john@example.com", CAIRO).await?;
        record_test_day(&db, user.id, today(), 0.0, 0.0, true).await?;

        let report =
            dispatch(&db, &notifier, &test_settings(), CAIRO, today(), evening()).await?;

        assert!(notifier.sent().is_empty());
        assert_eq!(report.skipped, vec![(user.id, SkipReason::Pto)]);
        assert!(!get_day(&db, user.id, today()).await?.timer_reminder_sent);

        Ok(())
    }

    #[tokio::test]
    async fn test_no_reminder_on_non_workday() -> Result<()> {
        let db = setup_test_db().await?;
        let notifier = RecordingNotifier::default();
        let john = create_test_user(&db, "john@example.com", CAIRO).await?;
        let jane = create_test_user(&db, "jane@example.com", CAIRO).await?;
        record_workday_flagged_day(&db, john.id, today(), true).await?;
        record_workday_flagged_day(&db, jane.id, today(), false).await?;

        dispatch(&db, &notifier, &test_settings(), CAIRO, today(), evening()).await?;

        assert_eq!(notifier.sent_to("john@example.com"), 1);
        assert_eq!(notifier.sent_to("jane@example.com"), 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_no_reminder_without_day_record() -> Result<()> {
        let db = setup_test_db().await?;
        let notifier = RecordingNotifier::default();
        let user = create_test_user(&db, "john@example.com", CAIRO).await?;

        let report =
            dispatch(&db, &notifier, &test_settings(), CAIRO, today(), evening()).await?;

        assert!(notifier.sent().is_empty());
        assert_eq!(report.skipped, vec![(user.id, SkipReason::NoDayRecord)]);
        assert!(find_day(&db, user.id, today()).await?.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_archived_users_are_not_reminded() -> Result<()> {
        let db = setup_test_db().await?;
        let notifier = RecordingNotifier::default();
        let user = create_test_user(&db, "john@example.com", CAIRO).await?;
        record_test_day(&db, user.id, today(), 0.0, 0.0, false).await?;
        crate::core::user::archive_user(&db, user.id).await?;

        let report =
            dispatch(&db, &notifier, &test_settings(), CAIRO, today(), evening()).await?;

        assert!(report.reminded.is_empty());
        assert!(report.skipped.is_empty());
        assert!(notifier.sent().is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_delivery_failure_leaves_flag_unset() -> Result<()> {
        let db = setup_test_db().await?;
        let notifier = RecordingNotifier::failing_for(&["john@example.com"]);
        let john = create_test_user(&db, "john@example.com", CAIRO).await?;
        let jane = create_test_user(&db, "jane@example.com", CAIRO).await?;
        record_test_day(&db, john.id, today(), 0.0, 0.0, false).await?;
        record_test_day(&db, jane.id, today(), 0.0, 0.0, false).await?;

        let report =
            dispatch(&db, &notifier, &test_settings(), CAIRO, today(), evening()).await?;

        assert_eq!(report.reminded, vec![jane.id]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, john.id);
        assert!(matches!(report.failures[0].1, Error::Delivery { .. }));
        assert!(!get_day(&db, john.id, today()).await?.timer_reminder_sent);
        assert!(get_day(&db, jane.id, today()).await?.timer_reminder_sent);

        // Next run retries once delivery works again
        let healthy = RecordingNotifier::default();
        let retry = dispatch(&db, &healthy, &test_settings(), CAIRO, today(), evening()).await?;
        assert_eq!(retry.reminded, vec![john.id]);
        assert_eq!(healthy.sent_to("jane@example.com"), 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_zone_is_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        let notifier = RecordingNotifier::default();

        assert!(matches!(
            dispatch(&db, &notifier, &test_settings(), "Foo Bar", today(), evening()).await,
            Err(Error::InvalidTimeZone { .. })
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_dispatch_all_zones_uses_local_dates() -> Result<()> {
        let db = setup_test_db().await?;
        let notifier = RecordingNotifier::default();
        let cairo = create_test_user(&db, "cairo@example.com", CAIRO).await?;
        let alaska = create_test_user(&db, "alaska@example.com", ALASKA).await?;

        // 2026-01-15 23:30 UTC: already Jan 16 01:30 in Cairo, Jan 15 14:30 in Anchorage
        let now = Utc.with_ymd_and_hms(2026, 1, 15, 23, 30, 0).unwrap();
        record_test_day(&db, cairo.id, test_date(2026, 1, 16), 0.0, 0.0, false).await?;
        record_test_day(&db, alaska.id, test_date(2026, 1, 15), 0.0, 0.0, false).await?;

        let sweep = dispatch_all_zones(&db, &notifier, &test_settings(), now).await?;

        assert!(sweep.failures.is_empty());
        assert_eq!(sweep.reports.len(), 2);
        // Cairo's local 01:30 has not reached the 10:00 threshold
        assert_eq!(sweep.reminded_count(), 1);
        assert_eq!(notifier.sent_to("alaska@example.com"), 1);
        assert_eq!(notifier.sent_to("cairo@example.com"), 0);

        Ok(())
    }
}
