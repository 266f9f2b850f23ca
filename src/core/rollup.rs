//! Monthly roll-up business logic
//!
//! Compresses a past month of day records into one immutable month summary and
//! deletes the source days. The existence check, the insert and the deletes run
//! inside a single database transaction, so a crash can never leave a summary
//! next to days it already counted. Each transaction opens with a write on the
//! month key, which queues concurrent runs of the same key on `SQLite`; the
//! unique index on `(user_id, year, number)` catches any race that gets past
//! that. Either way the loser rolls back without deleting anything.

use crate::{
    core::{
        calendar::{month_range, validate_period},
        day::{delete_days, find_days_in_range},
        month::{NewMonth, create_month, lock_month_key, month_exists},
        user::{active_users, get_user_by_id},
    },
    entities::{day, month},
    errors::{Error, Result},
};
use chrono::{Datelike, Months, NaiveDate};
use sea_orm::{DatabaseConnection, TransactionTrait};
use tracing::{info, instrument, warn};

/// What a single-user roll-up did.
#[derive(Debug, Clone, PartialEq)]
pub enum RollupOutcome {
    /// A summary was stored and its day records deleted
    Created(month::Model),
    /// A summary already existed (or another run created it first)
    AlreadyRolledUp,
    /// No day records in that month; nothing stored
    NoDays,
    /// The user is archived and excluded from roll-ups
    UserArchived,
}

/// Result of rolling up one month for every active user.
#[derive(Debug, Default)]
pub struct RollupReport {
    /// Calendar year processed
    pub year: i32,
    /// Month number processed
    pub number: i32,
    /// Summaries created in this run
    pub created: Vec<month::Model>,
    /// Users that already had a summary
    pub already_rolled_up: Vec<i64>,
    /// Users with no day records for the month
    pub empty: Vec<i64>,
    /// Users archived between listing and rolling up
    pub archived: Vec<i64>,
    /// Users whose roll-up failed, with the error
    pub failures: Vec<(i64, Error)>,
}

/// Period the scheduled job targets when none is given: two months before
/// `today`, leaving the previous month open for late corrections.
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub fn default_rollup_period(today: NaiveDate) -> (i32, i32) {
    let target = today.checked_sub_months(Months::new(2)).unwrap_or(today);
    (target.year(), target.month() as i32)
}

/// Sums and counts over a month's day records.
///
/// Callers must pass a non-empty slice; a month summary always covers at
/// least one day.
pub fn aggregate_days(user_id: i64, year: i32, number: i32, days: &[day::Model]) -> Result<NewMonth> {
    let count = |predicate: fn(&day::Model) -> bool| -> Result<i32> {
        let n = days.iter().filter(|d| predicate(d)).count();
        i32::try_from(n).map_err(|_| Error::validation("day_count", format!("{n} is too large")))
    };

    Ok(NewMonth {
        user_id,
        year,
        number,
        client_hours: days.iter().map(|d| d.client_hours).sum(),
        internal_hours: days.iter().map(|d| d.internal_hours).sum(),
        day_count: count(|_| true)?,
        pto_count: count(|d| d.pto)?,
        timer_reminder_sent_count: count(|d| d.timer_reminder_sent)?,
        tracked_in_real_time_count: count(|d| d.tracked_in_real_time)?,
        workday_count: count(|d| d.workday)?,
    })
}

/// Rolls up one user's `(year, number)` month.
///
/// Safe to call repeatedly: once a summary exists, later calls are no-ops.
/// Archived users are left untouched and reported as
/// [`RollupOutcome::UserArchived`].
///
/// # Errors
/// [`Error::Validation`] for an invalid period or out-of-bound aggregate,
/// [`Error::UserNotFound`] for an unknown user, and database errors. On any
/// error nothing is persisted.
#[instrument(skip(db))]
pub async fn rollup(
    db: &DatabaseConnection,
    user_id: i64,
    year: i32,
    number: i32,
) -> Result<RollupOutcome> {
    validate_period(year, number)?;
    let (first, last) = month_range(year, number)?;

    // Summary insert and day deletion succeed or fail together
    let txn = db.begin().await?;
    lock_month_key(&txn, user_id, year, number).await?;

    let user = get_user_by_id(&txn, user_id).await?;
    if !user.is_active {
        txn.rollback().await?;
        return Ok(RollupOutcome::UserArchived);
    }

    if month_exists(&txn, user_id, year, number).await? {
        txn.rollback().await?;
        return Ok(RollupOutcome::AlreadyRolledUp);
    }

    let days = find_days_in_range(&txn, user_id, first, last).await?;
    if days.is_empty() {
        txn.rollback().await?;
        return Ok(RollupOutcome::NoDays);
    }

    let new_month = aggregate_days(user_id, year, number, &days)?;
    let created = match create_month(&txn, &new_month).await {
        Ok(created) => created,
        Err(Error::Conflict { message }) => {
            info!("Lost roll-up race, leaving days untouched: {message}");
            txn.rollback().await?;
            return Ok(RollupOutcome::AlreadyRolledUp);
        }
        Err(e) => return Err(e),
    };

    let day_ids: Vec<i64> = days.iter().map(|d| d.id).collect();
    let deleted = delete_days(&txn, &day_ids).await?;

    txn.commit().await?;

    info!(
        month_id = created.id,
        day_count = created.day_count,
        deleted,
        "Rolled up month"
    );
    Ok(RollupOutcome::Created(created))
}

/// Rolls up `(year, number)` for every active user.
///
/// A failure for one user is logged and collected; it never stops the others.
/// An invalid period is rejected up front since it would fail for everyone.
#[instrument(skip(db))]
pub async fn rollup_all(db: &DatabaseConnection, year: i32, number: i32) -> Result<RollupReport> {
    validate_period(year, number)?;

    let mut report = RollupReport {
        year,
        number,
        ..Default::default()
    };

    for user in active_users(db).await? {
        match rollup(db, user.id, year, number).await {
            Ok(RollupOutcome::Created(month)) => report.created.push(month),
            Ok(RollupOutcome::AlreadyRolledUp) => report.already_rolled_up.push(user.id),
            Ok(RollupOutcome::NoDays) => report.empty.push(user.id),
            Ok(RollupOutcome::UserArchived) => report.archived.push(user.id),
            Err(e) => {
                warn!(user_id = user.id, "Roll-up failed: {e}");
                report.failures.push((user.id, e));
            }
        }
    }

    info!(
        created = report.created.len(),
        already_rolled_up = report.already_rolled_up.len(),
        empty = report.empty.len(),
        archived = report.archived.len(),
        failures = report.failures.len(),
        "Finished monthly roll-up"
    );
    Ok(report)
}

/// Formats a roll-up report into a human-readable summary string.
#[must_use]
pub fn format_rollup_summary(report: &RollupReport, pto_day_hours: f64) -> String {
    use std::fmt::Write;

    let mut summary = format!(
        "Roll-up {}-{:02}: {} created, {} already done, {} empty, {} failed\n",
        report.year,
        report.number,
        report.created.len(),
        report.already_rolled_up.len(),
        report.empty.len(),
        report.failures.len()
    );

    // Writing to a String cannot fail
    for month in &report.created {
        let _ = writeln!(
            summary,
            "  user {} | {} days | {:.2}h total ({:.2}h PTO)",
            month.user_id,
            month.day_count,
            month.total_hours(pto_day_hours),
            month.pto_hours(pto_day_hours)
        );
    }
    for (user_id, error) in &report.failures {
        let _ = writeln!(summary, "  user {user_id} failed: {error}");
    }

    summary
}
