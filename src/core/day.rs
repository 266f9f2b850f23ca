//! Day store - Daily activity records keyed by user and date.
//!
//! The reminder dispatcher reads days and flips `timer_reminder_sent`; the
//! roll-up reads a month of days and deletes them. Both go through here.

use crate::{
    core::user::get_user_by_id,
    entities::{Day, day},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, SqlErr, prelude::*, sea_query::Expr};

/// Hours must stay below this bound.
pub const MAX_HOURS: f64 = 1000.0;

/// Fields the tracking integration supplies for a new day.
#[derive(Debug, Clone)]
pub struct NewDay {
    /// Owner of the record
    pub user_id: i64,
    /// Calendar date
    pub date: Date,
    /// Hours billed to clients
    pub client_hours: f64,
    /// Internal hours
    pub internal_hours: f64,
    /// Paid time off
    pub pto: bool,
    /// Logged with a running timer
    pub tracked_in_real_time: bool,
    /// Explicit workday flag; `None` captures it from the user's schedule
    pub workday: Option<bool>,
}

/// Checks `0 <= hours < 1000`.
pub(crate) fn validate_hours(field: &'static str, hours: f64) -> Result<()> {
    if !hours.is_finite() || hours < 0.0 || hours >= MAX_HOURS {
        return Err(Error::validation(
            field,
            format!("must be at least 0 and less than {MAX_HOURS}, got {hours}"),
        ));
    }
    Ok(())
}

/// The day record for `user_id` on `date`, if one exists.
pub async fn find_day<C>(db: &C, user_id: i64, date: Date) -> Result<Option<day::Model>>
where
    C: ConnectionTrait,
{
    Day::find()
        .filter(day::Column::UserId.eq(user_id))
        .filter(day::Column::Date.eq(date))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Like [`find_day`] but a missing record is an error.
pub async fn get_day<C>(db: &C, user_id: i64, date: Date) -> Result<day::Model>
where
    C: ConnectionTrait,
{
    find_day(db, user_id, date)
        .await?
        .ok_or(Error::DayNotFound { user_id, date })
}

/// Day records for `user_id` with `start <= date <= end`, oldest first.
pub async fn find_days_in_range<C>(
    db: &C,
    user_id: i64,
    start: Date,
    end: Date,
) -> Result<Vec<day::Model>>
where
    C: ConnectionTrait,
{
    Day::find()
        .filter(day::Column::UserId.eq(user_id))
        .filter(day::Column::Date.between(start, end))
        .order_by_asc(day::Column::Date)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Stores a new day record.
///
/// Unless the caller says otherwise, the `workday` flag is taken from the
/// user's weekly schedule at this moment and never recomputed.
pub async fn record_day<C>(db: &C, new_day: NewDay) -> Result<day::Model>
where
    C: ConnectionTrait,
{
    validate_hours("client_hours", new_day.client_hours)?;
    validate_hours("internal_hours", new_day.internal_hours)?;

    let owner = get_user_by_id(db, new_day.user_id).await?;
    let workday = new_day
        .workday
        .unwrap_or_else(|| owner.works_on(new_day.date));

    let model = day::ActiveModel {
        user_id: Set(owner.id),
        date: Set(new_day.date),
        client_hours: Set(new_day.client_hours),
        internal_hours: Set(new_day.internal_hours),
        pto: Set(new_day.pto),
        timer_reminder_sent: Set(false),
        tracked_in_real_time: Set(new_day.tracked_in_real_time),
        workday: Set(workday),
        ..Default::default()
    };

    model.insert(db).await.map_err(|e| {
        if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
            Error::validation(
                "date",
                format!("user {} already has a record for {}", owner.id, new_day.date),
            )
        } else {
            e.into()
        }
    })
}

/// Sets `timer_reminder_sent` on a day that does not have it yet.
///
/// The `WHERE timer_reminder_sent = false` guard makes this the serialization
/// point between concurrent runs. Returns whether this call flipped the flag.
pub async fn mark_reminder_sent<C>(db: &C, day_id: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    let result = Day::update_many()
        .col_expr(day::Column::TimerReminderSent, Expr::value(true))
        .filter(day::Column::Id.eq(day_id))
        .filter(day::Column::TimerReminderSent.eq(false))
        .exec(db)
        .await?;

    Ok(result.rows_affected == 1)
}

/// Deletes the given day records, returning how many rows went away.
pub async fn delete_days<C>(db: &C, day_ids: &[i64]) -> Result<u64>
where
    C: ConnectionTrait,
{
    if day_ids.is_empty() {
        return Ok(0);
    }

    let result = Day::delete_many()
        .filter(day::Column::Id.is_in(day_ids.iter().copied()))
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}
