//! Month store - Immutable monthly summaries.

use crate::{
    core::{calendar::validate_period, day::validate_hours},
    entities::{Month, month},
    errors::{Error, Result},
};
use sea_orm::{Set, SqlErr, prelude::*, sea_query::Expr};

/// Aggregate fields for a month summary that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMonth {
    /// Owner of the summary
    pub user_id: i64,
    /// Calendar year
    pub year: i32,
    /// Month number, 1 through 12
    pub number: i32,
    /// Summed client hours
    pub client_hours: f64,
    /// Summed internal hours
    pub internal_hours: f64,
    /// Number of day records
    pub day_count: i32,
    /// PTO days
    pub pto_count: i32,
    /// Days a reminder went out
    pub timer_reminder_sent_count: i32,
    /// Days tracked with a running timer
    pub tracked_in_real_time_count: i32,
    /// Days flagged as workdays
    pub workday_count: i32,
}

impl NewMonth {
    fn validate(&self) -> Result<()> {
        validate_period(self.year, self.number)?;
        validate_hours("client_hours", self.client_hours)?;
        validate_hours("internal_hours", self.internal_hours)?;

        for (field, count) in [
            ("day_count", self.day_count),
            ("pto_count", self.pto_count),
            ("timer_reminder_sent_count", self.timer_reminder_sent_count),
            ("tracked_in_real_time_count", self.tracked_in_real_time_count),
            ("workday_count", self.workday_count),
        ] {
            if count < 0 || count > self.day_count {
                return Err(Error::validation(
                    field,
                    format!("must be between 0 and day_count ({}), got {count}", self.day_count),
                ));
            }
        }
        Ok(())
    }
}

/// Issues a no-op write against the `(user_id, year, number)` key.
///
/// Must be the first statement of a transaction. On `SQLite` it acquires the
/// database write lock up front, so a concurrent roll-up of the same key waits
/// in the busy handler instead of failing to upgrade a read lock later. Other
/// backends lock the row if it exists and fall back to the unique index.
pub async fn lock_month_key<C>(db: &C, user_id: i64, year: i32, number: i32) -> Result<()>
where
    C: ConnectionTrait,
{
    Month::update_many()
        .col_expr(month::Column::Id, Expr::col(month::Column::Id).into())
        .filter(month::Column::UserId.eq(user_id))
        .filter(month::Column::Year.eq(year))
        .filter(month::Column::Number.eq(number))
        .exec(db)
        .await?;
    Ok(())
}

/// Whether a summary already exists for `(user_id, year, number)`.
pub async fn month_exists<C>(db: &C, user_id: i64, year: i32, number: i32) -> Result<bool>
where
    C: ConnectionTrait,
{
    Ok(find_month(db, user_id, year, number).await?.is_some())
}

/// The summary for `(user_id, year, number)`, if any.
pub async fn find_month<C>(
    db: &C,
    user_id: i64,
    year: i32,
    number: i32,
) -> Result<Option<month::Model>>
where
    C: ConnectionTrait,
{
    Month::find()
        .filter(month::Column::UserId.eq(user_id))
        .filter(month::Column::Year.eq(year))
        .filter(month::Column::Number.eq(number))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Inserts a month summary.
///
/// A clash on the `(user_id, year, number)` unique index is reported as
/// [`Error::Conflict`] so callers can tell a lost race from a real failure.
pub async fn create_month<C>(db: &C, new_month: &NewMonth) -> Result<month::Model>
where
    C: ConnectionTrait,
{
    new_month.validate()?;

    let model = month::ActiveModel {
        user_id: Set(new_month.user_id),
        year: Set(new_month.year),
        number: Set(new_month.number),
        client_hours: Set(new_month.client_hours),
        internal_hours: Set(new_month.internal_hours),
        day_count: Set(new_month.day_count),
        pto_count: Set(new_month.pto_count),
        timer_reminder_sent_count: Set(new_month.timer_reminder_sent_count),
        tracked_in_real_time_count: Set(new_month.tracked_in_real_time_count),
        workday_count: Set(new_month.workday_count),
        ..Default::default()
    };

    model.insert(db).await.map_err(|e| {
        if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
            Error::Conflict {
                message: format!(
                    "month {}-{:02} for user {} already exists",
                    new_month.year, new_month.number, new_month.user_id
                ),
            }
        } else {
            e.into()
        }
    })
}
