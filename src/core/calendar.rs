//! Time and calendar helpers shared by the dispatcher and the roll-up.
//!
//! Everything here is pure: callers pass the current instant in explicitly so
//! the behaviour is deterministic under test.

use crate::errors::{Error, Result};
use chrono::{DateTime, Months, NaiveDate, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use std::cmp::Ordering;
use std::fmt;

/// Earliest year a month summary may refer to (exclusive).
pub const MIN_YEAR_EXCLUSIVE: i32 = 2000;

/// Parses an IANA time zone name.
pub fn parse_time_zone(name: &str) -> Result<Tz> {
    name.parse::<Tz>().map_err(|_| Error::InvalidTimeZone {
        name: name.to_string(),
    })
}

/// The calendar date `now` falls on in `tz`.
#[must_use]
pub fn local_today(now: DateTime<Utc>, tz: Tz) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

/// Whether the local clock in `tz` has reached `threshold` on `reference_date`.
///
/// Any local instant on a later date counts as passed; any instant on an
/// earlier date does not.
#[must_use]
pub fn threshold_passed(
    now: DateTime<Utc>,
    tz: Tz,
    reference_date: NaiveDate,
    threshold: NaiveTime,
) -> bool {
    let local = now.with_timezone(&tz);
    match local.date_naive().cmp(&reference_date) {
        Ordering::Less => false,
        Ordering::Greater => true,
        Ordering::Equal => local.time() >= threshold,
    }
}

/// Checks that `(year, number)` names a valid summary period.
pub fn validate_period(year: i32, number: i32) -> Result<()> {
    if year <= MIN_YEAR_EXCLUSIVE {
        return Err(Error::validation(
            "year",
            format!("must be greater than {MIN_YEAR_EXCLUSIVE}, got {year}"),
        ));
    }
    if !(1..=12).contains(&number) {
        return Err(Error::validation(
            "number",
            format!("must be between 1 and 12, got {number}"),
        ));
    }
    Ok(())
}

/// First and last date (inclusive) of the given calendar month.
pub fn month_range(year: i32, number: i32) -> Result<(NaiveDate, NaiveDate)> {
    validate_period(year, number)?;

    let first = NaiveDate::from_ymd_opt(year, number.unsigned_abs(), 1)
        .ok_or_else(|| Error::validation("year", format!("{year}-{number} is out of range")))?;
    let last = first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .ok_or_else(|| Error::validation("year", format!("{year}-{number} is out of range")))?;

    Ok((first, last))
}

/// Splits a comma-separated list, trimming entries and dropping empty ones.
#[must_use]
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// A set of weekdays, stored as a bitmask indexed from Monday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    /// Monday through Friday.
    pub const WEEKDAYS: Self = Self(0b001_1111);

    /// Builds a set from individual days.
    #[must_use]
    pub fn from_days(days: &[Weekday]) -> Self {
        days.iter().fold(Self::default(), |set, day| set.with(*day))
    }

    /// Returns a copy of the set including `day`.
    #[must_use]
    pub const fn with(self, day: Weekday) -> Self {
        Self(self.0 | (1 << day.num_days_from_monday()))
    }

    /// Whether `day` is in the set.
    #[must_use]
    pub const fn contains(self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_monday()) != 0
    }

    /// Whether no day is in the set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Parses `"mon,tue"`-style lists; rejects unknown day names.
    pub fn parse(raw: &str) -> Result<Self> {
        split_list(raw).iter().try_fold(Self::default(), |set, name| {
            name.parse::<Weekday>()
                .map(|day| set.with(day))
                .map_err(|_| Error::validation("workdays", format!("unknown weekday `{name}`")))
        })
    }

    /// Like [`WeekdaySet::parse`] but silently skips unknown names.
    #[must_use]
    pub fn parse_lenient(raw: &str) -> Self {
        split_list(raw)
            .iter()
            .filter_map(|name| name.parse::<Weekday>().ok())
            .fold(Self::default(), Self::with)
    }

    fn days(self) -> impl Iterator<Item = Weekday> {
        [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ]
        .into_iter()
        .filter(move |day| self.contains(*day))
    }
}

impl fmt::Display for WeekdaySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.days().map(|d| d.to_string().to_lowercase()).collect();
        f.write_str(&names.join(","))
    }
}
