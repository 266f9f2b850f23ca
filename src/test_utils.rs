//! Shared test utilities for timekeeper.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

#![allow(clippy::unwrap_used)]

use crate::{
    config::Settings,
    core::{
        calendar::WeekdaySet,
        day::{self, NewDay},
        user::{self, NewUser},
    },
    entities,
    errors::{Error, Result},
    notify::{Notifier, Template},
};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use sea_orm::DatabaseConnection;
use std::collections::HashSet;
use std::sync::Mutex;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Shorthand for a calendar date.
pub fn test_date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// Settings with a 10:00 threshold and 8-hour PTO days.
pub fn test_settings() -> Settings {
    Settings {
        threshold: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        pto_day_hours: 8.0,
    }
}

/// Builds a [`NewUser`] with unique identifiers derived from `email`.
///
/// # Defaults
/// * workdays: Monday through Friday
/// * tags: none
pub fn new_test_user(email: &str, time_zone: &str) -> NewUser {
    NewUser {
        name: "Test User".to_string(),
        email: email.to_string(),
        harvest_id: format!("harvest-{email}"),
        zenefits_name: format!("zenefits-{email}"),
        slack_id: None,
        time_zone: time_zone.to_string(),
        workdays: WeekdaySet::WEEKDAYS,
        tags: Vec::new(),
    }
}

/// Creates a weekday-schedule user in `time_zone`.
pub async fn create_test_user(
    db: &DatabaseConnection,
    email: &str,
    time_zone: &str,
) -> Result<entities::user::Model> {
    user::create_user(db, new_test_user(email, time_zone)).await
}

/// Creates a UTC user carrying `tags`.
pub async fn create_tagged_user(
    db: &DatabaseConnection,
    email: &str,
    tags: &[&str],
) -> Result<entities::user::Model> {
    let mut new_user = new_test_user(email, "UTC");
    new_user.tags = tags.iter().map(ToString::to_string).collect();
    user::create_user(db, new_user).await
}

/// Sets up a database with one user in `time_zone`.
/// Returns (db, user) for common test scenarios.
pub async fn setup_with_user(
    time_zone: &str,
) -> Result<(DatabaseConnection, entities::user::Model)> {
    let db = setup_test_db().await?;
    let user = create_test_user(&db, "test@example.com", time_zone).await?;
    Ok((db, user))
}

/// Records a day whose workday flag comes from the user's schedule.
pub async fn record_test_day(
    db: &DatabaseConnection,
    user_id: i64,
    date: NaiveDate,
    client_hours: f64,
    internal_hours: f64,
    pto: bool,
) -> Result<entities::day::Model> {
    day::record_day(
        db,
        NewDay {
            user_id,
            date,
            client_hours,
            internal_hours,
            pto,
            tracked_in_real_time: false,
            workday: None,
        },
    )
    .await
}

/// Records a day with client hours and the real-time tracking flag.
pub async fn record_custom_day(
    db: &DatabaseConnection,
    user_id: i64,
    date: NaiveDate,
    client_hours: f64,
    tracked_in_real_time: bool,
) -> Result<entities::day::Model> {
    day::record_day(
        db,
        NewDay {
            user_id,
            date,
            client_hours,
            internal_hours: 0.0,
            pto: false,
            tracked_in_real_time,
            workday: None,
        },
    )
    .await
}

/// Records an empty day with an explicit workday flag.
pub async fn record_workday_flagged_day(
    db: &DatabaseConnection,
    user_id: i64,
    date: NaiveDate,
    workday: bool,
) -> Result<entities::day::Model> {
    day::record_day(
        db,
        NewDay {
            user_id,
            date,
            client_hours: 0.0,
            internal_hours: 0.0,
            pto: false,
            tracked_in_real_time: false,
            workday: Some(workday),
        },
    )
    .await
}

/// Notifier double that records deliveries and can fail for chosen addresses.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, Template)>>,
    failing: HashSet<String>,
}

impl RecordingNotifier {
    /// A notifier that rejects every message to `addresses`.
    pub fn failing_for(addresses: &[&str]) -> Self {
        Self {
            sent: Mutex::default(),
            failing: addresses.iter().map(ToString::to_string).collect(),
        }
    }

    /// Every successful delivery, in order.
    pub fn sent(&self) -> Vec<(String, Template)> {
        self.sent.lock().unwrap().clone()
    }

    /// Number of successful deliveries to `address`.
    pub fn sent_to(&self, address: &str) -> usize {
        self.sent().iter().filter(|(a, _)| a == address).count()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, address: &str, template: Template) -> Result<()> {
        if self.failing.contains(address) {
            return Err(Error::Delivery {
                address: address.to_string(),
                template: template.name().to_string(),
                message: "mailbox unavailable".to_string(),
            });
        }
        self.sent
            .lock()
            .unwrap()
            .push((address.to_string(), template));
        Ok(())
    }
}
