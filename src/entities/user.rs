//! User entity - A person whose time is tracked.
//!
//! Users are archived (`is_active = false`) rather than deleted. Archived
//! users are ignored by the reminder dispatcher and the monthly roll-up.

use crate::core::calendar::{self, WeekdaySet};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name
    pub name: String,
    /// Contact address, unique (case-insensitive) among active users
    pub email: String,
    /// Identifier in the Harvest time-tracking system
    #[sea_orm(unique)]
    pub harvest_id: String,
    /// Name as it appears in Zenefits
    #[sea_orm(unique)]
    pub zenefits_name: String,
    /// Optional Slack member id
    pub slack_id: Option<String>,
    /// IANA time zone name, e.g. `"Africa/Cairo"`
    pub time_zone: String,
    /// Comma-separated weekday abbreviations, e.g. `"mon,tue,wed,thu,fri"`
    pub workdays: String,
    /// Comma-separated free-form tags
    pub tags: String,
    /// Archive flag - false once the user has been archived
    pub is_active: bool,
}

impl Model {
    /// Weekdays on which this user is expected to track time.
    #[must_use]
    pub fn workday_set(&self) -> WeekdaySet {
        WeekdaySet::parse_lenient(&self.workdays)
    }

    /// Whether `date` falls on one of the user's workdays.
    #[must_use]
    pub fn works_on(&self, date: Date) -> bool {
        self.workday_set().contains(chrono::Datelike::weekday(&date))
    }

    /// Tags as a list, empty entries dropped.
    #[must_use]
    pub fn tag_list(&self) -> Vec<String> {
        calendar::split_list(&self.tags)
    }
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One user has many day records
    #[sea_orm(has_many = "super::day::Entity")]
    Days,
    /// One user has many month summaries
    #[sea_orm(has_many = "super::month::Entity")]
    Months,
}

impl Related<super::day::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Days.def()
    }
}

impl Related<super::month::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Months.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
