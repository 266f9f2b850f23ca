//! Month entity - Immutable monthly summary produced by the roll-up.
//!
//! One row per `(user_id, year, number)`, enforced by a unique index created
//! alongside the table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Month database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "months")]
pub struct Model {
    /// Unique identifier for the month summary
    #[sea_orm(primary_key)]
    pub id: i64,
    /// ID of the user this summary belongs to
    pub user_id: i64,
    /// Calendar year, always after 2000
    pub year: i32,
    /// Month number, 1 through 12
    pub number: i32,
    /// Sum of client hours over the month
    pub client_hours: f64,
    /// Sum of internal hours over the month
    pub internal_hours: f64,
    /// Number of day records aggregated
    pub day_count: i32,
    /// Days marked as PTO
    pub pto_count: i32,
    /// Days on which a timer reminder was sent
    pub timer_reminder_sent_count: i32,
    /// Days tracked with a running timer
    pub tracked_in_real_time_count: i32,
    /// Days flagged as workdays
    pub workday_count: i32,
}

impl Model {
    /// Hours credited for PTO days.
    #[must_use]
    pub fn pto_hours(&self, pto_day_hours: f64) -> f64 {
        f64::from(self.pto_count) * pto_day_hours
    }

    /// Client, internal and PTO hours combined.
    #[must_use]
    pub fn total_hours(&self, pto_day_hours: f64) -> f64 {
        self.client_hours + self.internal_hours + self.pto_hours(pto_day_hours)
    }
}

/// Defines relationships between Month and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each month summary belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
