//! Day entity - One activity record per user per calendar date.
//!
//! Days are written by the time-tracking integration, flagged by the reminder
//! dispatcher and deleted by the monthly roll-up once aggregated.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Day database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "days")]
pub struct Model {
    /// Unique identifier for the day record
    #[sea_orm(primary_key)]
    pub id: i64,
    /// ID of the user this day belongs to
    pub user_id: i64,
    /// Calendar date in the user's time zone
    pub date: Date,
    /// Hours billed to clients
    pub client_hours: f64,
    /// Hours spent on internal work
    pub internal_hours: f64,
    /// Paid time off
    pub pto: bool,
    /// Set once the daily timer reminder went out
    pub timer_reminder_sent: bool,
    /// Hours were logged with a running timer rather than after the fact
    pub tracked_in_real_time: bool,
    /// Copied from the user's schedule when the record was created
    pub workday: bool,
}

impl Model {
    /// Client plus internal hours.
    #[must_use]
    pub fn tracked_hours(&self) -> f64 {
        self.client_hours + self.internal_hours
    }
}

/// Defines relationships between Day and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each day belongs to one user
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
