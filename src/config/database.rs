//! Database configuration module for timekeeper.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`;
//! the composite unique keys on days and months are added as separate indexes because
//! entity attributes only express single-column uniqueness.

use crate::entities::{Day, Month, User, day, month};
use crate::errors::Result;
use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/timekeeper.sqlite?mode=rwc";

/// Gets the database URL from environment variable or returns default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by `DATABASE_URL`.
///
/// Falls back to a default local `SQLite` file if no environment variable is set.
pub async fn create_connection() -> Result<DatabaseConnection> {
    Database::connect(&get_database_url())
        .await
        .map_err(Into::into)
}

/// Creates the users, days and months tables plus their unique indexes.
///
/// Safe to call on an existing database; every statement is `IF NOT EXISTS`.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut user_table = schema.create_table_from_entity(User);
    let mut day_table = schema.create_table_from_entity(Day);
    let mut month_table = schema.create_table_from_entity(Month);

    user_table.if_not_exists();
    day_table.if_not_exists();
    month_table.if_not_exists();

    db.execute(builder.build(&user_table)).await?;
    db.execute(builder.build(&day_table)).await?;
    db.execute(builder.build(&month_table)).await?;

    let day_key = Index::create()
        .name("idx_days_user_date")
        .table(Day)
        .col(day::Column::UserId)
        .col(day::Column::Date)
        .unique()
        .if_not_exists()
        .to_owned();

    let month_key = Index::create()
        .name("idx_months_user_year_number")
        .table(Month)
        .col(month::Column::UserId)
        .col(month::Column::Year)
        .col(month::Column::Number)
        .unique()
        .if_not_exists()
        .to_owned();

    db.execute(builder.build(&day_key)).await?;
    db.execute(builder.build(&month_key)).await?;

    Ok(())
}
