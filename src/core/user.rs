//! User directory - Lookups the dispatcher and roll-up depend on, plus the
//! small amount of write logic needed to keep its invariants.
//!
//! Archived users stay in the table with `is_active = false`; every query that
//! feeds reminders or roll-ups filters them out here.

use crate::{
    core::calendar::{self, WeekdaySet},
    entities::{User, user},
    errors::{Error, Result},
};
use sea_orm::{
    QueryOrder, QuerySelect, Set,
    prelude::*,
    sea_query::{Expr, Func, SimpleExpr},
};

/// Fields needed to create a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Display name
    pub name: String,
    /// Contact address
    pub email: String,
    /// Harvest identifier
    pub harvest_id: String,
    /// Zenefits name
    pub zenefits_name: String,
    /// Optional Slack member id
    pub slack_id: Option<String>,
    /// IANA time zone name
    pub time_zone: String,
    /// Expected tracking days
    pub workdays: WeekdaySet,
    /// Free-form tags
    pub tags: Vec<String>,
}

/// Active users whose time zone is exactly `time_zone`.
pub async fn active_users_in_time_zone<C>(db: &C, time_zone: &str) -> Result<Vec<user::Model>>
where
    C: ConnectionTrait,
{
    User::find()
        .filter(user::Column::IsActive.eq(true))
        .filter(user::Column::TimeZone.eq(time_zone))
        .order_by_asc(user::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Every user, archived ones included.
pub async fn all_users<C>(db: &C) -> Result<Vec<user::Model>>
where
    C: ConnectionTrait,
{
    User::find()
        .order_by_asc(user::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Every non-archived user.
pub async fn active_users<C>(db: &C) -> Result<Vec<user::Model>>
where
    C: ConnectionTrait,
{
    User::find()
        .filter(user::Column::IsActive.eq(true))
        .order_by_asc(user::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Loads a user by id, failing with [`Error::UserNotFound`].
pub async fn get_user_by_id<C>(db: &C, user_id: i64) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or(Error::UserNotFound { id: user_id })
}

/// Distinct time zones of active users, sorted by name.
pub async fn time_zones<C>(db: &C) -> Result<Vec<String>>
where
    C: ConnectionTrait,
{
    User::find()
        .select_only()
        .column(user::Column::TimeZone)
        .distinct()
        .filter(user::Column::IsActive.eq(true))
        .order_by_asc(user::Column::TimeZone)
        .into_tuple::<String>()
        .all(db)
        .await
        .map_err(Into::into)
}

/// Every tag used by any user, sorted and deduplicated.
pub async fn tags<C>(db: &C) -> Result<Vec<String>>
where
    C: ConnectionTrait,
{
    let mut tags: Vec<String> = all_users(db)
        .await?
        .iter()
        .flat_map(user::Model::tag_list)
        .collect();
    tags.sort();
    tags.dedup();
    Ok(tags)
}

/// Users carrying at least one of `wanted`; all users when `wanted` is empty.
pub async fn users_with_tags<C>(db: &C, wanted: &[String]) -> Result<Vec<user::Model>>
where
    C: ConnectionTrait,
{
    let users = all_users(db).await?;
    if wanted.is_empty() {
        return Ok(users);
    }

    Ok(users
        .into_iter()
        .filter(|u| u.tag_list().iter().any(|tag| wanted.contains(tag)))
        .collect())
}

/// Creates a user after checking format and uniqueness rules.
///
/// Email uniqueness is case-insensitive and only considers active users, so an
/// archived user's address can be reused. Harvest ids and Zenefits names must
/// be unique across the whole table.
pub async fn create_user<C>(db: &C, new_user: NewUser) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    let name = new_user.name.trim().to_string();
    if name.is_empty() {
        return Err(Error::validation("name", "cannot be empty"));
    }

    let email = new_user.email.trim().to_string();
    if !is_valid_email(&email) {
        return Err(Error::validation("email", format!("`{email}` is not a valid address")));
    }
    if email_taken(db, &email).await? {
        return Err(Error::validation("email", "has already been taken"));
    }

    let harvest_id = new_user.harvest_id.trim().to_string();
    if harvest_id.is_empty() {
        return Err(Error::validation("harvest_id", "cannot be empty"));
    }
    if exists_with(db, user::Column::HarvestId.eq(harvest_id.as_str())).await? {
        return Err(Error::validation("harvest_id", "has already been taken"));
    }

    let zenefits_name = new_user.zenefits_name.trim().to_string();
    if zenefits_name.is_empty() {
        return Err(Error::validation("zenefits_name", "cannot be empty"));
    }
    if exists_with(db, user::Column::ZenefitsName.eq(zenefits_name.as_str())).await? {
        return Err(Error::validation("zenefits_name", "has already been taken"));
    }

    calendar::parse_time_zone(&new_user.time_zone)?;

    let mut tags: Vec<String> = new_user
        .tags
        .iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    // Tags are stored comma-joined
    if let Some(bad) = tags.iter().find(|t| t.contains(',')) {
        return Err(Error::validation("tags", format!("`{bad}` must not contain a comma")));
    }
    tags.sort();
    tags.dedup();

    let model = user::ActiveModel {
        name: Set(name),
        email: Set(email),
        harvest_id: Set(harvest_id),
        zenefits_name: Set(zenefits_name),
        slack_id: Set(new_user.slack_id),
        time_zone: Set(new_user.time_zone),
        workdays: Set(new_user.workdays.to_string()),
        tags: Set(tags.join(",")),
        is_active: Set(true),
        ..Default::default()
    };

    let created = model.insert(db).await?;
    tracing::info!(user_id = created.id, "Created user");
    Ok(created)
}

/// Archives a user; the row is kept.
pub async fn archive_user<C>(db: &C, user_id: i64) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    let existing = get_user_by_id(db, user_id).await?;
    let mut active_model: user::ActiveModel = existing.into();
    active_model.is_active = Set(false);
    let archived = active_model.update(db).await?;
    tracing::info!(user_id, "Archived user");
    Ok(archived)
}

async fn email_taken<C>(db: &C, email: &str) -> Result<bool>
where
    C: ConnectionTrait,
{
    let count = User::find()
        .filter(user::Column::IsActive.eq(true))
        .filter(
            // SQLite's lower() only folds ASCII
            Expr::expr(Func::lower(Expr::col(user::Column::Email)))
                .eq(email.to_ascii_lowercase()),
        )
        .count(db)
        .await?;
    Ok(count > 0)
}

async fn exists_with<C>(db: &C, condition: SimpleExpr) -> Result<bool>
where
    C: ConnectionTrait,
{
    Ok(User::find().filter(condition).count(db).await? > 0)
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.contains(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, rest)| !host.is_empty() && !rest.is_empty() && !rest.ends_with('.'))
}
