//! Unified error type for timekeeper.
//!
//! Every fallible operation returns [`Result`]. Storage errors convert from
//! `sea_orm::DbErr` automatically so `?` works across the core modules.

use thiserror::Error;

/// Errors raised by the reminder dispatcher, the roll-up engine and the stores.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be loaded or parsed
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// A record or aggregate violates a bound or uniqueness rule
    #[error("Validation failed on `{field}`: {message}")]
    Validation {
        /// Offending field
        field: &'static str,
        /// Human-readable reason
        message: String,
    },

    /// Referenced user does not exist
    #[error("User not found: {id}")]
    UserNotFound {
        /// User primary key
        id: i64,
    },

    /// Referenced day record does not exist
    #[error("Day not found for user {user_id} on {date}")]
    DayNotFound {
        /// Owner of the day
        user_id: i64,
        /// Calendar date
        date: chrono::NaiveDate,
    },

    /// Time zone name is not a known IANA zone
    #[error("Unknown time zone: {name}")]
    InvalidTimeZone {
        /// The rejected name
        name: String,
    },

    /// The notifier failed to hand off a message
    #[error("Failed to deliver `{template}` to {address}: {message}")]
    Delivery {
        /// Recipient address
        address: String,
        /// Template name
        template: String,
        /// Transport-specific reason
        message: String,
    },

    /// A concurrent writer already created the same unique record
    #[error("Concurrent write conflict: {message}")]
    Conflict {
        /// Description of the clashing key
        message: String,
    },

    /// Database error surfaced by `SeaORM`
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// I/O error (config file access)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for building a [`Error::Validation`].
    pub(crate) fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
