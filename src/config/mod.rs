/// Database configuration and connection management
pub mod database;

/// Reminder threshold and PTO settings from config.toml and the environment
pub mod settings;

pub use settings::Settings;
