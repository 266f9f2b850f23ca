//! Runtime settings for the reminder threshold and PTO credit.
//!
//! Values come from an optional `config.toml`, then environment overrides
//! (`TIMER_REMINDER_THRESHOLD`, `PTO_DAY_HOURS`). Settings are loaded per
//! invocation and passed down explicitly.

use crate::errors::{Error, Result};
use chrono::NaiveTime;
use serde::Deserialize;
use std::path::Path;

/// Default local time after which reminders go out.
pub const DEFAULT_THRESHOLD: &str = "10:00";
/// Default hours credited per PTO day.
pub const DEFAULT_PTO_DAY_HOURS: f64 = 8.0;

/// Resolved settings used by the dispatcher and month reporting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settings {
    /// Local time of day after which a user without tracked time is reminded
    pub threshold: NaiveTime,
    /// Hours credited per PTO day
    pub pto_day_hours: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            threshold: NaiveTime::from_hms_opt(10, 0, 0).unwrap_or(NaiveTime::MIN),
            pto_day_hours: DEFAULT_PTO_DAY_HOURS,
        }
    }
}

/// Shape of `config.toml`
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    /// `[reminders]` table
    #[serde(default)]
    pub reminders: ReminderSection,
    /// `[rollup]` table
    #[serde(default)]
    pub rollup: RollupSection,
}

/// `[reminders]` section
#[derive(Debug, Default, Deserialize)]
pub struct ReminderSection {
    /// `"HH:MM"` local time
    pub threshold: Option<String>,
}

/// `[rollup]` section
#[derive(Debug, Default, Deserialize)]
pub struct RollupSection {
    /// Hours credited per PTO day
    pub pto_day_hours: Option<f64>,
}

impl Settings {
    /// Loads settings from `TIMEKEEPER_CONFIG` (or `./config.toml` if present)
    /// and applies environment overrides.
    pub fn load() -> Result<Self> {
        let path = std::env::var("TIMEKEEPER_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
        let contents = if Path::new(&path).exists() {
            tracing::debug!("Loading settings from {path}");
            Some(std::fs::read_to_string(&path)?)
        } else {
            None
        };

        Self::from_sources(
            contents.as_deref(),
            std::env::var("TIMER_REMINDER_THRESHOLD").ok(),
            std::env::var("PTO_DAY_HOURS").ok(),
        )
    }

    /// Builds settings from raw TOML text and override strings.
    pub fn from_sources(
        toml_text: Option<&str>,
        threshold_override: Option<String>,
        pto_override: Option<String>,
    ) -> Result<Self> {
        let file: FileConfig = match toml_text {
            Some(text) => toml::from_str(text).map_err(|e| Error::Config {
                message: format!("Failed to parse config.toml: {e}"),
            })?,
            None => FileConfig::default(),
        };

        let threshold_raw = threshold_override
            .or(file.reminders.threshold)
            .unwrap_or_else(|| DEFAULT_THRESHOLD.to_string());
        let threshold = parse_threshold(&threshold_raw)?;

        let pto_day_hours = match pto_override {
            Some(raw) => raw.trim().parse::<f64>().map_err(|e| Error::Config {
                message: format!("PTO_DAY_HOURS `{raw}` is not a number: {e}"),
            })?,
            None => file.rollup.pto_day_hours.unwrap_or(DEFAULT_PTO_DAY_HOURS),
        };
        if !pto_day_hours.is_finite() || pto_day_hours < 0.0 {
            return Err(Error::Config {
                message: format!("PTO day hours must be a non-negative number, got {pto_day_hours}"),
            });
        }

        Ok(Self {
            threshold,
            pto_day_hours,
        })
    }
}

fn parse_threshold(raw: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M").map_err(|e| Error::Config {
        message: format!("Reminder threshold `{raw}` is not HH:MM: {e}"),
    })
}
