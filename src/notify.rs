//! Notification seam.
//!
//! The dispatcher only needs "send template X to address Y". Delivery
//! transports live outside this crate and plug in through [`Notifier`].

use crate::errors::Result;
use async_trait::async_trait;
use std::fmt;

/// Message templates the core can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Template {
    /// Prompt to start the day's timer
    TimerReminder,
}

impl Template {
    /// Stable template identifier understood by delivery backends.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::TimerReminder => "timer_reminder",
        }
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Something that can deliver a templated message to a contact address.
///
/// Implementations should return [`crate::errors::Error::Delivery`] when the
/// hand-off fails so the caller leaves the day unflagged for the next run.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers `template` to `address`.
    async fn send(&self, address: &str, template: Template) -> Result<()>;
}

/// Notifier that only records the request in the log.
///
/// Used by the CLI until a real transport is wired in.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, address: &str, template: Template) -> Result<()> {
        tracing::info!(%address, template = template.name(), "Notification queued");
        Ok(())
    }
}
