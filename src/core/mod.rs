//! Core business logic - framework-agnostic scheduling and aggregation.
//!
//! The reminder dispatcher and the monthly roll-up both sit on top of the
//! user, day and month stores and never call each other.

/// Time zone, threshold and calendar-month helpers
pub mod calendar;
/// Day record store
pub mod day;
/// Month summary store
pub mod month;
/// Timer reminder dispatch
pub mod reminder;
/// Monthly roll-up engine
pub mod rollup;
/// User directory
pub mod user;
