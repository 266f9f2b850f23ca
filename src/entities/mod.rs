//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod day;
pub mod month;
pub mod user;

// Re-export specific types to avoid conflicts
pub use day::{Column as DayColumn, Entity as Day, Model as DayModel};
pub use month::{Column as MonthColumn, Entity as Month, Model as MonthModel};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
