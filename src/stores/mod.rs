//! Stateful stores over the storage layer.
//!
//! - [`RecordStore`] - daily records on the document or key-value tier
//! - [`GoalStore`] - goals and progress
//! - [`ProfileStore`] - the user profile
//! - [`ReminderStore`] - reminders, optionally driving a scheduler
//!
//! Stores keep an in-memory copy of their collection and only update it
//! after the corresponding write has succeeded.

pub mod goals;
pub mod profile;
pub mod records;
pub mod reminders;

pub use goals::{GoalExport, GoalStore};
pub use profile::{ProfileExport, ProfileStore};
pub use records::{ImportSummary, RecordExport, RecordOutcome, RecordStore};
pub use reminders::{ReminderExport, ReminderStore};
