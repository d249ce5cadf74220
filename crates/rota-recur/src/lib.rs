//! Recurrence rules over UTC instants and their expansion into concrete
//! occurrence start times.
//!
//! The model is deliberately small: four frequencies, positive day-of-month
//! values only, and day-of-week indices counted from Sunday. Everything here
//! is pure; callers own persistence and scheduling.

pub mod error;
pub mod expand;
pub mod rule;
pub mod window;

pub use error::{RuleError, RuleResult};
pub use expand::expand;
pub use rule::{Frequency, RecurrenceRule, Weekday};
pub use window::TimeWindow;
