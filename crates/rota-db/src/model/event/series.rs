//! Models for the `event_series` table.

use chrono::{DateTime, TimeDelta, Utc};
use diesel::prelude::*;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use rota_recur::RecurrenceRule;

use crate::db::enums::{SeriesStatus, Visibility};
use crate::db::schema::event_series;

/// Template definition of a repeating event.
///
/// A series never appears on a calendar directly; the materializer derives
/// concrete [`crate::model::event::instance::EventInstance`] rows from it.
#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = event_series)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct EventSeries {
    /// UUID v4 primary key.
    pub id: Uuid,
    /// Calendar this series belongs to.
    pub calendar_id: Uuid,
    /// Display title copied onto every instance.
    pub title: String,
    /// Optional free-form description.
    pub description: Option<String>,
    /// Optional location string.
    pub location: Option<String>,
    /// Optional display color.
    pub color: Option<String>,
    /// Optional category label.
    pub category: Option<String>,
    /// Whether occurrences span whole days.
    pub all_day: bool,
    /// Visibility level copied onto every instance.
    pub visibility: Visibility,
    /// Opaque extra fields carried along untouched.
    pub metadata: Option<JsonValue>,
    /// Start of the first occurrence.
    pub start_at: DateTime<Utc>,
    /// End of the first occurrence; also fixes the per-occurrence duration.
    pub end_at: DateTime<Utc>,
    /// Lifecycle state.
    pub status: SeriesStatus,
    /// Recurrence rule document, or `NULL` for one-off events.
    pub recurrence: Option<JsonValue>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl EventSeries {
    /// ## Summary
    /// Decodes the stored recurrence document into a rule.
    ///
    /// Returns `None` for one-off series. The document is kept as written, so a
    /// malformed rule surfaces here as `Some(Err(..))` rather than failing the
    /// row load; callers decide how to report it.
    #[must_use]
    pub fn recurrence_rule(&self) -> Option<serde_json::Result<RecurrenceRule>> {
        self.recurrence
            .as_ref()
            .map(|value| serde_json::from_value(value.clone()))
    }

    /// The duration every materialized instance inherits.
    #[must_use]
    pub fn duration(&self) -> TimeDelta {
        self.end_at - self.start_at
    }
}

/// New event series for insertion.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = event_series)]
pub struct NewEventSeries {
    pub id: Uuid,
    pub calendar_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub color: Option<String>,
    pub category: Option<String>,
    pub all_day: bool,
    pub visibility: Visibility,
    pub metadata: Option<JsonValue>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub status: SeriesStatus,
    pub recurrence: Option<JsonValue>,
}
