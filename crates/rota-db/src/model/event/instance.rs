//! Models for the `event_instance` table.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::db::enums::Visibility;
use crate::db::schema::event_instance;

use super::series::EventSeries;

/// One concrete occurrence of a series.
///
/// Instances are denormalized snapshots: display fields are copied from the
/// series at materialization time and do not follow later edits.
#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = event_instance)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct EventInstance {
    /// UUID v4 primary key.
    pub id: Uuid,
    /// Series this occurrence was derived from.
    pub series_id: Uuid,
    /// Calendar, copied from the series.
    pub calendar_id: Uuid,
    /// Display title, copied from the series.
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub color: Option<String>,
    pub category: Option<String>,
    pub all_day: bool,
    pub visibility: Visibility,
    pub metadata: Option<JsonValue>,
    /// Occurrence start. Unique per series.
    pub start_at: DateTime<Utc>,
    /// Occurrence end: start plus the series duration.
    pub end_at: DateTime<Utc>,
    /// Materialization timestamp.
    pub created_at: DateTime<Utc>,
}

/// New event instance for insertion.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = event_instance)]
pub struct NewEventInstance {
    pub id: Uuid,
    pub series_id: Uuid,
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
}

impl NewEventInstance {
    /// ## Summary
    /// Builds the denormalized row for one occurrence of `series`.
    ///
    /// Copies every display field and derives the end time from the series
    /// duration, so an occurrence keeps the shape the series had when it was
    /// materialized.
    #[must_use]
    pub fn from_series(series: &EventSeries, start_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            series_id: series.id,
            calendar_id: series.calendar_id,
            title: series.title.clone(),
            description: series.description.clone(),
            location: series.location.clone(),
            color: series.color.clone(),
            category: series.category.clone(),
            all_day: series.all_day,
            visibility: series.visibility,
            metadata: series.metadata.clone(),
            start_at,
            end_at: start_at + series.duration(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::enums::SeriesStatus;
    use chrono::TimeDelta;

    #[test]
    fn from_series_snapshots_fields_and_derives_the_end() {
        let start = DateTime::parse_from_rfc3339("2025-04-07T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let series = EventSeries {
            id: Uuid::new_v4(),
            calendar_id: Uuid::new_v4(),
            title: "Design review".to_string(),
            description: Some("Bring sketches".to_string()),
            location: Some("Room 2".to_string()),
            color: Some("#2266aa".to_string()),
            category: Some("meetings".to_string()),
            all_day: false,
            visibility: Visibility::Confidential,
            metadata: Some(serde_json::json!({"source": "import"})),
            start_at: start,
            end_at: start + TimeDelta::minutes(45),
            status: SeriesStatus::Active,
            recurrence: None,
            created_at: start,
            updated_at: start,
        };

        let occurrence_start = start + TimeDelta::days(14);
        let row = NewEventInstance::from_series(&series, occurrence_start);

        assert_eq!(row.series_id, series.id);
        assert_eq!(row.calendar_id, series.calendar_id);
        assert_eq!(row.title, series.title);
        assert_eq!(row.description, series.description);
        assert_eq!(row.location, series.location);
        assert_eq!(row.color, series.color);
        assert_eq!(row.category, series.category);
        assert_eq!(row.visibility, series.visibility);
        assert_eq!(row.metadata, series.metadata);
        assert_eq!(row.start_at, occurrence_start);
        assert_eq!(row.end_at, occurrence_start + TimeDelta::minutes(45));
        assert_ne!(row.id, series.id);
    }
}
