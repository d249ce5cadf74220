//! Query composition for `event_instance` table operations.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::db::connection::DbConnection;
use crate::db::schema::event_instance;
use crate::model::event::instance::NewEventInstance;

/// ## Summary
/// Loads the start times already materialized for a series inside the
/// half-open window `[window_start, window_end)`, in ascending order.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn start_times_in_window(
    conn: &mut DbConnection<'_>,
    series_id: Uuid,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> Result<Vec<DateTime<Utc>>, diesel::result::Error> {
    event_instance::table
        .filter(event_instance::series_id.eq(series_id))
        .filter(event_instance::start_at.ge(window_start))
        .filter(event_instance::start_at.lt(window_end))
        .select(event_instance::start_at)
        .order(event_instance::start_at.asc())
        .load(conn)
        .await
}

/// ## Summary
/// Inserts instance records in a single query, skipping any row whose
/// `(series_id, start_at)` already exists. Returns the number of rows
/// actually written, which can be less than the batch size when a concurrent
/// run already covered some starts.
///
/// ## Errors
/// Returns a database error if the insert fails.
pub async fn insert_batch(
    conn: &mut DbConnection<'_>,
    instances: &[NewEventInstance],
) -> Result<usize, diesel::result::Error> {
    if instances.is_empty() {
        return Ok(0);
    }

    diesel::insert_into(event_instance::table)
        .values(instances)
        .on_conflict((event_instance::series_id, event_instance::start_at))
        .do_nothing()
        .execute(conn)
        .await
}
