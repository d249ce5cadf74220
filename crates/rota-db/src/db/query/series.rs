//! Query composition for `event_series` table operations.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::db::connection::DbConnection;
use crate::db::enums::SeriesStatus;
use crate::db::schema::event_series;
use crate::model::event::series::{EventSeries, NewEventSeries};

/// ## Summary
/// Loads every series the materializer should visit: status is not cancelled
/// and a recurrence document is present.
///
/// One-off events and cancelled series never produce new instances, so they
/// are filtered out here rather than in the job.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn active_recurring(
    conn: &mut DbConnection<'_>,
) -> Result<Vec<EventSeries>, diesel::result::Error> {
    event_series::table
        .filter(event_series::status.ne(SeriesStatus::Cancelled))
        .filter(event_series::recurrence.is_not_null())
        .select(EventSeries::as_select())
        .load(conn)
        .await
}

/// ## Summary
/// Inserts a single series record.
///
/// ## Errors
/// Returns a database error if the insert fails.
pub async fn insert(
    conn: &mut DbConnection<'_>,
    series: &NewEventSeries,
) -> Result<usize, diesel::result::Error> {
    diesel::insert_into(event_series::table)
        .values(series)
        .execute(conn)
        .await
}
