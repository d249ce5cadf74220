//! Postgres-backed store over the shared connection pool.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use rota_db::db::connection::{DbConnection, DbPool};
use rota_db::db::query;
use rota_db::error::DbError;
use rota_db::model::event::instance::NewEventInstance;
use rota_db::model::event::series::EventSeries;
use rota_recur::TimeWindow;

use super::{SeriesInstanceStore, StoreError, StoreResult};

/// Store backed by the application's Postgres pool.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn connection(&self) -> StoreResult<DbConnection<'_>> {
        self.pool.get().await.map_err(|err| classify(&err.into()))
    }
}

/// Splits database failures into retryable and terminal ones. Checkout
/// failures and dropped connections can heal between attempts; query and
/// constraint errors cannot.
fn classify(err: &DbError) -> StoreError {
    use diesel::result::DatabaseErrorKind;
    use diesel::result::Error as DieselError;

    match err {
        DbError::PoolError(_)
        | DbError::DatabaseError(
            DieselError::BrokenTransactionManager
            | DieselError::DatabaseError(
                DatabaseErrorKind::ClosedConnection | DatabaseErrorKind::SerializationFailure,
                _,
            ),
        ) => StoreError::Transient(err.to_string()),
        DbError::DatabaseError(_) => StoreError::Permanent(err.to_string()),
    }
}

impl SeriesInstanceStore for PgStore {
    async fn active_recurring_series(&self) -> StoreResult<Vec<EventSeries>> {
        let mut conn = self.connection().await?;
        query::series::active_recurring(&mut conn)
            .await
            .map_err(|err| classify(&err.into()))
    }

    async fn list_instance_start_times(
        &self,
        series_id: Uuid,
        window: TimeWindow,
    ) -> StoreResult<Vec<DateTime<Utc>>> {
        let mut conn = self.connection().await?;
        query::instance::start_times_in_window(&mut conn, series_id, window.start(), window.end())
            .await
            .map_err(|err| classify(&err.into()))
    }

    async fn insert_instances(&self, instances: Vec<NewEventInstance>) -> StoreResult<usize> {
        let mut conn = self.connection().await?;
        query::instance::insert_batch(&mut conn, &instances)
            .await
            .map_err(|err| classify(&err.into()))
    }
}
