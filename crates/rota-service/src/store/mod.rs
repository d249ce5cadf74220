//! Storage contract between the materialization job and its backing store.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use rota_db::model::event::instance::NewEventInstance;
use rota_db::model::event::series::EventSeries;
use rota_recur::TimeWindow;

pub mod memory;
pub mod pg;

pub use memory::MemoryStore;
pub use pg::PgStore;

/// Storage failures, split by whether retrying can help.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backend may recover on its own; callers retry with bounded attempts.
    #[error("Transient storage failure: {0}")]
    Transient(String),

    /// Retrying cannot help; the current operation fails immediately.
    #[error("Storage failure: {0}")]
    Permanent(String),
}

impl StoreError {
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Everything the materialization job needs from persistent storage.
///
/// Implementations must uphold the instance table's `(series_id, start_at)`
/// uniqueness rule: [`SeriesInstanceStore::insert_instances`] drops rows whose
/// slot is already taken and reports only the rows actually written, so two
/// overlapping runs can never duplicate an occurrence.
pub trait SeriesInstanceStore: Send + Sync {
    /// Loads every series with a recurrence rule whose status is not cancelled.
    fn active_recurring_series(&self)
    -> impl Future<Output = StoreResult<Vec<EventSeries>>> + Send;

    /// Start times already materialized for `series_id` inside `window`.
    fn list_instance_start_times(
        &self,
        series_id: Uuid,
        window: TimeWindow,
    ) -> impl Future<Output = StoreResult<Vec<DateTime<Utc>>>> + Send;

    /// Persists new instance rows and returns how many were actually written.
    fn insert_instances(
        &self,
        instances: Vec<NewEventInstance>,
    ) -> impl Future<Output = StoreResult<usize>> + Send;
}
