//! In-memory store for tests and local development.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use rota_db::db::enums::SeriesStatus;
use rota_db::model::event::instance::NewEventInstance;
use rota_db::model::event::series::EventSeries;
use rota_recur::TimeWindow;

use super::{SeriesInstanceStore, StoreError, StoreResult};

/// Store over process memory.
///
/// Mirrors the Postgres store's observable behavior, including the
/// `(series_id, start_at)` uniqueness rule. Failures can be queued up front
/// so callers' retry and isolation paths can be exercised without a database.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    series: Vec<EventSeries>,
    /// Instance rows keyed the way the table's unique constraint keys them.
    instances: BTreeMap<(Uuid, DateTime<Utc>), NewEventInstance>,
    /// Queued failures, served one per storage call before any work happens.
    failures: VecDeque<StoreError>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_series(&self, series: EventSeries) {
        self.locked().series.push(series);
    }

    /// Queues an error that the next storage call returns instead of running.
    pub fn inject_failure(&self, error: StoreError) {
        self.locked().failures.push_back(error);
    }

    /// Number of queued failures not yet served.
    #[must_use]
    pub fn pending_failures(&self) -> usize {
        self.locked().failures.len()
    }

    /// Total instance rows across all series.
    #[must_use]
    pub fn instance_count(&self) -> usize {
        self.locked().instances.len()
    }

    /// All rows for one series, ordered by start time.
    #[must_use]
    pub fn instances_for(&self, series_id: Uuid) -> Vec<NewEventInstance> {
        self.locked()
            .instances
            .range((series_id, DateTime::<Utc>::MIN_UTC)..=(series_id, DateTime::<Utc>::MAX_UTC))
            .map(|(_, row)| row.clone())
            .collect()
    }

    fn locked(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SeriesInstanceStore for MemoryStore {
    async fn active_recurring_series(&self) -> StoreResult<Vec<EventSeries>> {
        let mut inner = self.locked();
        if let Some(error) = inner.failures.pop_front() {
            return Err(error);
        }
        Ok(inner
            .series
            .iter()
            .filter(|series| {
                series.status != SeriesStatus::Cancelled && series.recurrence.is_some()
            })
            .cloned()
            .collect())
    }

    async fn list_instance_start_times(
        &self,
        series_id: Uuid,
        window: TimeWindow,
    ) -> StoreResult<Vec<DateTime<Utc>>> {
        let mut inner = self.locked();
        if let Some(error) = inner.failures.pop_front() {
            return Err(error);
        }
        Ok(inner
            .instances
            .range((series_id, window.start())..(series_id, window.end()))
            .map(|((_, start_at), _)| *start_at)
            .collect())
    }

    async fn insert_instances(&self, instances: Vec<NewEventInstance>) -> StoreResult<usize> {
        let mut inner = self.locked();
        if let Some(error) = inner.failures.pop_front() {
            return Err(error);
        }
        let mut written = 0;
        for row in instances {
            if let Entry::Vacant(slot) = inner.instances.entry((row.series_id, row.start_at)) {
                slot.insert(row);
                written += 1;
            }
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use rota_db::db::enums::Visibility;

    fn start() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-05-05T08:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn row(series_id: Uuid, start_at: DateTime<Utc>) -> NewEventInstance {
        NewEventInstance {
            id: Uuid::new_v4(),
            series_id,
            calendar_id: Uuid::new_v4(),
            title: "Standup".to_string(),
            description: None,
            location: None,
            color: None,
            category: None,
            all_day: false,
            visibility: Visibility::Public,
            metadata: None,
            start_at,
            end_at: start_at + TimeDelta::minutes(15),
        }
    }

    #[test_log::test(tokio::test)]
    async fn duplicate_slots_are_dropped_not_doubled() {
        let store = MemoryStore::new();
        let series_id = Uuid::new_v4();

        let written = store
            .insert_instances(vec![row(series_id, start()), row(series_id, start())])
            .await
            .unwrap();
        assert_eq!(written, 1);

        let written_again = store
            .insert_instances(vec![row(series_id, start())])
            .await
            .unwrap();
        assert_eq!(written_again, 0);
        assert_eq!(store.instance_count(), 1);
    }

    #[test_log::test(tokio::test)]
    async fn start_times_respect_the_half_open_window() {
        let store = MemoryStore::new();
        let series_id = Uuid::new_v4();
        let other_series = Uuid::new_v4();

        let rows = (0..4)
            .map(|day| row(series_id, start() + TimeDelta::days(day)))
            .chain(std::iter::once(row(other_series, start())))
            .collect();
        store.insert_instances(rows).await.unwrap();

        let window = TimeWindow::new(start(), start() + TimeDelta::days(2)).unwrap();
        let starts = store
            .list_instance_start_times(series_id, window)
            .await
            .unwrap();

        // Day 2 sits exactly on the window end and the other series' row is
        // not ours; both stay out.
        assert_eq!(starts, vec![start(), start() + TimeDelta::days(1)]);
    }

    #[test_log::test(tokio::test)]
    async fn injected_failures_are_served_in_order() {
        let store = MemoryStore::new();
        store.inject_failure(StoreError::Transient("first".to_string()));
        store.inject_failure(StoreError::Permanent("second".to_string()));

        let first = store.active_recurring_series().await.unwrap_err();
        assert_eq!(first, StoreError::Transient("first".to_string()));

        let second = store.active_recurring_series().await.unwrap_err();
        assert_eq!(second, StoreError::Permanent("second".to_string()));

        assert!(store.active_recurring_series().await.is_ok());
    }
}
