//! One series' materialization pass: expand the rule, diff against what is
//! already stored, insert only the missing occurrences.

use std::collections::HashSet;
use std::time::Duration;

use thiserror::Error;

use rota_core::config::MaterializerConfig;
use rota_db::model::event::instance::NewEventInstance;
use rota_db::model::event::series::EventSeries;
use rota_recur::{RuleError, TimeWindow, expand};

use crate::store::{SeriesInstanceStore, StoreError, StoreResult};

/// Why one series could not be processed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MaterializeError {
    /// The stored recurrence column does not decode into a rule.
    #[error("Stored recurrence rule does not parse: {0}")]
    MalformedRule(String),

    /// The rule decoded but fails validation.
    #[error(transparent)]
    InvalidRule(#[from] RuleError),

    /// A storage call failed after every allowed attempt.
    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// What happened to one series in one run.
///
/// This is a value, not an error: the caller folds it into the run summary
/// and moves on, so one broken series can never take the rest of a run down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeriesOutcome {
    /// New instances were written; `skipped` slots already existed.
    Created { created: usize, skipped: usize },
    /// Every candidate in the window is already materialized.
    UpToDate { skipped: usize },
    /// The series could not be processed this run.
    Failed(MaterializeError),
}

impl SeriesOutcome {
    #[must_use]
    pub const fn created(&self) -> usize {
        match self {
            Self::Created { created, .. } => *created,
            Self::UpToDate { .. } | Self::Failed(_) => 0,
        }
    }

    #[must_use]
    pub const fn skipped(&self) -> usize {
        match self {
            Self::Created { skipped, .. } | Self::UpToDate { skipped } => *skipped,
            Self::Failed(_) => 0,
        }
    }

    #[must_use]
    pub const fn error(&self) -> Option<&MaterializeError> {
        match self {
            Self::Failed(error) => Some(error),
            Self::Created { .. } | Self::UpToDate { .. } => None,
        }
    }
}

/// Bounded retry settings for storage calls.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts per storage call, first try included.
    pub attempts: u32,
    /// Delay before the first retry; later delays grow linearly.
    pub backoff: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub fn from_config(config: &MaterializerConfig) -> Self {
        Self {
            attempts: config.storage_retry_attempts.max(1),
            backoff: config.retry_backoff(),
        }
    }

    fn delay_before_retry(self, attempt: u32) -> Duration {
        self.backoff * attempt
    }
}

/// ## Summary
/// Materializes one series over `window`: expands the stored rule, skips
/// start times that already have a row, and inserts the rest as denormalized
/// snapshots of the series.
///
/// Never returns an error. Rule problems and exhausted storage retries are
/// folded into [`SeriesOutcome::Failed`] so the caller's run keeps going.
#[tracing::instrument(skip(store, series, retry), fields(series_id = %series.id))]
pub async fn materialize_series<S: SeriesInstanceStore>(
    store: &S,
    series: &EventSeries,
    window: TimeWindow,
    retry: RetryPolicy,
) -> SeriesOutcome {
    match try_materialize(store, series, window, retry).await {
        Ok(outcome) => outcome,
        Err(error) => {
            tracing::warn!(error = %error, "Series failed to materialize");
            SeriesOutcome::Failed(error)
        }
    }
}

async fn try_materialize<S: SeriesInstanceStore>(
    store: &S,
    series: &EventSeries,
    window: TimeWindow,
    retry: RetryPolicy,
) -> Result<SeriesOutcome, MaterializeError> {
    let rule = match series.recurrence_rule() {
        None => {
            tracing::debug!("Series has no recurrence rule, nothing to materialize");
            return Ok(SeriesOutcome::UpToDate { skipped: 0 });
        }
        Some(Err(error)) => return Err(MaterializeError::MalformedRule(error.to_string())),
        Some(Ok(rule)) => rule,
    };

    let candidates = expand(&rule, series.start_at, window)?;
    if candidates.is_empty() {
        tracing::debug!(window = %window, "No occurrences fall inside the window");
        return Ok(SeriesOutcome::UpToDate { skipped: 0 });
    }

    let existing: HashSet<_> = with_retry(retry, "list instance start times", || {
        store.list_instance_start_times(series.id, window)
    })
    .await?
    .into_iter()
    .collect();

    let missing: Vec<NewEventInstance> = candidates
        .iter()
        .filter(|start| !existing.contains(*start))
        .map(|&start| NewEventInstance::from_series(series, start))
        .collect();

    let mut skipped = candidates.len() - missing.len();
    if missing.is_empty() {
        tracing::debug!(skipped, "Window already fully materialized");
        return Ok(SeriesOutcome::UpToDate { skipped });
    }

    let created = with_retry(retry, "insert instances", || {
        store.insert_instances(missing.clone())
    })
    .await?;

    // A concurrent run may have taken some slots between the read and the
    // insert; the store drops those rows instead of failing.
    skipped += missing.len() - created;

    if created == 0 {
        return Ok(SeriesOutcome::UpToDate { skipped });
    }

    tracing::info!(created, skipped, "Materialized series instances");
    Ok(SeriesOutcome::Created { created, skipped })
}

/// Retries `call` on transient failures only, with linearly growing delays.
/// Permanent failures and exhausted attempts surface immediately.
async fn with_retry<T, F, Fut>(
    policy: RetryPolicy,
    operation: &'static str,
    call: F,
) -> StoreResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = StoreResult<T>>,
{
    let mut attempt = 1;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(error) if error.is_transient() && attempt < policy.attempts => {
                let delay = policy.delay_before_retry(attempt);
                tracing::debug!(
                    operation,
                    attempt,
                    delay = ?delay,
                    error = %error,
                    "Transient storage failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}
