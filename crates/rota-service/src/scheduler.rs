//! Scheduled materialization across every active recurring series.
//!
//! `run_once` is the whole job for one window; `MaterializationScheduler`
//! wraps it in a periodic loop that also accepts manual triggers, so an
//! operator endpoint and the timer share one code path and never run
//! concurrently with each other.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::Serialize;
use tokio::sync::{RwLock, mpsc, oneshot};
use uuid::Uuid;

use rota_core::config::MaterializerConfig;
use rota_recur::TimeWindow;

use crate::error::{ServiceError, ServiceResult};
use crate::materializer::{RetryPolicy, SeriesOutcome, materialize_series};
use crate::store::SeriesInstanceStore;

/// What happened to one series during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesReport {
    pub series_id: Uuid,
    pub created: usize,
    pub skipped: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SeriesReport {
    fn from_outcome(series_id: Uuid, outcome: &SeriesOutcome) -> Self {
        Self {
            series_id,
            created: outcome.created(),
            skipped: outcome.skipped(),
            error: outcome.error().map(ToString::to_string),
        }
    }
}

/// Aggregate of one completed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub total_series: usize,
    pub total_created: usize,
    pub total_skipped: usize,
    pub total_errors: usize,
    pub series: Vec<SeriesReport>,
}

impl RunSummary {
    fn collect(window: TimeWindow, mut series: Vec<SeriesReport>) -> Self {
        // Fan-out completion order is arbitrary; sort so summaries are stable.
        series.sort_unstable_by_key(|report| report.series_id);
        Self {
            window_start: window.start(),
            window_end: window.end(),
            total_series: series.len(),
            total_created: series.iter().map(|report| report.created).sum(),
            total_skipped: series.iter().map(|report| report.skipped).sum(),
            total_errors: series.iter().filter(|report| report.error.is_some()).count(),
            series,
        }
    }
}

/// ## Summary
/// Runs one materialization pass over the window `[now, now + horizon)`.
///
/// Series are processed concurrently, at most `config.concurrency` at a time,
/// and each failure is contained to its own report. When a run deadline is
/// configured and reached, no further series are launched but the ones in
/// flight finish normally.
///
/// ## Errors
/// Returns an error only when the window cannot be built or the series list
/// itself cannot be loaded; per-series failures land in the summary.
#[tracing::instrument(skip(store, config))]
pub async fn run_once<S: SeriesInstanceStore>(
    store: &S,
    now: DateTime<Utc>,
    config: &MaterializerConfig,
) -> ServiceResult<RunSummary> {
    let window = TimeWindow::starting_at(now, config.horizon())?;
    let series = store.active_recurring_series().await?;
    let loaded = series.len();
    let retry = RetryPolicy::from_config(config);
    let deadline = config
        .run_deadline_secs
        .map(|secs| tokio::time::Instant::now() + Duration::from_secs(secs));

    tracing::debug!(window = %window, series = loaded, "Starting materialization run");

    let reports: Vec<SeriesReport> = futures::stream::iter(series)
        .take_while(|_| {
            let can_launch = deadline.is_none_or(|at| tokio::time::Instant::now() < at);
            futures::future::ready(can_launch)
        })
        .map(|series| async move {
            let outcome = materialize_series(store, &series, window, retry).await;
            SeriesReport::from_outcome(series.id, &outcome)
        })
        .buffer_unordered(config.concurrency.max(1))
        .collect()
        .await;

    if reports.len() < loaded {
        tracing::warn!(
            launched = reports.len(),
            loaded,
            "Run deadline reached before every series was launched"
        );
    }

    let summary = RunSummary::collect(window, reports);
    tracing::info!(
        total_series = summary.total_series,
        total_created = summary.total_created,
        total_skipped = summary.total_skipped,
        total_errors = summary.total_errors,
        "Materialization run finished"
    );
    Ok(summary)
}

/// Commands accepted by a running scheduler.
#[derive(Debug)]
pub enum SchedulerCommand {
    /// Run a pass immediately and reply with its result.
    RunNow {
        reply: oneshot::Sender<ServiceResult<RunSummary>>,
    },
    /// Exit the loop after the current iteration.
    Stop,
}

/// Latest-run bookkeeping shared with the status endpoint.
#[derive(Debug, Default, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunState {
    pub runs_completed: u64,
    pub consecutive_failures: u32,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub last_summary: Option<RunSummary>,
}

impl RunState {
    fn record_success(&mut self, summary: RunSummary) {
        self.runs_completed += 1;
        self.consecutive_failures = 0;
        self.last_run_at = Some(Utc::now());
        self.last_error = None;
        self.last_summary = Some(summary);
    }

    fn record_failure(&mut self, error: String) {
        self.consecutive_failures += 1;
        self.last_run_at = Some(Utc::now());
        self.last_error = Some(error);
    }
}

pub type SharedRunState = Arc<RwLock<RunState>>;

/// Periodic driver around [`run_once`].
///
/// The loop owns the store and serializes every pass: scheduled ticks and
/// manual triggers go through the same path one at a time.
pub struct MaterializationScheduler<S> {
    store: Arc<S>,
    config: MaterializerConfig,
    state: SharedRunState,
    command_tx: mpsc::Sender<SchedulerCommand>,
    command_rx: mpsc::Receiver<SchedulerCommand>,
}

impl<S: SeriesInstanceStore + 'static> MaterializationScheduler<S> {
    #[must_use]
    pub fn new(store: Arc<S>, config: MaterializerConfig) -> Self {
        let (command_tx, command_rx) = mpsc::channel(16);
        Self {
            store,
            config,
            state: SharedRunState::default(),
            command_tx,
            command_rx,
        }
    }

    /// Handle for commands and state. Grab one before `run` consumes the
    /// scheduler.
    #[must_use]
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            command_tx: self.command_tx.clone(),
            state: Arc::clone(&self.state),
        }
    }

    /// ## Summary
    /// Drives the scheduler until a `Stop` command arrives or every handle is
    /// dropped. The first pass runs immediately; later passes follow the
    /// configured interval, with missed ticks delayed rather than bunched.
    pub async fn run(mut self) {
        let mut interval = tokio::time::interval(self.config.run_interval());
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        tracing::info!(
            interval_secs = self.config.run_interval_secs,
            horizon_days = self.config.horizon_days,
            "Materialization scheduler started"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    // Failures are recorded in the shared state; a tick has
                    // no caller to reply to.
                    let _summary = self.run_and_record().await;
                }
                command = self.command_rx.recv() => match command {
                    Some(SchedulerCommand::RunNow { reply }) => {
                        let result = self.run_and_record().await;
                        if reply.send(result).is_err() {
                            tracing::debug!("Manual run finished after its caller went away");
                        }
                    }
                    Some(SchedulerCommand::Stop) | None => {
                        tracing::info!("Materialization scheduler stopping");
                        break;
                    }
                }
            }
        }
    }

    async fn run_and_record(&self) -> ServiceResult<RunSummary> {
        match run_once(self.store.as_ref(), Utc::now(), &self.config).await {
            Ok(summary) => {
                self.state.write().await.record_success(summary.clone());
                Ok(summary)
            }
            Err(error) => {
                tracing::error!(error = %error, "Materialization run failed");
                self.state.write().await.record_failure(error.to_string());
                Err(error)
            }
        }
    }
}

/// Cloneable handle to a running [`MaterializationScheduler`].
#[derive(Clone)]
pub struct SchedulerHandle {
    command_tx: mpsc::Sender<SchedulerCommand>,
    state: SharedRunState,
}

impl SchedulerHandle {
    /// ## Summary
    /// Triggers a pass immediately and waits for its summary. Manual runs are
    /// serialized with scheduled ones, so this also waits out a pass already
    /// in progress.
    ///
    /// ## Errors
    /// Returns `SchedulerStopped` if the loop is gone, otherwise whatever the
    /// run itself reported.
    pub async fn run_now(&self) -> ServiceResult<RunSummary> {
        let (reply, response) = oneshot::channel();
        self.command_tx
            .send(SchedulerCommand::RunNow { reply })
            .await
            .map_err(|_command| ServiceError::SchedulerStopped)?;
        response
            .await
            .map_err(|_closed| ServiceError::SchedulerStopped)?
    }

    /// ## Summary
    /// Asks the scheduler loop to exit after its current iteration.
    ///
    /// ## Errors
    /// Returns `SchedulerStopped` if the loop is already gone.
    pub async fn stop(&self) -> ServiceResult<()> {
        self.command_tx
            .send(SchedulerCommand::Stop)
            .await
            .map_err(|_command| ServiceError::SchedulerStopped)
    }

    /// Snapshot of the latest run bookkeeping.
    pub async fn state(&self) -> RunState {
        self.state.read().await.clone()
    }
}
