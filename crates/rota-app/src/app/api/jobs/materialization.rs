use salvo::{Depot, Response, Router, handler, http::StatusCode, writing::Json};
use serde::Serialize;

use rota_core::constants::MATERIALIZATION_ROUTE_COMPONENT;
use rota_service::error::ServiceError;
use rota_service::scheduler::RunState;

use crate::config::get_config_from_depot;
use crate::scheduler_handler::get_scheduler_from_depot;

/// ## Summary
/// Error response payload
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// ## Summary
/// Status response payload: the job tunables next to the live loop state.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub horizon_days: u32,
    pub run_interval_secs: u64,
    pub state: RunState,
}

/// ## Summary
/// POST /api/jobs/materialization/run - Triggers a materialization run and
/// waits for its summary.
///
/// ## Errors
/// Returns HTTP 503 if the scheduler loop has shut down
/// Returns HTTP 500 if the run fails or the depot is missing the handle
#[handler]
async fn run_handler(depot: &mut Depot, res: &mut Response) {
    let Ok(scheduler) = get_scheduler_from_depot(depot) else {
        res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
        res.render(Json(ErrorResponse {
            error: "Scheduler handle not available".to_string(),
        }));
        return;
    };

    match scheduler.run_now().await {
        Ok(summary) => {
            res.render(Json(summary));
        }
        Err(err @ ServiceError::SchedulerStopped) => {
            res.status_code(StatusCode::SERVICE_UNAVAILABLE);
            res.render(Json(ErrorResponse {
                error: err.to_string(),
            }));
        }
        Err(err) => {
            tracing::error!(error = %err, "Manual materialization run failed");
            res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
            res.render(Json(ErrorResponse {
                error: err.to_string(),
            }));
        }
    }
}

/// ## Summary
/// GET /api/jobs/materialization/status - Reports the scheduler's run counters
/// together with the tunables the loop was started with.
///
/// ## Errors
/// Returns HTTP 500 if the depot is missing the handle or the configuration
#[handler]
async fn status_handler(depot: &mut Depot, res: &mut Response) {
    let Ok(scheduler) = get_scheduler_from_depot(depot) else {
        res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
        res.render(Json(ErrorResponse {
            error: "Scheduler handle not available".to_string(),
        }));
        return;
    };
    let Ok(config) = get_config_from_depot(depot) else {
        res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
        res.render(Json(ErrorResponse {
            error: "Configuration not available".to_string(),
        }));
        return;
    };

    let state = scheduler.state().await;

    res.render(Json(StatusResponse {
        horizon_days: config.materializer.horizon_days,
        run_interval_secs: config.materializer.run_interval_secs,
        state,
    }));
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path(MATERIALIZATION_ROUTE_COMPONENT)
        .push(Router::with_path("run").post(run_handler))
        .push(Router::with_path("status").get(status_handler))
}
