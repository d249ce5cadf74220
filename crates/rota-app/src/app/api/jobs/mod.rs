// Endpoints for observing and poking the background jobs.

use salvo::Router;

use rota_core::constants::JOBS_ROUTE_COMPONENT;

mod materialization;

#[must_use]
pub fn routes() -> Router {
    Router::with_path(JOBS_ROUTE_COMPONENT).push(materialization::routes())
}
