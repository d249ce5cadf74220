mod app_specific;
mod jobs;

use salvo::Router;

// Re-export route constants from core
pub use rota_core::constants::{
    API_ROUTE_COMPONENT, API_ROUTE_PREFIX, JOBS_ROUTE_COMPONENT, JOBS_ROUTE_PREFIX,
    MATERIALIZATION_ROUTE_COMPONENT, MATERIALIZATION_ROUTE_PREFIX,
};

/// ## Summary
/// Constructs the main API router with the app and job endpoints.
#[must_use]
pub fn routes() -> Router {
    Router::with_path(API_ROUTE_COMPONENT)
        .push(app_specific::routes())
        .push(jobs::routes())
}
