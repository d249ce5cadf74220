use salvo::async_trait;

use rota_core::error::CoreError;
use rota_service::scheduler::SchedulerHandle;

use crate::error::AppResult;

/// Makes the background scheduler reachable from request handlers.
pub struct SchedulerHandler {
    pub handle: SchedulerHandle,
}

#[async_trait]
impl salvo::Handler for SchedulerHandler {
    #[tracing::instrument(skip(self, _req, depot, _res, _ctrl))]
    async fn handle(
        &self,
        _req: &mut salvo::Request,
        depot: &mut salvo::Depot,
        _res: &mut salvo::Response,
        _ctrl: &mut salvo::FlowCtrl,
    ) {
        // The handle is a channel sender plus shared state, so a clone per
        // request is enough to reach the running loop.
        depot.inject(self.handle.clone());
    }
}

/// ## Summary
/// Retrieves the scheduler handle from the depot.
///
/// ## Errors
/// Returns an error if the scheduler handle is not found in the depot.
pub fn get_scheduler_from_depot(depot: &salvo::Depot) -> AppResult<SchedulerHandle> {
    depot
        .obtain::<SchedulerHandle>()
        .cloned()
        .map_err(|_err| CoreError::InvariantViolation("Scheduler handle not found in depot").into())
}
