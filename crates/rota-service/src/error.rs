use thiserror::Error;

/// Service layer errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    StoreError(#[from] crate::store::StoreError),

    #[error("Invalid run window: {0}")]
    InvalidWindow(#[from] rota_recur::RuleError),

    #[error("Scheduler is not running")]
    SchedulerStopped,
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
