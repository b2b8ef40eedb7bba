use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The document store could not be reached.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("delivery failed: {0}")]
    DeliveryFailed(#[from] DeliveryError),

    #[error("invalid interval '{0}'")]
    InvalidInterval(String),

    /// Empty quiz pool or empty group set.
    #[error("no eligible content: {0}")]
    NoEligibleContent(&'static str),

    #[error("report {0} was already resolved or is missing")]
    ReportNotFound(Uuid),

    #[error("malformed quiz source: {0}")]
    MalformedQuizSource(&'static str),

    #[error("operation requires explicit confirmation")]
    ConfirmationRequired,

    #[error("configuration error: {0}")]
    Config(String),
}

/// Failure of a single outbound platform call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("request timed out")]
    Timeout,

    #[error("request rejected: {0}")]
    Rejected(String),
}
