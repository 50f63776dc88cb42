use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Database error")]
    Database(#[from] sqlx::Error),

    #[error("Migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("IO error")]
    Io(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// An external availability lookup (blackout registry or holiday oracle)
    /// failed. Detection fails closed on this unless degraded mode is
    /// explicitly enabled in [`crate::config::SchedulerConfig`].
    #[error("Availability lookup failed: {0}")]
    LookupFailed(String),
}
