//! PostgreSQL implementations of the `koi_core` store traits.

mod deferred_scheduler;
mod otp_store;

pub use deferred_scheduler::PgDeferredScheduler;
pub use otp_store::PgOtpStore;

use koi_core::error::CoreError;

/// Store failures surface as internal errors; the details go to the log.
fn internal(context: &str, err: sqlx::Error) -> CoreError {
    tracing::error!(error = %err, context, "Store query failed");
    CoreError::Internal(format!("{context}: {err}"))
}
