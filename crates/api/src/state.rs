use std::sync::Arc;

use koi_core::deferred::DeferredScheduler;
use koi_core::otp::OtpStore;
use koi_db::stores::{PgDeferredScheduler, PgOtpStore};
use koi_notify::Notifier;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything is behind `Arc` or already `Clone`.
#[derive(Clone)]
pub struct AppState {
    pub pool: koi_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Confirmation code storage.
    pub otp_store: Arc<dyn OtpStore>,
    /// Run-later job queue (OTP expiry, promotion transitions).
    pub scheduler: Arc<dyn DeferredScheduler>,
    /// Customer notification channel (SMTP or log fallback).
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    /// State backed by PostgreSQL stores on `pool`.
    pub fn new(pool: koi_db::DbPool, config: ServerConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            otp_store: Arc::new(PgOtpStore::new(pool.clone())),
            scheduler: Arc::new(PgDeferredScheduler::new(pool.clone())),
            pool,
            config: Arc::new(config),
            notifier,
        }
    }
}
