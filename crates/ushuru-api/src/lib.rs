//! JSON REST API for Ushuru.
//!
//! Exposes an axum [`Router`] over a [`FilingEngine`] backed by any
//! [`ushuru_core::store::TaxStore`]. Auth, TLS, and transport concerns are
//! the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", ushuru_api::api_router(engine.clone()))
//! ```

pub mod cases;
pub mod error;
pub mod filings;
pub mod sessions;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use ushuru_core::store::TaxStore;
use ushuru_engine::FilingEngine;

pub use error::ApiError;

/// Build a fully-materialised API router for `engine`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(engine: Arc<FilingEngine<S>>) -> Router<()>
where
  S: TaxStore + 'static,
{
  Router::new()
    // Sessions — the interview surface
    .route("/sessions", post(sessions::start::<S>))
    .route("/sessions/{id}", get(sessions::get_one::<S>))
    .route("/sessions/{id}/answers", post(sessions::answer::<S>))
    .route("/sessions/{id}/submit", post(sessions::submit::<S>))
    // Taxpayer-scoped reads
    .route("/taxpayers/{pin}/facts", get(filings::facts::<S>))
    .route("/taxpayers/{pin}/profile", get(filings::profile::<S>))
    .route("/taxpayers/{pin}/access-logs", get(filings::access_logs::<S>))
    // Audit cases
    .route("/cases", get(cases::list::<S>))
    .route("/cases/{id}", get(cases::get_one::<S>))
    .route("/cases/{id}/status", post(cases::set_status::<S>))
    .with_state(engine)
}

// ─── Integration tests ───────────────────────────────────────────────────────
