//! Handlers for taxpayer-scoped read endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET` | `/taxpayers/:pin/facts` | Optional `?filing_type=IT1\|VAT3` |
//! | `GET` | `/taxpayers/:pin/profile` | Aggregated wealth profile |
//! | `GET` | `/taxpayers/:pin/access-logs` | The taxpayer's full access trail |
//!
//! Fact reads here are officer-attributed: this surface is the review
//! tooling, not the interview.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use ushuru_core::{
  access::{AccessContext, AccessLogEntry},
  filing::FiledFact,
  pin::TaxpayerPin,
  plan::FilingType,
  store::TaxStore,
};
use ushuru_engine::{FilingEngine, WealthProfile};

use crate::error::ApiError;

fn parse_pin(raw: &str) -> Result<TaxpayerPin, ApiError> {
  TaxpayerPin::parse(raw).map_err(ApiError::from)
}

// ─── Facts ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct FactsParams {
  pub filing_type: Option<FilingType>,
}

/// `GET /taxpayers/:pin/facts[?filing_type=<type>]`
pub async fn facts<S: TaxStore>(
  State(engine): State<Arc<FilingEngine<S>>>,
  Path(pin): Path<String>,
  Query(params): Query<FactsParams>,
) -> Result<Json<Vec<FiledFact>>, ApiError> {
  let pin = parse_pin(&pin)?;
  let facts = engine
    .store()
    .filed_facts(pin, params.filing_type, AccessContext::officer())
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(facts))
}

// ─── Wealth profile ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ProfileParams {
  /// Scope dated truth records to on-or-before this date; defaults to today.
  pub as_of: Option<NaiveDate>,
}

/// `GET /taxpayers/:pin/profile[?as_of=YYYY-MM-DD]`
pub async fn profile<S: TaxStore>(
  State(engine): State<Arc<FilingEngine<S>>>,
  Path(pin): Path<String>,
  Query(params): Query<ProfileParams>,
) -> Result<Json<WealthProfile>, ApiError> {
  let pin = parse_pin(&pin)?;
  let as_of = params.as_of.unwrap_or_else(|| Utc::now().date_naive());
  Ok(Json(engine.build_wealth_profile(&pin, as_of).await))
}

// ─── Access trail ────────────────────────────────────────────────────────────

/// `GET /taxpayers/:pin/access-logs`
pub async fn access_logs<S: TaxStore>(
  State(engine): State<Arc<FilingEngine<S>>>,
  Path(pin): Path<String>,
) -> Result<Json<Vec<AccessLogEntry>>, ApiError> {
  let pin = parse_pin(&pin)?;
  let entries = engine
    .store()
    .access_logs(pin)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(entries))
}
