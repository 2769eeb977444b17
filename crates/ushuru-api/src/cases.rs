//! Handlers for `/cases` endpoints — the audit review surface.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/cases` | Optional `?pin=`, `?risk_level=`, `?status=` |
//! | `GET`  | `/cases/:id` | 404 if not found |
//! | `POST` | `/cases/:id/status` | Body: `{"status":"IN_REVIEW"}` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use serde::Deserialize;
use ushuru_core::{
  audit::{AuditCase, CaseFilter, CaseStatus, RiskLevel},
  pin::TaxpayerPin,
  store::TaxStore,
};
use ushuru_engine::FilingEngine;

use crate::error::ApiError;

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub pin:        Option<String>,
  pub risk_level: Option<RiskLevel>,
  pub status:     Option<CaseStatus>,
}

/// `GET /cases` — highest risk first.
pub async fn list<S: TaxStore>(
  State(engine): State<Arc<FilingEngine<S>>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<AuditCase>>, ApiError> {
  let pin = params
    .pin
    .as_deref()
    .map(TaxpayerPin::parse)
    .transpose()
    .map_err(ApiError::from)?;

  let cases = engine
    .store()
    .audit_cases(CaseFilter {
      pin,
      risk_level: params.risk_level,
      status: params.status,
    })
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(cases))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /cases/:id`
pub async fn get_one<S: TaxStore>(
  State(engine): State<Arc<FilingEngine<S>>>,
  Path(id): Path<i64>,
) -> Result<Json<AuditCase>, ApiError> {
  let case = engine
    .store()
    .get_case(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("case {id} not found")))?;
  Ok(Json(case))
}

// ─── Status transition ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StatusBody {
  pub status: CaseStatus,
}

/// `POST /cases/:id/status`
pub async fn set_status<S: TaxStore>(
  State(engine): State<Arc<FilingEngine<S>>>,
  Path(id): Path<i64>,
  Json(body): Json<StatusBody>,
) -> Result<Json<AuditCase>, ApiError> {
  let case = engine
    .store()
    .update_case_status(id, body.status)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(case))
}
