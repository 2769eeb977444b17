//! Handlers for `/sessions` endpoints — the interview surface.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/sessions` | Body: `{"pin":"A…P","filing_type":"IT1"}` |
//! | `GET`  | `/sessions/:id` | Session plus its pending question |
//! | `POST` | `/sessions/:id/answers` | Body: `{"field":"…","answer":"…"}` |
//! | `POST` | `/sessions/:id/submit` | Commits facts and scores the filing |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use ushuru_core::{session::FilingSession, store::TaxStore};
use ushuru_engine::{AnswerOutcome, FilingEngine, Prompt, Submission};
use uuid::Uuid;

use crate::error::ApiError;

// ─── Start ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StartBody {
  pub pin:         String,
  pub filing_type: String,
}

#[derive(Debug, Serialize)]
pub struct SessionView {
  #[serde(flatten)]
  pub session: FilingSession,
  pub pending: Option<Prompt>,
}

/// `POST /sessions`
pub async fn start<S: TaxStore>(
  State(engine): State<Arc<FilingEngine<S>>>,
  Json(body): Json<StartBody>,
) -> Result<impl IntoResponse, ApiError> {
  let (session, prompt) =
    engine.start_session(&body.pin, &body.filing_type).await?;
  Ok((
    StatusCode::CREATED,
    Json(SessionView { session, pending: Some(prompt) }),
  ))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /sessions/:id`
pub async fn get_one<S: TaxStore>(
  State(engine): State<Arc<FilingEngine<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
  let session = engine.get_session(id).await?;
  let pending = engine.pending_prompt(&session);
  Ok(Json(SessionView { session, pending }))
}

// ─── Answer ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AnswerBody {
  pub field:  String,
  pub answer: String,
}

#[derive(Debug, Serialize)]
pub struct AnswerView {
  pub state: &'static str,
  pub next:  Option<Prompt>,
}

/// `POST /sessions/:id/answers`
pub async fn answer<S: TaxStore>(
  State(engine): State<Arc<FilingEngine<S>>>,
  Path(id): Path<Uuid>,
  Json(body): Json<AnswerBody>,
) -> Result<Json<AnswerView>, ApiError> {
  let outcome = engine.record_answer(id, &body.field, &body.answer).await?;
  let view = match outcome {
    AnswerOutcome::Next(prompt) => {
      AnswerView { state: "COLLECTING", next: Some(prompt) }
    }
    AnswerOutcome::ReadyToSubmit => {
      AnswerView { state: "SECTION_COMPLETE", next: None }
    }
  };
  Ok(Json(view))
}

// ─── Submit ──────────────────────────────────────────────────────────────────

/// `POST /sessions/:id/submit`
pub async fn submit<S: TaxStore>(
  State(engine): State<Arc<FilingEngine<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Submission>, ApiError> {
  let submission = engine.submit(id).await?;
  Ok(Json(submission))
}
