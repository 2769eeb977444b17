//! Error taxonomy for `ushuru-core`.
//!
//! Every failure a collaborator can observe is a typed variant here; nothing
//! fails silently. Storage backends fold their own errors into [`Error`] via
//! `From`, so the engine and API layers deal with a single taxonomy.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  // ── Validation — rejected before any write ────────────────────────────

  #[error("invalid taxpayer PIN: {0:?} (expected format A#########P)")]
  InvalidPin(String),

  #[error("unrecognised filing type: {0:?}")]
  InvalidFilingType(String),

  #[error("filing type {filing_type} has no section {section:?}")]
  UnknownSection {
    filing_type: String,
    section:     String,
  },

  #[error("section {section:?} does not accept field {field:?}")]
  UnknownField { section: String, field: String },

  #[error("invalid amount: {0:?}")]
  InvalidAmount(String),

  #[error("invalid date: {0:?} (expected YYYY-MM-DD)")]
  InvalidDate(String),

  #[error("malformed responses payload: {0}")]
  MalformedResponses(String),

  // ── Recoverable session conflicts — caller retries with fresh state ──

  #[error("session {0} is stale; reload and retry with the pending question")]
  StaleSession(Uuid),

  #[error("session {0} has not completed all sections")]
  IncompleteFiling(Uuid),

  #[error("session not found: {0}")]
  SessionNotFound(Uuid),

  #[error("session {0} is already submitted")]
  SessionSubmitted(Uuid),

  // ── Scoring ───────────────────────────────────────────────────────────

  #[error("no declared income on record for {pin} / {filing_type}")]
  DeclaredIncomeMissing { pin: String, filing_type: String },

  #[error("audit case not found: {0}")]
  CaseNotFound(i64),

  #[error("audit case {0} cannot be moved back to NEW")]
  CaseReopen(i64),

  // ── Plumbing ──────────────────────────────────────────────────────────

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("storage error: {0}")]
  Storage(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
