//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use ushuru_core::Error as CoreError;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("unprocessable: {0}")]
  Unprocessable(String),

  #[error("internal error: {0}")]
  Internal(String),
}

/// Map the core taxonomy onto HTTP semantics. Validation rejections are the
/// caller's fault; session conflicts are retryable; everything else is ours.
impl From<CoreError> for ApiError {
  fn from(e: CoreError) -> Self {
    match e {
      CoreError::InvalidPin(_)
      | CoreError::InvalidFilingType(_)
      | CoreError::UnknownSection { .. }
      | CoreError::UnknownField { .. }
      | CoreError::InvalidAmount(_)
      | CoreError::InvalidDate(_)
      | CoreError::MalformedResponses(_) => Self::BadRequest(e.to_string()),

      CoreError::SessionNotFound(_) | CoreError::CaseNotFound(_) => {
        Self::NotFound(e.to_string())
      }

      CoreError::StaleSession(_)
      | CoreError::IncompleteFiling(_)
      | CoreError::SessionSubmitted(_)
      | CoreError::CaseReopen(_) => Self::Conflict(e.to_string()),

      CoreError::DeclaredIncomeMissing { .. } => {
        Self::Unprocessable(e.to_string())
      }

      CoreError::Serialization(_) | CoreError::Storage(_) => {
        Self::Internal(e.to_string())
      }
    }
  }
}

impl ApiError {
  /// Fold a backend error through the core taxonomy.
  pub fn from_store<E: Into<CoreError>>(e: E) -> Self {
    Self::from(e.into())
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Unprocessable(m) => {
        (StatusCode::UNPROCESSABLE_ENTITY, m.clone())
      }
      ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m.clone()),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
