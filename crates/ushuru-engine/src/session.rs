//! Interview flow: the session state machine driven one answer at a time.
//!
//! `last_question_asked` doubles as the concurrency token. An answer is only
//! accepted for the question currently pending; a duplicate or out-of-order
//! answer (retried webhook, double tap) gets [`Error::StaleSession`] and the
//! accumulator is left untouched. The write-back itself is guarded by the
//! store's optimistic `expected_updated_at` check, so two racing answers to
//! the same question can never both land.

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use ushuru_core::{
  Error, Result,
  access::AccessContext,
  audit::AuditCase,
  filing::{FiledFact, NewFiledFact},
  money::{parse_amount, sanitize_text},
  pin::TaxpayerPin,
  plan::{AnswerKind, Cursor, FilingType, Step},
  session::{FilingSession, SessionState},
  store::TaxStore,
};

use crate::FilingEngine;

/// Free-text answers are capped at this many characters.
const MAX_TEXT_LEN: usize = 500;

// ─── Outputs ─────────────────────────────────────────────────────────────────

/// The next question to put to the taxpayer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prompt {
  pub section: String,
  pub field:   String,
  pub prompt:  String,
}

impl Prompt {
  fn from_cursor(cursor: Cursor) -> Self {
    Self {
      section: cursor.section.to_owned(),
      field:   cursor.question.field.to_owned(),
      prompt:  cursor.question.prompt.to_owned(),
    }
  }
}

/// Where the interview stands after an accepted answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerOutcome {
  /// More questions remain; ask this one next.
  Next(Prompt),
  /// Every section is answered; the session is ready to submit.
  ReadyToSubmit,
}

/// The result of a successful submission.
#[derive(Debug, Clone, Serialize)]
pub struct Submission {
  pub facts: Vec<FiledFact>,
  pub case:  AuditCase,
}

// ─── Flow ────────────────────────────────────────────────────────────────────

impl<S: TaxStore> FilingEngine<S> {
  /// Start an interview for `pin` / `filing_type`, returning the new session
  /// and its first question.
  pub async fn start_session(
    &self,
    pin: &str,
    filing_type: &str,
  ) -> Result<(FilingSession, Prompt)> {
    let pin = TaxpayerPin::parse(pin)?;
    let filing_type = FilingType::parse(filing_type)?;

    let session = FilingSession::start(pin, filing_type);
    self
      .store()
      .create_session(session.clone())
      .await
      .map_err(Into::into)?;

    tracing::info!(
      session_id = %session.session_id,
      pin = %session.pin,
      %filing_type,
      "session started"
    );
    let prompt = Prompt::from_cursor(filing_type.plan().first());
    Ok((session, prompt))
  }

  /// Fetch a live session, e.g. to recover the pending question after a
  /// disconnect.
  pub async fn get_session(&self, session_id: Uuid) -> Result<FilingSession> {
    self
      .store()
      .get_session(session_id)
      .await
      .map_err(Into::into)?
      .ok_or(Error::SessionNotFound(session_id))
  }

  /// The question a live session is waiting on, if any.
  pub fn pending_prompt(&self, session: &FilingSession) -> Option<Prompt> {
    let section = session.current_section.as_deref()?;
    let field = session.last_question_asked.as_deref()?;
    let question = session.filing_type.plan().question(section, field).ok()?;
    Some(Prompt {
      section: section.to_owned(),
      field:   field.to_owned(),
      prompt:  question.prompt.to_owned(),
    })
  }

  /// Accept the answer to the pending question `field` and advance the
  /// cursor.
  pub async fn record_answer(
    &self,
    session_id: Uuid,
    field: &str,
    raw: &str,
  ) -> Result<AnswerOutcome> {
    let mut session = self.get_session(session_id).await?;

    if session.state.is_terminal() {
      return Err(Error::SessionSubmitted(session_id));
    }
    let (section, pending) =
      match (&session.current_section, &session.last_question_asked) {
        (Some(s), Some(q)) => (s.clone(), q.clone()),
        _ => return Err(Error::StaleSession(session_id)),
      };
    if field != pending {
      return Err(Error::StaleSession(session_id));
    }

    let plan = session.filing_type.plan();
    let question = plan.question(&section, &pending)?;
    let value = validate_answer(question.kind, raw)?;

    session.responses.merge(plan, &section, &pending, value)?;

    let outcome = match plan.advance(&section, &pending)? {
      Step::Ask(cursor) => {
        session.current_section = Some(cursor.section.to_owned());
        session.last_question_asked = Some(cursor.question.field.to_owned());
        AnswerOutcome::Next(Prompt::from_cursor(cursor))
      }
      Step::Complete => {
        session.state = SessionState::SectionComplete;
        session.current_section = None;
        session.last_question_asked = None;
        AnswerOutcome::ReadyToSubmit
      }
    };

    let expected = session.updated_at;
    session.updated_at = Utc::now();
    self
      .store()
      .update_session(session, expected)
      .await
      .map_err(Into::into)?;

    Ok(outcome)
  }

  /// Commit a completed interview: one filed fact per accumulated answer,
  /// then score the filing and raise (or refresh) its audit case.
  pub async fn submit(&self, session_id: Uuid) -> Result<Submission> {
    let session = self.get_session(session_id).await?;

    let facts: Vec<NewFiledFact> = session
      .responses
      .iter()
      .map(|(section, field, value)| NewFiledFact {
        pin:         session.pin.clone(),
        filing_type: session.filing_type,
        section:     section.to_owned(),
        field_name:  field.to_owned(),
        field_value: Some(value.to_owned()),
        session_id:  Some(session_id),
      })
      .collect();

    // The store re-checks the stored state inside the same transaction, so a
    // racing submit cannot commit twice.
    let facts = self
      .store()
      .submit_session(session_id, facts, AccessContext::taxpayer(session_id))
      .await
      .map_err(Into::into)?;

    tracing::info!(
      session_id = %session_id,
      fact_count = facts.len(),
      "session submitted"
    );

    let case = self.score_filing(&session.pin, session.filing_type).await?;
    Ok(Submission { facts, case })
  }
}

// ─── Answer validation ───────────────────────────────────────────────────────

/// Validate and canonicalise one raw answer according to its question kind.
fn validate_answer(kind: AnswerKind, raw: &str) -> Result<String> {
  match kind {
    AnswerKind::Text => Ok(sanitize_text(raw, MAX_TEXT_LEN)),
    AnswerKind::Amount => parse_amount(raw).map(|v| {
      if v.fract() == 0.0 {
        format!("{v:.0}")
      } else {
        format!("{v}")
      }
    }),
    AnswerKind::Date => chrono::NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
      .map(|d| d.format("%Y-%m-%d").to_string())
      .map_err(|_| Error::InvalidDate(raw.to_owned())),
    AnswerKind::YesNo => match raw.trim().to_ascii_lowercase().as_str() {
      "yes" | "y" | "true" => Ok("Yes".to_owned()),
      "no" | "n" | "false" => Ok("No".to_owned()),
      _ => Err(Error::MalformedResponses(format!(
        "expected yes/no, got {raw:?}"
      ))),
    },
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn amounts_are_canonicalised() {
    assert_eq!(
      validate_answer(AnswerKind::Amount, "KES 1,500,000").unwrap(),
      "1500000"
    );
    assert_eq!(
      validate_answer(AnswerKind::Amount, "150000.50").unwrap(),
      "150000.5"
    );
    assert!(validate_answer(AnswerKind::Amount, "maybe").is_err());
    assert!(validate_answer(AnswerKind::Amount, "-5000").is_err());
  }

  #[test]
  fn dates_must_be_iso() {
    assert_eq!(
      validate_answer(AnswerKind::Date, " 2024-03-14 ").unwrap(),
      "2024-03-14"
    );
    assert!(matches!(
      validate_answer(AnswerKind::Date, "14/03/2024"),
      Err(Error::InvalidDate(_))
    ));
  }

  #[test]
  fn yes_no_normalises() {
    assert_eq!(validate_answer(AnswerKind::YesNo, " YES ").unwrap(), "Yes");
    assert_eq!(validate_answer(AnswerKind::YesNo, "n").unwrap(), "No");
    assert!(validate_answer(AnswerKind::YesNo, "sure").is_err());
  }

  #[test]
  fn text_is_sanitised_and_capped() {
    let long = "x".repeat(600);
    assert_eq!(validate_answer(AnswerKind::Text, &long).unwrap().len(), 500);
  }
}
