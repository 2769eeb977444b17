//! Filing sessions — the mutable interview state that precedes committed
//! filed facts.
//!
//! A session accumulates answers while `Collecting`, flips to
//! `SectionComplete` once the plan's last question is answered, and becomes
//! `Submitted` (terminal) when its answers are committed as filed facts.
//! Sessions are never deleted; a submitted session is the audit trail of the
//! interview itself.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::{
  Error, Result,
  pin::TaxpayerPin,
  plan::{FilingPlan, FilingType},
};

// ─── State ───────────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
  Serialize, Deserialize, Display, EnumString,
)]
pub enum SessionState {
  #[serde(rename = "COLLECTING")]
  #[strum(serialize = "COLLECTING")]
  Collecting,
  #[serde(rename = "SECTION_COMPLETE")]
  #[strum(serialize = "SECTION_COMPLETE")]
  SectionComplete,
  #[serde(rename = "SUBMITTED")]
  #[strum(serialize = "SUBMITTED")]
  Submitted,
}

impl SessionState {
  pub fn is_terminal(self) -> bool { matches!(self, Self::Submitted) }
}

// ─── Responses ───────────────────────────────────────────────────────────────

/// Per-section answer capacity for fields outside the plan. Keeps the
/// forward-compatibility escape hatch bounded.
pub const MAX_EXTRA_FIELDS: usize = 16;

/// The typed answer accumulator: section → field → value.
///
/// Only grows while the session is live. Fields named in the plan are always
/// accepted; unknown fields are tolerated up to [`MAX_EXTRA_FIELDS`] per
/// section so non-interview collaborators can stash forward-compatible
/// extras without turning the accumulator into a free-for-all.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponseSet {
  sections: BTreeMap<String, BTreeMap<String, String>>,
}

impl ResponseSet {
  pub fn new() -> Self { Self::default() }

  /// Merge one answer, validating the field against `plan`.
  pub fn merge(
    &mut self,
    plan: &FilingPlan,
    section: &str,
    field: &str,
    value: String,
  ) -> Result<()> {
    let section_plan = plan.section(section)?;
    let known = section_plan.questions.iter().any(|q| q.field == field);

    let answers = self.sections.entry(section.to_owned()).or_default();
    if !known {
      let extras = answers
        .keys()
        .filter(|f| !section_plan.questions.iter().any(|q| &q.field == f))
        .count();
      if extras >= MAX_EXTRA_FIELDS && !answers.contains_key(field) {
        return Err(Error::UnknownField {
          section: section.to_owned(),
          field:   field.to_owned(),
        });
      }
    }
    answers.insert(field.to_owned(), value);
    Ok(())
  }

  pub fn get(&self, section: &str, field: &str) -> Option<&str> {
    self
      .sections
      .get(section)
      .and_then(|s| s.get(field))
      .map(String::as_str)
  }

  /// Number of distinct (section, field) answers recorded.
  pub fn answer_count(&self) -> usize {
    self.sections.values().map(BTreeMap::len).sum()
  }

  /// Iterate all answers in section/field order.
  pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &str)> {
    self.sections.iter().flat_map(|(section, answers)| {
      answers
        .iter()
        .map(move |(field, value)| (section.as_str(), field.as_str(), value.as_str()))
    })
  }
}

// ─── Session ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilingSession {
  pub session_id:          Uuid,
  pub pin:                 TaxpayerPin,
  pub filing_type:         FilingType,
  pub state:               SessionState,
  /// `None` once the interview has run out of sections.
  pub current_section:     Option<String>,
  /// The question (field name) whose answer is pending. Doubles as the
  /// optimistic-concurrency token for [`recordAnswer`-style] retries.
  pub last_question_asked: Option<String>,
  pub responses:           ResponseSet,
  pub created_at:          DateTime<Utc>,
  pub updated_at:          DateTime<Utc>,
}

impl FilingSession {
  /// A fresh session positioned at the plan's first question.
  pub fn start(pin: TaxpayerPin, filing_type: FilingType) -> Self {
    let cursor = filing_type.plan().first();
    let now = Utc::now();
    Self {
      session_id: Uuid::new_v4(),
      pin,
      filing_type,
      state: SessionState::Collecting,
      current_section: Some(cursor.section.to_owned()),
      last_question_asked: Some(cursor.question.field.to_owned()),
      responses: ResponseSet::new(),
      created_at: now,
      updated_at: now,
    }
  }
}
