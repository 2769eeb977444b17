//! Filing plans — the section/question graph each interview walks.
//!
//! A plan is static data: an ordered list of sections, each an ordered list
//! of questions. The session engine keeps a cursor (current section + pending
//! question) into the plan; it never invents questions, so every response key
//! is known ahead of time. The plans here are condensed from the IT1 and VAT3
//! return forms.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{Error, Result};

// ─── Filing type ─────────────────────────────────────────────────────────────

/// The return form a session fills in.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash,
  Serialize, Deserialize, Display, EnumString,
)]
pub enum FilingType {
  #[serde(rename = "IT1")]
  #[strum(serialize = "IT1")]
  It1,
  #[serde(rename = "VAT3")]
  #[strum(serialize = "VAT3")]
  Vat3,
}

impl FilingType {
  /// Parse a wire string, mapping failure to the validation taxonomy.
  pub fn parse(raw: &str) -> Result<Self> {
    Self::from_str(raw.trim())
      .map_err(|_| Error::InvalidFilingType(raw.to_owned()))
  }

  pub fn plan(self) -> &'static FilingPlan {
    match self {
      Self::It1 => &IT1_PLAN,
      Self::Vat3 => &VAT3_PLAN,
    }
  }
}

// ─── Plan data ───────────────────────────────────────────────────────────────

/// How an answer to a question is validated before it is merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerKind {
  Text,
  Amount,
  Date,
  YesNo,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Question {
  pub field:  &'static str,
  pub prompt: &'static str,
  pub kind:   AnswerKind,
}

#[derive(Debug)]
pub struct SectionPlan {
  pub id:        &'static str,
  pub questions: &'static [Question],
}

/// The full interview graph for one filing type.
#[derive(Debug)]
pub struct FilingPlan {
  pub filing_type:           FilingType,
  pub sections:              &'static [SectionPlan],
  /// Field name the Risk Scoring Engine reads as the declared figure.
  pub declared_income_field: &'static str,
}

/// A position in a plan: one concrete question inside one section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
  pub section:  &'static str,
  pub question: &'static Question,
}

/// Where the interview goes after an answer is merged.
#[derive(Debug, Clone, Copy)]
pub enum Step {
  Ask(Cursor),
  /// All sections answered; the session may be submitted.
  Complete,
}

impl FilingPlan {
  pub fn first(&self) -> Cursor {
    let section = &self.sections[0];
    Cursor {
      section:  section.id,
      question: &section.questions[0],
    }
  }

  pub fn section(&self, id: &str) -> Result<&'static SectionPlan> {
    self
      .sections
      .iter()
      .find(|s| s.id == id)
      .ok_or_else(|| Error::UnknownSection {
        filing_type: self.filing_type.to_string(),
        section:     id.to_owned(),
      })
  }

  /// Look up a question by section and field name.
  pub fn question(&self, section: &str, field: &str) -> Result<&'static Question> {
    self
      .section(section)?
      .questions
      .iter()
      .find(|q| q.field == field)
      .ok_or_else(|| Error::UnknownField {
        section: section.to_owned(),
        field:   field.to_owned(),
      })
  }

  /// The cursor after answering `field` in `section`.
  pub fn advance(&self, section: &str, field: &str) -> Result<Step> {
    let idx = self
      .sections
      .iter()
      .position(|s| s.id == section)
      .ok_or_else(|| Error::UnknownSection {
        filing_type: self.filing_type.to_string(),
        section:     section.to_owned(),
      })?;

    let current = &self.sections[idx];
    let q_idx = current
      .questions
      .iter()
      .position(|q| q.field == field)
      .ok_or_else(|| Error::UnknownField {
        section: section.to_owned(),
        field:   field.to_owned(),
      })?;

    if let Some(next) = current.questions.get(q_idx + 1) {
      return Ok(Step::Ask(Cursor { section: current.id, question: next }));
    }
    match self.sections.get(idx + 1) {
      Some(next_section) => Ok(Step::Ask(Cursor {
        section:  next_section.id,
        question: &next_section.questions[0],
      })),
      None => Ok(Step::Complete),
    }
  }

  /// Total number of questions across all sections.
  pub fn question_count(&self) -> usize {
    self.sections.iter().map(|s| s.questions.len()).sum()
  }
}

// ─── IT1 — individual income return ──────────────────────────────────────────

pub static IT1_PLAN: FilingPlan = FilingPlan {
  filing_type:           FilingType::It1,
  declared_income_field: "declared_income",
  sections:              &[
    SectionPlan {
      id:        "A_PART1",
      questions: &[
        Question {
          field:  "return_type",
          prompt: "Type of return? (Original/Amended)",
          kind:   AnswerKind::Text,
        },
        Question {
          field:  "period_from",
          prompt: "Return period from? (YYYY-MM-DD)",
          kind:   AnswerKind::Date,
        },
        Question {
          field:  "period_to",
          prompt: "Return period to? (YYYY-MM-DD)",
          kind:   AnswerKind::Date,
        },
      ],
    },
    SectionPlan {
      id:        "A_PART2",
      questions: &[
        Question {
          field:  "bank_name",
          prompt: "Bank name?",
          kind:   AnswerKind::Text,
        },
        Question {
          field:  "branch_name",
          prompt: "Branch name?",
          kind:   AnswerKind::Text,
        },
        Question {
          field:  "account_number",
          prompt: "Account number?",
          kind:   AnswerKind::Text,
        },
      ],
    },
    SectionPlan {
      id:        "F",
      questions: &[
        Question {
          field:  "employer_pin",
          prompt: "PIN of employer?",
          kind:   AnswerKind::Text,
        },
        Question {
          field:  "gross_pay",
          prompt: "Gross pay (KES)?",
          kind:   AnswerKind::Amount,
        },
        Question {
          field:  "allowances",
          prompt: "Allowances and benefits (KES)?",
          kind:   AnswerKind::Amount,
        },
        Question {
          field:  "declared_income",
          prompt: "Total declared income for the period (KES)?",
          kind:   AnswerKind::Amount,
        },
      ],
    },
    SectionPlan {
      id:        "M",
      questions: &[Question {
        field:  "paye_deducted",
        prompt: "Amount of PAYE deducted (KES)?",
        kind:   AnswerKind::Amount,
      }],
    },
  ],
};

// ─── VAT3 — VAT return ───────────────────────────────────────────────────────

pub static VAT3_PLAN: FilingPlan = FilingPlan {
  filing_type:           FilingType::Vat3,
  declared_income_field: "taxable_value",
  sections:              &[
    SectionPlan {
      id:        "VAT_A",
      questions: &[
        Question {
          field:  "return_type",
          prompt: "Type of return? (Original/Amended)",
          kind:   AnswerKind::Text,
        },
        Question {
          field:  "entity_type",
          prompt: "Entity type? (Head Office/Branch)",
          kind:   AnswerKind::Text,
        },
        Question {
          field:  "period_from",
          prompt: "Return period from? (YYYY-MM-DD)",
          kind:   AnswerKind::Date,
        },
        Question {
          field:  "period_to",
          prompt: "Return period to? (YYYY-MM-DD)",
          kind:   AnswerKind::Date,
        },
      ],
    },
    SectionPlan {
      id:        "VAT_B",
      questions: &[
        Question {
          field:  "sales_registered",
          prompt: "Total sales to VAT-registered customers (KES)?",
          kind:   AnswerKind::Amount,
        },
        Question {
          field:  "sales_non_registered",
          prompt: "Total sales to non-registered customers (KES)?",
          kind:   AnswerKind::Amount,
        },
        Question {
          field:  "taxable_value",
          prompt: "Taxable value (KES)?",
          kind:   AnswerKind::Amount,
        },
      ],
    },
    SectionPlan {
      id:        "VAT_F",
      questions: &[
        Question {
          field:  "local_purchases",
          prompt: "Total purchases from VAT-registered suppliers (KES)?",
          kind:   AnswerKind::Amount,
        },
        Question {
          field:  "import_purchases",
          prompt: "Total purchases from imports (KES)?",
          kind:   AnswerKind::Amount,
        },
      ],
    },
  ],
};

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn filing_type_round_trips_through_strings() {
    assert_eq!(FilingType::parse("IT1").unwrap(), FilingType::It1);
    assert_eq!(FilingType::parse(" VAT3 ").unwrap(), FilingType::Vat3);
    assert!(matches!(
      FilingType::parse("IT2"),
      Err(Error::InvalidFilingType(_))
    ));
  }

  #[test]
  fn advance_walks_every_question_exactly_once() {
    let plan = FilingType::It1.plan();
    let mut cursor = plan.first();
    let mut visited = vec![(cursor.section, cursor.question.field)];

    loop {
      match plan.advance(cursor.section, cursor.question.field).unwrap() {
        Step::Ask(next) => {
          visited.push((next.section, next.question.field));
          cursor = next;
        }
        Step::Complete => break,
      }
    }

    assert_eq!(visited.len(), plan.question_count());
    assert_eq!(visited[0], ("A_PART1", "return_type"));
    assert_eq!(*visited.last().unwrap(), ("M", "paye_deducted"));
  }

  #[test]
  fn cursors_compare_by_position() {
    let plan = FilingType::It1.plan();
    assert_eq!(plan.first(), plan.first());
    match plan.advance("A_PART1", "return_type").unwrap() {
      Step::Ask(next) => assert_ne!(next, plan.first()),
      Step::Complete => panic!("plan ended early"),
    }
  }

  #[test]
  fn advance_crosses_section_boundaries() {
    let plan = FilingType::It1.plan();
    match plan.advance("A_PART1", "period_to").unwrap() {
      Step::Ask(c) => {
        assert_eq!(c.section, "A_PART2");
        assert_eq!(c.question.field, "bank_name");
      }
      Step::Complete => panic!("expected another section"),
    }
  }

  #[test]
  fn unknown_field_is_rejected() {
    let plan = FilingType::Vat3.plan();
    assert!(matches!(
      plan.advance("VAT_A", "nonexistent"),
      Err(Error::UnknownField { .. })
    ));
  }

  #[test]
  fn declared_income_field_exists_in_each_plan() {
    for ft in [FilingType::It1, FilingType::Vat3] {
      let plan = ft.plan();
      let found = plan
        .sections
        .iter()
        .flat_map(|s| s.questions)
        .any(|q| q.field == plan.declared_income_field);
      assert!(found, "{ft} plan is missing its declared-income field");
    }
  }
}
