//! Audit cases — scored, reviewable flags raised against a filing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{pin::TaxpayerPin, plan::FilingType};

// ─── Risk level ──────────────────────────────────────────────────────────────

/// Ordered categorical risk scale. Ordering follows declaration order, so
/// `Low < Medium < High < Critical`.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord,
  Serialize, Deserialize, Display, EnumString,
)]
pub enum RiskLevel {
  #[serde(rename = "LOW")]
  #[strum(serialize = "LOW")]
  Low,
  #[serde(rename = "MEDIUM")]
  #[strum(serialize = "MEDIUM")]
  Medium,
  #[serde(rename = "HIGH")]
  #[strum(serialize = "HIGH")]
  High,
  #[serde(rename = "CRITICAL")]
  #[strum(serialize = "CRITICAL")]
  Critical,
}

// ─── Status ──────────────────────────────────────────────────────────────────

/// Review-workflow status. The scoring engine only ever writes `New`;
/// transitions beyond that belong to the review tooling.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
  Serialize, Deserialize, Display, EnumString,
)]
pub enum CaseStatus {
  #[serde(rename = "NEW")]
  #[strum(serialize = "NEW")]
  New,
  #[serde(rename = "IN_REVIEW")]
  #[strum(serialize = "IN_REVIEW")]
  InReview,
  #[serde(rename = "CLOSED")]
  #[strum(serialize = "CLOSED")]
  Closed,
}

impl CaseStatus {
  pub fn is_open(self) -> bool { matches!(self, Self::New) }
}

// ─── Case ────────────────────────────────────────────────────────────────────

/// A persisted audit case. Scoring fields are nullable in the persisted
/// contract (a collaborator may stage an unscored case); the scoring engine
/// always writes them populated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditCase {
  pub case_id:            i64,
  pub pin:                TaxpayerPin,
  pub filing_type:        FilingType,
  pub risk_score:         Option<i64>,
  pub risk_level:         Option<RiskLevel>,
  pub reason:             Option<String>,
  pub declared_income:    Option<f64>,
  pub inferred_income:    Option<f64>,
  pub discrepancy_amount: Option<f64>,
  pub status:             CaseStatus,
  pub created_at:         DateTime<Utc>,
}

/// Input to [`crate::store::TaxStore::upsert_new_case`]. The discrepancy is
/// derived, not accepted: it always equals `inferred − declared`.
#[derive(Debug, Clone)]
pub struct NewAuditCase {
  pub pin:             TaxpayerPin,
  pub filing_type:     FilingType,
  pub risk_score:      i64,
  pub risk_level:      RiskLevel,
  pub reason:          String,
  pub declared_income: f64,
  pub inferred_income: f64,
}

impl NewAuditCase {
  pub fn discrepancy_amount(&self) -> f64 {
    self.inferred_income - self.declared_income
  }
}

/// Filter for [`crate::store::TaxStore::audit_cases`].
#[derive(Debug, Clone, Default)]
pub struct CaseFilter {
  pub pin:        Option<TaxpayerPin>,
  pub risk_level: Option<RiskLevel>,
  pub status:     Option<CaseStatus>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn risk_levels_are_ordered() {
    assert!(RiskLevel::Low < RiskLevel::Medium);
    assert!(RiskLevel::Medium < RiskLevel::High);
    assert!(RiskLevel::High < RiskLevel::Critical);
  }

  #[test]
  fn discrepancy_is_inferred_minus_declared() {
    let case = NewAuditCase {
      pin:             TaxpayerPin::parse("A012345678P").unwrap(),
      filing_type:     FilingType::It1,
      risk_score:      30,
      risk_level:      RiskLevel::High,
      reason:          String::new(),
      declared_income: 100_000.0,
      inferred_income: 150_000.0,
    };
    assert_eq!(case.discrepancy_amount(), 50_000.0);
  }
}
