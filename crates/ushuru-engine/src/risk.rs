//! Risk scoring: compare a filing's declared income against the wealth
//! profile and raise (or refresh) the taxpayer's open audit case.
//!
//! Scoring is deterministic: the same declared figure and the same profile
//! always produce the same score, level, and reason. Every scored filing
//! writes a case — low-risk cases exist too, so reviewers see the full
//! picture rather than only the flagged tail.

use serde::Deserialize;

use ushuru_core::{
  Error, Result,
  access::AccessContext,
  audit::{AuditCase, NewAuditCase, RiskLevel},
  money::lenient_amount,
  pin::TaxpayerPin,
  plan::FilingType,
  store::TaxStore,
};

use crate::{
  FilingEngine,
  aggregate::{Confidence, IncomeEstimate, WealthProfile},
};

// ─── Config ──────────────────────────────────────────────────────────────────

/// Level thresholds and penalties. Defaults are tuned so a filing that
/// understates income by half lands at `High`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
  pub medium_threshold:       i64,
  pub high_threshold:         i64,
  pub critical_threshold:     i64,
  /// Subtracted when the wealth profile is low-confidence.
  pub low_confidence_penalty: i64,
}

impl Default for ScoringConfig {
  fn default() -> Self {
    Self {
      medium_threshold:       15,
      high_threshold:         30,
      critical_threshold:     60,
      low_confidence_penalty: 10,
    }
  }
}

impl ScoringConfig {
  pub fn level_for(&self, score: i64) -> RiskLevel {
    if score >= self.critical_threshold {
      RiskLevel::Critical
    } else if score >= self.high_threshold {
      RiskLevel::High
    } else if score >= self.medium_threshold {
      RiskLevel::Medium
    } else {
      RiskLevel::Low
    }
  }
}

// ─── Point tables ────────────────────────────────────────────────────────────

/// (understatement percentage floor, points).
const UNDERSTATEMENT_BANDS: [(f64, i64); 5] =
  [(200.0, 60), (100.0, 50), (50.0, 40), (20.0, 25), (0.0, 10)];

/// A nil return counts as this understatement percentage.
const NIL_RETURN_PCT: f64 = 100.0;

/// Extra points for a nil return filed over substantial visible activity.
const NIL_RETURN_BONUS: i64 = 20;
const NIL_RETURN_ACTIVITY_FLOOR: f64 = 1_000_000.0;

const VEHICLE_VALUE_MAJOR: f64 = 20_000_000.0;
const VEHICLE_VALUE_MINOR: f64 = 10_000_000.0;
const PROPERTY_VALUE_MAJOR: f64 = 50_000_000.0;
const PROPERTY_VALUE_MINOR: f64 = 20_000_000.0;
const IMPORT_VALUE_NOTABLE: f64 = 5_000_000.0;

const MAX_SCORE: i64 = 100;

// ─── Scoring ─────────────────────────────────────────────────────────────────

/// One scored component with its human-readable justification.
struct Component {
  points: i64,
  reason: String,
}

fn understatement_component(
  declared: f64,
  estimate: &IncomeEstimate,
) -> Option<Component> {
  let inferred = estimate.inferred_income;
  if inferred <= 0.0 || inferred <= declared {
    return None;
  }
  let pct = if declared <= 0.0 {
    NIL_RETURN_PCT
  } else {
    (inferred - declared) / declared * 100.0
  };
  let mut points = UNDERSTATEMENT_BANDS
    .iter()
    .find(|(floor, _)| pct >= *floor)
    .map(|(_, pts)| *pts)
    .unwrap_or(0);
  let reason = if declared <= 0.0 {
    if inferred > NIL_RETURN_ACTIVITY_FLOOR {
      points += NIL_RETURN_BONUS;
    }
    format!("Nil return filed against KES {inferred:.0} of visible cash inflows")
  } else {
    format!("Income understated by {pct:.0}% against cash inflows")
  };
  Some(Component { points, reason })
}

fn asset_components(profile: &WealthProfile) -> Vec<Component> {
  let mut out = Vec::new();
  let assets = &profile.assets;

  let vehicle_points = if assets.vehicle_value > VEHICLE_VALUE_MAJOR {
    25
  } else if assets.vehicle_value > VEHICLE_VALUE_MINOR {
    15
  } else if assets.vehicle_count >= 2 {
    10
  } else {
    0
  };
  if vehicle_points > 0 {
    out.push(Component {
      points: vehicle_points,
      reason: format!(
        "{} vehicle(s) on record worth KES {:.0}",
        assets.vehicle_count, assets.vehicle_value
      ),
    });
  }

  let property_points = if assets.property_value > PROPERTY_VALUE_MAJOR {
    25
  } else if assets.property_value > PROPERTY_VALUE_MINOR {
    15
  } else if assets.property_count >= 3 {
    10
  } else {
    0
  };
  if property_points > 0 {
    out.push(Component {
      points: property_points,
      reason: format!(
        "{} property record(s) worth KES {:.0}",
        assets.property_count, assets.property_value
      ),
    });
  }

  if assets.import_value > IMPORT_VALUE_NOTABLE {
    out.push(Component {
      points: 15,
      reason: format!(
        "Customs imports worth KES {:.0}",
        assets.import_value
      ),
    });
  }

  out
}

/// Score one filing. Pure: no I/O, no clock.
fn score(
  config: &ScoringConfig,
  declared: f64,
  profile: &WealthProfile,
  estimate: &IncomeEstimate,
) -> (i64, RiskLevel, String) {
  let mut components = Vec::new();
  if let Some(c) = understatement_component(declared, estimate) {
    components.push(c);
  }
  components.extend(asset_components(profile));

  let mut total: i64 = components.iter().map(|c| c.points).sum();
  let mut reasons: Vec<String> =
    components.into_iter().map(|c| c.reason).collect();

  if estimate.confidence == Confidence::Low && total > 0 {
    total -= config.low_confidence_penalty;
    reasons.push("Profile incomplete; scored at low confidence".to_owned());
  }

  let total = total.clamp(0, MAX_SCORE);
  let reason = if reasons.is_empty() {
    "No discrepancy detected".to_owned()
  } else {
    reasons.join(" | ")
  };
  (total, config.level_for(total), reason)
}

// ─── Engine entry point ──────────────────────────────────────────────────────

impl<S: TaxStore> FilingEngine<S> {
  /// Score the latest declared income for `pin` / `filing_type` and upsert
  /// the taxpayer's open audit case.
  pub async fn score_filing(
    &self,
    pin: &TaxpayerPin,
    filing_type: FilingType,
  ) -> Result<AuditCase> {
    let field = filing_type.plan().declared_income_field;
    let fact = self
      .store()
      .latest_filed_value(
        pin.clone(),
        filing_type,
        field.to_owned(),
        AccessContext::system(),
      )
      .await
      .map_err(Into::into)?
      .ok_or_else(|| Error::DeclaredIncomeMissing {
        pin:         pin.to_string(),
        filing_type: filing_type.to_string(),
      })?;

    let declared = lenient_amount(fact.field_value.as_deref().unwrap_or(""));
    let as_of = chrono::Utc::now().date_naive();
    let profile = self.build_wealth_profile(pin, as_of).await;
    let estimate = profile.estimate();

    let (risk_score, risk_level, reason) =
      score(&self.config().scoring, declared, &profile, &estimate);

    tracing::info!(
      %pin,
      %filing_type,
      risk_score,
      %risk_level,
      "filing scored"
    );

    self
      .store()
      .upsert_new_case(NewAuditCase {
        pin: pin.clone(),
        filing_type,
        risk_score,
        risk_level,
        reason,
        declared_income: declared,
        inferred_income: estimate.inferred_income,
      })
      .await
      .map_err(Into::into)
  }
}
