//! Truth-source aggregation: fold the six external sources into one
//! [`WealthProfile`] for a taxpayer.
//!
//! Each source is fetched under the configured time budget. A slow or failed
//! source degrades the profile (`complete = false`, source treated as empty)
//! rather than failing the run; scoring then proceeds at low confidence.

use std::{future::Future, time::Duration};

use chrono::NaiveDate;
use serde::Serialize;

use ushuru_core::{
  pin::TaxpayerPin,
  store::TaxStore,
  truth::{FlowDirection, MpesaDirection},
};

use crate::FilingEngine;

// ─── Profile types ───────────────────────────────────────────────────────────

/// How much weight the scorer should give the profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Confidence {
  #[serde(rename = "LOW")]
  Low,
  #[serde(rename = "HIGH")]
  High,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CashflowSummary {
  pub bank_inflows:  f64,
  pub bank_outflows: f64,
  pub bank_count:    usize,
  pub mpesa_inflows:  f64,
  pub mpesa_outflows: f64,
  pub mpesa_count:    usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AssetSummary {
  pub vehicle_count:  usize,
  pub vehicle_value:  f64,
  pub property_count: usize,
  pub property_value: f64,
  pub import_count:   usize,
  pub import_value:   f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LifestyleSummary {
  pub months_observed:  usize,
  pub avg_monthly_bill: f64,
  /// Average telco bill annualised; corroborative only, never added to the
  /// income estimate.
  pub annualized_spend: f64,
}

/// Everything the truth sources say about one taxpayer.
#[derive(Debug, Clone, Serialize)]
pub struct WealthProfile {
  pub pin:       TaxpayerPin,
  /// Dated records after this were out of scope for the build.
  pub as_of:     NaiveDate,
  pub cashflow:  CashflowSummary,
  pub assets:    AssetSummary,
  pub lifestyle: LifestyleSummary,
  /// False if any source timed out or failed during the build.
  pub complete:  bool,
}

/// The figures the scorer compares against the declared income.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct IncomeEstimate {
  pub inferred_income: f64,
  pub inferred_assets: f64,
  pub confidence:      Confidence,
}

impl WealthProfile {
  /// Derive the income estimate from the profile.
  ///
  /// Inferred income is net cash inflow across bank and mobile money,
  /// floored at zero. Confidence is `High` only for a complete build where
  /// every source had data to say.
  pub fn estimate(&self) -> IncomeEstimate {
    let inflows = self.cashflow.bank_inflows + self.cashflow.mpesa_inflows;
    let outflows = self.cashflow.bank_outflows + self.cashflow.mpesa_outflows;
    let inferred_income = (inflows - outflows).max(0.0);
    let inferred_assets =
      self.assets.vehicle_value + self.assets.property_value;

    let all_sources_present = self.cashflow.bank_count > 0
      && self.cashflow.mpesa_count > 0
      && self.assets.vehicle_count > 0
      && self.assets.property_count > 0
      && self.assets.import_count > 0
      && self.lifestyle.months_observed > 0;

    IncomeEstimate {
      inferred_income,
      inferred_assets,
      confidence: if self.complete && all_sources_present {
        Confidence::High
      } else {
        Confidence::Low
      },
    }
  }
}

// ─── Aggregation ─────────────────────────────────────────────────────────────

impl<S: TaxStore> FilingEngine<S> {
  /// The income estimate for `pin` as of `as_of`. Deterministic for a given
  /// set of truth records.
  pub async fn estimate_income(
    &self,
    pin: &TaxpayerPin,
    as_of: NaiveDate,
  ) -> IncomeEstimate {
    self.build_wealth_profile(pin, as_of).await.estimate()
  }

  /// Build the wealth profile for `pin` from all six truth sources. Dated
  /// records after `as_of` are out of scope.
  pub async fn build_wealth_profile(
    &self,
    pin: &TaxpayerPin,
    as_of: NaiveDate,
  ) -> WealthProfile {
    let mut complete = true;
    let store = self.store();

    let mut bank = self
      .fetch_source("bank", store.bank_transactions(pin.clone()), &mut complete)
      .await;
    let mut mpesa = self
      .fetch_source("mpesa", store.mpesa_transactions(pin.clone()), &mut complete)
      .await;
    let mut vehicles = self
      .fetch_source("vehicles", store.vehicle_assets(pin.clone()), &mut complete)
      .await;
    let properties = self
      .fetch_source("properties", store.property_assets(pin.clone()), &mut complete)
      .await;
    let mut imports = self
      .fetch_source("imports", store.import_records(pin.clone()), &mut complete)
      .await;
    let mut telco = self
      .fetch_source("telco", store.telco_usage(pin.clone()), &mut complete)
      .await;

    bank.retain(|t| t.date <= as_of);
    mpesa.retain(|t| t.date <= as_of);
    vehicles.retain(|v| v.purchase_date <= as_of);
    imports.retain(|i| i.date <= as_of);
    let month = as_of.format("%Y-%m").to_string();
    telco.retain(|t| t.month <= month);

    let mut cashflow = CashflowSummary::default();
    for t in &bank {
      match t.direction {
        FlowDirection::Credit => cashflow.bank_inflows += t.amount,
        FlowDirection::Debit => cashflow.bank_outflows += t.amount,
      }
    }
    cashflow.bank_count = bank.len();
    for t in &mpesa {
      match t.direction {
        MpesaDirection::Receive => cashflow.mpesa_inflows += t.amount,
        MpesaDirection::Send => cashflow.mpesa_outflows += t.amount,
      }
    }
    cashflow.mpesa_count = mpesa.len();

    let assets = AssetSummary {
      vehicle_count:  vehicles.len(),
      vehicle_value:  vehicles.iter().map(|v| v.estimated_value).sum(),
      property_count: properties.len(),
      property_value: properties.iter().map(|p| p.estimated_value).sum(),
      import_count:   imports.len(),
      import_value:   imports.iter().map(|i| i.value).sum(),
    };

    let months = telco.len();
    let avg_bill = if months > 0 {
      telco.iter().map(|t| t.monthly_bill).sum::<f64>() / months as f64
    } else {
      0.0
    };
    let lifestyle = LifestyleSummary {
      months_observed:  months,
      avg_monthly_bill: avg_bill,
      annualized_spend: avg_bill * 12.0,
    };

    WealthProfile { pin: pin.clone(), as_of, cashflow, assets, lifestyle, complete }
  }

  async fn fetch_source<T>(
    &self,
    source: &'static str,
    fut: impl Future<Output = Result<Vec<T>, S::Error>>,
    complete: &mut bool,
  ) -> Vec<T> {
    let budget = Duration::from_millis(self.config().source_timeout_ms);
    match tokio::time::timeout(budget, fut).await {
      Ok(Ok(rows)) => rows,
      Ok(Err(e)) => {
        tracing::warn!(source, error = %e, "truth source failed; degrading");
        *complete = false;
        Vec::new()
      }
      Err(_) => {
        tracing::warn!(source, "truth source timed out; degrading");
        *complete = false;
        Vec::new()
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn pin() -> TaxpayerPin {
    TaxpayerPin::parse("A012345678P").unwrap()
  }

  fn empty_profile() -> WealthProfile {
    WealthProfile {
      pin:       pin(),
      as_of:     NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
      cashflow:  CashflowSummary::default(),
      assets:    AssetSummary::default(),
      lifestyle: LifestyleSummary::default(),
      complete:  true,
    }
  }

  #[test]
  fn empty_profile_estimates_zero_at_low_confidence() {
    let est = empty_profile().estimate();
    assert_eq!(est.inferred_income, 0.0);
    assert_eq!(est.inferred_assets, 0.0);
    assert_eq!(est.confidence, Confidence::Low);
  }

  #[test]
  fn net_outflow_floors_income_at_zero() {
    let mut profile = empty_profile();
    profile.cashflow.bank_inflows = 10_000.0;
    profile.cashflow.bank_outflows = 50_000.0;
    profile.cashflow.bank_count = 4;
    assert_eq!(profile.estimate().inferred_income, 0.0);
  }

  #[test]
  fn incomplete_build_is_never_high_confidence() {
    let mut profile = empty_profile();
    profile.cashflow.bank_count = 1;
    profile.cashflow.mpesa_count = 1;
    profile.assets.vehicle_count = 1;
    profile.assets.property_count = 1;
    profile.assets.import_count = 1;
    profile.lifestyle.months_observed = 1;
    assert_eq!(profile.estimate().confidence, Confidence::High);

    profile.complete = false;
    assert_eq!(profile.estimate().confidence, Confidence::Low);
  }
}
