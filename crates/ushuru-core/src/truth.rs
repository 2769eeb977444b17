//! Truth records — the six independent, externally-supplied sources used to
//! corroborate declared income.
//!
//! All records are immutable once ingested and read-only to the core. The
//! per-source structs are what the aggregator consumes; [`TruthRecord`] is
//! the single ingestion envelope so the store exposes one append operation
//! rather than six.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::pin::TaxpayerPin;

// ─── Directions ──────────────────────────────────────────────────────────────

/// Bank transaction direction.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
  Serialize, Deserialize, Display, EnumString,
)]
pub enum FlowDirection {
  #[serde(rename = "CREDIT")]
  #[strum(serialize = "CREDIT")]
  Credit,
  #[serde(rename = "DEBIT")]
  #[strum(serialize = "DEBIT")]
  Debit,
}

/// Mobile-money transaction direction.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
  Serialize, Deserialize, Display, EnumString,
)]
pub enum MpesaDirection {
  #[serde(rename = "RECEIVE")]
  #[strum(serialize = "RECEIVE")]
  Receive,
  #[serde(rename = "SEND")]
  #[strum(serialize = "SEND")]
  Send,
}

// ─── Per-source records ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankTransaction {
  pub pin:       TaxpayerPin,
  pub date:      NaiveDate,
  pub amount:    f64,
  pub direction: FlowDirection,
  pub balance:   f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MpesaTransaction {
  pub pin:       TaxpayerPin,
  pub date:      NaiveDate,
  pub direction: MpesaDirection,
  pub amount:    f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleAsset {
  pub pin:                 TaxpayerPin,
  pub registration_number: String,
  pub make:                String,
  pub model:               String,
  pub estimated_value:     f64,
  pub purchase_date:       NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyAsset {
  pub pin:             TaxpayerPin,
  pub lr_number:       String,
  pub location:        String,
  pub property_type:   String,
  pub estimated_value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRecord {
  pub pin:           TaxpayerPin,
  pub date:          NaiveDate,
  pub description:   String,
  pub value:         f64,
  pub customs_entry: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelcoUsage {
  pub pin:           TaxpayerPin,
  /// Calendar month, `YYYY-MM`.
  pub month:         String,
  pub calls_made:    u32,
  pub data_usage_gb: f64,
  pub monthly_bill:  f64,
}

// ─── Ingestion envelope ──────────────────────────────────────────────────────

/// A truth record of any source category, for append-only ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum TruthRecord {
  Bank(BankTransaction),
  Mpesa(MpesaTransaction),
  Vehicle(VehicleAsset),
  Property(PropertyAsset),
  Import(ImportRecord),
  Telco(TelcoUsage),
}

impl TruthRecord {
  pub fn pin(&self) -> &TaxpayerPin {
    match self {
      Self::Bank(r) => &r.pin,
      Self::Mpesa(r) => &r.pin,
      Self::Vehicle(r) => &r.pin,
      Self::Property(r) => &r.pin,
      Self::Import(r) => &r.pin,
      Self::Telco(r) => &r.pin,
    }
  }

  /// The relation name recorded in the access log when this record is
  /// written or read.
  pub fn relation(&self) -> &'static str {
    match self {
      Self::Bank(_) => "bank_transactions",
      Self::Mpesa(_) => "mpesa_transactions",
      Self::Vehicle(_) => "vehicle_assets",
      Self::Property(_) => "property_assets",
      Self::Import(_) => "import_records",
      Self::Telco(_) => "telco_usage",
    }
  }
}
