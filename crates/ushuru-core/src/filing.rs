//! Filed facts — immutable committed answers.
//!
//! A filed fact is one (section, field, value) triple committed from an
//! interview (or supplied by an external ingestion job, in which case
//! `session_id` is absent). Facts are append-only: re-filing writes new rows,
//! and history is never rewritten.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{pin::TaxpayerPin, plan::FilingType};

/// One committed answer. Once written, no field is ever updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FiledFact {
  pub fact_id:     Uuid,
  pub pin:         TaxpayerPin,
  pub filing_type: FilingType,
  pub section:     String,
  pub field_name:  String,
  pub field_value: Option<String>,
  /// Server-assigned timestamp; never changes after creation.
  pub recorded_at: DateTime<Utc>,
  /// Originating interview session; `None` for ingestion-sourced facts.
  pub session_id:  Option<Uuid>,
}

/// Input to [`crate::store::TaxStore::record_filed_fact`].
/// `recorded_at` is always set by the store; it is not accepted from callers.
#[derive(Debug, Clone)]
pub struct NewFiledFact {
  pub pin:         TaxpayerPin,
  pub filing_type: FilingType,
  pub section:     String,
  pub field_name:  String,
  pub field_value: Option<String>,
  pub session_id:  Option<Uuid>,
}
