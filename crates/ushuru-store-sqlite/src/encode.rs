//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, dates as `YYYY-MM-DD`, UUIDs as
//! hyphenated lowercase strings, enums via their strum string forms, and the
//! responses accumulator as compact JSON.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use ushuru_core::{
  access::{AccessAction, AccessLogEntry, UserRole},
  audit::{AuditCase, CaseStatus, RiskLevel},
  filing::FiledFact,
  pin::TaxpayerPin,
  plan::FilingType,
  session::{FilingSession, ResponseSet, SessionState},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> {
  Uuid::parse_str(s).map_err(|e| Error::Decode(format!("uuid {s:?}: {e}")))
}

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("timestamp {s:?}: {e}")))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::Decode(format!("date {s:?}: {e}")))
}

/// Decode any strum-backed enum column, naming the column on failure.
pub fn decode_enum<T: FromStr>(s: &str, column: &str) -> Result<T> {
  T::from_str(s).map_err(|_| Error::Decode(format!("{column}: unknown value {s:?}")))
}

pub fn decode_pin(s: &str) -> Result<TaxpayerPin> {
  TaxpayerPin::parse(s).map_err(Error::Core)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `filing_sessions` row.
pub struct RawSession {
  pub session_id:          String,
  pub taxpayer_pin:        String,
  pub filing_type:         String,
  pub state:               String,
  pub current_section:     Option<String>,
  pub last_question_asked: Option<String>,
  pub responses_json:      String,
  pub created_at:          String,
  pub updated_at:          String,
}

impl RawSession {
  pub fn into_session(self) -> Result<FilingSession> {
    let responses: ResponseSet = serde_json::from_str(&self.responses_json)
      .map_err(|e| {
        Error::Core(ushuru_core::Error::MalformedResponses(e.to_string()))
      })?;
    Ok(FilingSession {
      session_id: decode_uuid(&self.session_id)?,
      pin: decode_pin(&self.taxpayer_pin)?,
      filing_type: decode_enum::<FilingType>(&self.filing_type, "filing_type")?,
      state: decode_enum::<SessionState>(&self.state, "state")?,
      current_section: self.current_section,
      last_question_asked: self.last_question_asked,
      responses,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw strings read directly from a `filed_facts` row.
pub struct RawFiledFact {
  pub fact_id:      String,
  pub taxpayer_pin: String,
  pub filing_type:  String,
  pub section:      String,
  pub field_name:   String,
  pub field_value:  Option<String>,
  pub recorded_at:  String,
  pub session_id:   Option<String>,
}

impl RawFiledFact {
  pub fn into_fact(self) -> Result<FiledFact> {
    Ok(FiledFact {
      fact_id: decode_uuid(&self.fact_id)?,
      pin: decode_pin(&self.taxpayer_pin)?,
      filing_type: decode_enum::<FilingType>(&self.filing_type, "filing_type")?,
      section: self.section,
      field_name: self.field_name,
      field_value: self.field_value,
      recorded_at: decode_dt(&self.recorded_at)?,
      session_id: self.session_id.as_deref().map(decode_uuid).transpose()?,
    })
  }
}

/// Raw strings read directly from an `audit_cases` row.
pub struct RawCase {
  pub case_id:            i64,
  pub taxpayer_pin:       String,
  pub filing_type:        String,
  pub risk_score:         Option<i64>,
  pub risk_level:         Option<String>,
  pub reason:             Option<String>,
  pub declared_income:    Option<f64>,
  pub inferred_income:    Option<f64>,
  pub discrepancy_amount: Option<f64>,
  pub status:             String,
  pub created_at:         String,
}

impl RawCase {
  pub fn into_case(self) -> Result<AuditCase> {
    Ok(AuditCase {
      case_id: self.case_id,
      pin: decode_pin(&self.taxpayer_pin)?,
      filing_type: decode_enum::<FilingType>(&self.filing_type, "filing_type")?,
      risk_score: self.risk_score,
      risk_level: self
        .risk_level
        .as_deref()
        .map(|s| decode_enum::<RiskLevel>(s, "risk_level"))
        .transpose()?,
      reason: self.reason,
      declared_income: self.declared_income,
      inferred_income: self.inferred_income,
      discrepancy_amount: self.discrepancy_amount,
      status: decode_enum::<CaseStatus>(&self.status, "status")?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from an `access_logs` row.
pub struct RawAccessLog {
  pub id:            i64,
  pub at:            String,
  pub taxpayer_pin:  String,
  pub relation_name: Option<String>,
  pub action:        Option<String>,
  pub user_role:     Option<String>,
  pub session_id:    Option<String>,
  pub ip_address:    Option<String>,
}

impl RawAccessLog {
  pub fn into_entry(self) -> Result<AccessLogEntry> {
    Ok(AccessLogEntry {
      entry_id: self.id,
      at: decode_dt(&self.at)?,
      pin: decode_pin(&self.taxpayer_pin)?,
      relation: self.relation_name,
      action: self
        .action
        .as_deref()
        .map(|s| decode_enum::<AccessAction>(s, "action"))
        .transpose()?,
      role: self
        .user_role
        .as_deref()
        .map(|s| decode_enum::<UserRole>(s, "user_role"))
        .transpose()?,
      session_id: self.session_id.as_deref().map(decode_uuid).transpose()?,
      ip_address: self.ip_address,
    })
  }
}
