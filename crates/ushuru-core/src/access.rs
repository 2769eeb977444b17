//! Access log — the append-only trail mirrored from every touch of
//! taxpayer-scoped data.
//!
//! Entries are never updated or deleted. Writes are best-effort from the
//! caller's perspective: a failed log append is reported internally but must
//! never fail the business operation that triggered it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::pin::TaxpayerPin;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
  Serialize, Deserialize, Display, EnumString,
)]
pub enum AccessAction {
  #[serde(rename = "READ")]
  #[strum(serialize = "READ")]
  Read,
  #[serde(rename = "WRITE")]
  #[strum(serialize = "WRITE")]
  Write,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
  Serialize, Deserialize, Display, EnumString,
)]
pub enum UserRole {
  #[serde(rename = "TAXPAYER")]
  #[strum(serialize = "TAXPAYER")]
  Taxpayer,
  #[serde(rename = "OFFICER")]
  #[strum(serialize = "OFFICER")]
  Officer,
  #[serde(rename = "SYSTEM")]
  #[strum(serialize = "SYSTEM")]
  System,
}

/// Who is touching the data, threaded from the calling surface down into the
/// store so the mirrored log entry is attributable.
#[derive(Debug, Clone)]
pub struct AccessContext {
  pub role:       UserRole,
  pub session_id: Option<Uuid>,
  pub ip_address: Option<String>,
}

impl AccessContext {
  pub fn system() -> Self {
    Self { role: UserRole::System, session_id: None, ip_address: None }
  }

  pub fn taxpayer(session_id: Uuid) -> Self {
    Self {
      role:       UserRole::Taxpayer,
      session_id: Some(session_id),
      ip_address: None,
    }
  }

  pub fn officer() -> Self {
    Self { role: UserRole::Officer, session_id: None, ip_address: None }
  }
}

/// A persisted trail entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessLogEntry {
  pub entry_id:   i64,
  pub at:         DateTime<Utc>,
  pub pin:        TaxpayerPin,
  pub relation:   Option<String>,
  pub action:     Option<AccessAction>,
  pub role:       Option<UserRole>,
  pub session_id: Option<Uuid>,
  pub ip_address: Option<String>,
}

/// Input to [`crate::store::TaxStore::log_access`]. The timestamp is set by
/// the store at write time.
#[derive(Debug, Clone)]
pub struct NewAccessLog {
  pub pin:        TaxpayerPin,
  pub relation:   String,
  pub action:     AccessAction,
  pub role:       UserRole,
  pub session_id: Option<Uuid>,
  pub ip_address: Option<String>,
}

impl NewAccessLog {
  pub fn new(
    pin: TaxpayerPin,
    relation: impl Into<String>,
    action: AccessAction,
    ctx: &AccessContext,
  ) -> Self {
    Self {
      pin,
      relation: relation.into(),
      action,
      role: ctx.role,
      session_id: ctx.session_id,
      ip_address: ctx.ip_address.clone(),
    }
  }
}
