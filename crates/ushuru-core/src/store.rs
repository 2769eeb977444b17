//! The `TaxStore` trait.
//!
//! Implemented by storage backends (e.g. `ushuru-store-sqlite`). Higher
//! layers (`ushuru-engine`, `ushuru-api`) depend on this abstraction, not on
//! any concrete backend.
//!
//! Contract highlights:
//!
//! - Filed facts, truth records, and access-log entries are append-only.
//! - Session updates are guarded by an optimistic `expected_updated_at`
//!   check; a losing concurrent writer gets [`crate::Error::StaleSession`].
//! - `submit_session` and `upsert_new_case` are each a single atomic unit of
//!   work.
//! - Every read/write of filed facts, every truth-source read, and every
//!   audit-case write mirrors an [`AccessLogEntry`](crate::access) inside the
//!   same operation; a failed mirror is reported internally, never to the
//!   caller.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  access::{AccessContext, AccessLogEntry, NewAccessLog},
  audit::{AuditCase, CaseFilter, CaseStatus, NewAuditCase},
  filing::{FiledFact, NewFiledFact},
  pin::TaxpayerPin,
  plan::FilingType,
  session::FilingSession,
  truth::{
    BankTransaction, ImportRecord, MpesaTransaction, PropertyAsset,
    TelcoUsage, TruthRecord, VehicleAsset,
  },
};

/// Abstraction over an Ushuru persistence backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`). Errors convert
/// into [`crate::Error`] so callers see one taxonomy regardless of backend.
pub trait TaxStore: Send + Sync {
  type Error: std::error::Error + Into<crate::Error> + Send + Sync + 'static;

  // ── Sessions ──────────────────────────────────────────────────────────

  /// Persist a freshly-started session.
  fn create_session(
    &self,
    session: FilingSession,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Retrieve a session by id. Returns `None` if not found.
  fn get_session(
    &self,
    session_id: Uuid,
  ) -> impl Future<Output = Result<Option<FilingSession>, Self::Error>> + Send + '_;

  /// Write back a mutated live session.
  ///
  /// The write only lands if the stored row still carries
  /// `expected_updated_at` and is not terminal; otherwise the caller lost a
  /// race and gets [`crate::Error::StaleSession`].
  fn update_session(
    &self,
    session: FilingSession,
    expected_updated_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Atomically commit a completed session: write one filed fact per
  /// accumulated answer and mark the session `SUBMITTED`, all in one unit of
  /// work. Fails with [`crate::Error::IncompleteFiling`] unless the stored
  /// session is `SECTION_COMPLETE`.
  fn submit_session(
    &self,
    session_id: Uuid,
    facts: Vec<NewFiledFact>,
    ctx: AccessContext,
  ) -> impl Future<Output = Result<Vec<FiledFact>, Self::Error>> + Send + '_;

  // ── Filed facts — append-only ─────────────────────────────────────────

  /// Record one fact outside the interview flow (ingestion collaborators).
  fn record_filed_fact(
    &self,
    input: NewFiledFact,
    ctx: AccessContext,
  ) -> impl Future<Output = Result<FiledFact, Self::Error>> + Send + '_;

  /// All facts for a taxpayer, oldest first, optionally per filing type.
  fn filed_facts(
    &self,
    pin: TaxpayerPin,
    filing_type: Option<FilingType>,
    ctx: AccessContext,
  ) -> impl Future<Output = Result<Vec<FiledFact>, Self::Error>> + Send + '_;

  /// The most recently committed fact for a specific field, if any.
  fn latest_filed_value(
    &self,
    pin: TaxpayerPin,
    filing_type: FilingType,
    field_name: String,
    ctx: AccessContext,
  ) -> impl Future<Output = Result<Option<FiledFact>, Self::Error>> + Send + '_;

  // ── Truth store — immutable, externally supplied ──────────────────────

  /// Append one ingested truth record (seed jobs and tests).
  fn add_truth_record(
    &self,
    record: TruthRecord,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn bank_transactions(
    &self,
    pin: TaxpayerPin,
  ) -> impl Future<Output = Result<Vec<BankTransaction>, Self::Error>> + Send + '_;

  fn mpesa_transactions(
    &self,
    pin: TaxpayerPin,
  ) -> impl Future<Output = Result<Vec<MpesaTransaction>, Self::Error>> + Send + '_;

  fn vehicle_assets(
    &self,
    pin: TaxpayerPin,
  ) -> impl Future<Output = Result<Vec<VehicleAsset>, Self::Error>> + Send + '_;

  fn property_assets(
    &self,
    pin: TaxpayerPin,
  ) -> impl Future<Output = Result<Vec<PropertyAsset>, Self::Error>> + Send + '_;

  fn import_records(
    &self,
    pin: TaxpayerPin,
  ) -> impl Future<Output = Result<Vec<ImportRecord>, Self::Error>> + Send + '_;

  fn telco_usage(
    &self,
    pin: TaxpayerPin,
  ) -> impl Future<Output = Result<Vec<TelcoUsage>, Self::Error>> + Send + '_;

  // ── Audit cases ───────────────────────────────────────────────────────

  /// Create or refresh the single open (`NEW`) case for
  /// `(pin, filing_type)`.
  ///
  /// If an open case exists it is updated in place; otherwise a new row is
  /// inserted. The check-then-write runs in one transaction so concurrent
  /// scorers cannot produce duplicate open cases.
  fn upsert_new_case(
    &self,
    case: NewAuditCase,
  ) -> impl Future<Output = Result<AuditCase, Self::Error>> + Send + '_;

  fn get_case(
    &self,
    case_id: i64,
  ) -> impl Future<Output = Result<Option<AuditCase>, Self::Error>> + Send + '_;

  /// Cases matching `filter`, highest risk score first.
  fn audit_cases(
    &self,
    filter: CaseFilter,
  ) -> impl Future<Output = Result<Vec<AuditCase>, Self::Error>> + Send + '_;

  /// Review-workflow transition. Fails with
  /// [`crate::Error::CaseNotFound`] for an unknown id, and with
  /// [`crate::Error::CaseReopen`] on a transition back to `NEW` — only the
  /// scorer opens cases, and at most one may be open per filing.
  fn update_case_status(
    &self,
    case_id: i64,
    status: CaseStatus,
  ) -> impl Future<Output = Result<AuditCase, Self::Error>> + Send + '_;

  // ── Access log — append-only ──────────────────────────────────────────

  /// Append a trail entry. Exposed for callers whose data touches happen
  /// outside the store (the store mirrors its own internally).
  fn log_access(
    &self,
    entry: NewAccessLog,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Trail for one taxpayer, oldest first.
  fn access_logs(
    &self,
    pin: TaxpayerPin,
  ) -> impl Future<Output = Result<Vec<AccessLogEntry>, Self::Error>> + Send + '_;
}
