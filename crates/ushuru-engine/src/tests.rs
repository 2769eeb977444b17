//! End-to-end engine tests over the in-memory SQLite store.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use ushuru_core::{
  Error,
  access::{AccessContext, AccessLogEntry, NewAccessLog},
  audit::{AuditCase, CaseFilter, CaseStatus, NewAuditCase, RiskLevel},
  filing::{FiledFact, NewFiledFact},
  pin::TaxpayerPin,
  plan::FilingType,
  session::{FilingSession, SessionState},
  store::TaxStore,
  truth::{
    BankTransaction, FlowDirection, ImportRecord, MpesaTransaction,
    PropertyAsset, TelcoUsage, TruthRecord, VehicleAsset,
  },
};
use ushuru_store_sqlite::SqliteStore;

use crate::{AnswerOutcome, Confidence, EngineConfig, FilingEngine};

const PIN: &str = "A012345678P";

async fn engine() -> FilingEngine<SqliteStore> {
  let store = SqliteStore::open_in_memory().await.expect("in-memory store");
  FilingEngine::new(Arc::new(store), EngineConfig::default())
}

fn pin() -> TaxpayerPin { TaxpayerPin::parse(PIN).unwrap() }

/// Answers for a full IT1 walk, in plan order.
const IT1_ANSWERS: [(&str, &str); 11] = [
  ("return_type", "Original"),
  ("period_from", "2024-01-01"),
  ("period_to", "2024-12-31"),
  ("bank_name", "Equity Bank"),
  ("branch_name", "Westlands"),
  ("account_number", "0123456789"),
  ("employer_pin", "A999999999P"),
  ("gross_pay", "KES 110,000"),
  ("allowances", "5000"),
  ("declared_income", "100000"),
  ("paye_deducted", "12000"),
];

// ─── Interview flow ──────────────────────────────────────────────────────────

#[tokio::test]
async fn full_interview_walks_the_plan() {
  let e = engine().await;
  let (session, first) = e.start_session(PIN, "IT1").await.unwrap();
  assert_eq!(first.field, "return_type");

  for (i, (field, answer)) in IT1_ANSWERS.iter().enumerate() {
    let outcome = e
      .record_answer(session.session_id, field, answer)
      .await
      .unwrap();
    if i + 1 < IT1_ANSWERS.len() {
      match outcome {
        AnswerOutcome::Next(p) => assert_eq!(p.field, IT1_ANSWERS[i + 1].0),
        AnswerOutcome::ReadyToSubmit => panic!("completed early at {field}"),
      }
    } else {
      assert_eq!(outcome, AnswerOutcome::ReadyToSubmit);
    }
  }

  let stored = e.get_session(session.session_id).await.unwrap();
  assert_eq!(stored.state, SessionState::SectionComplete);
  assert_eq!(stored.responses.answer_count(), IT1_ANSWERS.len());
}

#[tokio::test]
async fn duplicate_answer_is_stale_and_changes_nothing() {
  let e = engine().await;
  let (session, _) = e.start_session(PIN, "IT1").await.unwrap();

  e.record_answer(session.session_id, "return_type", "Original")
    .await
    .unwrap();

  // A retried delivery of the same answer must be rejected.
  let err = e
    .record_answer(session.session_id, "return_type", "Amended")
    .await
    .unwrap_err();
  assert!(matches!(err, Error::StaleSession(_)));

  let stored = e.get_session(session.session_id).await.unwrap();
  assert_eq!(stored.responses.answer_count(), 1);
  assert_eq!(
    stored.responses.get("A_PART1", "return_type"),
    Some("Original")
  );
}

#[tokio::test]
async fn invalid_answers_are_rejected_without_advancing() {
  let e = engine().await;
  let (session, _) = e.start_session(PIN, "IT1").await.unwrap();
  e.record_answer(session.session_id, "return_type", "Original")
    .await
    .unwrap();

  let err = e
    .record_answer(session.session_id, "period_from", "01/01/2024")
    .await
    .unwrap_err();
  assert!(matches!(err, Error::InvalidDate(_)));

  // Still waiting on the same question.
  let stored = e.get_session(session.session_id).await.unwrap();
  assert_eq!(stored.last_question_asked.as_deref(), Some("period_from"));
  e.record_answer(session.session_id, "period_from", "2024-01-01")
    .await
    .unwrap();
}

#[tokio::test]
async fn bad_pin_and_filing_type_are_rejected() {
  let e = engine().await;
  assert!(matches!(
    e.start_session("B012345678P", "IT1").await.unwrap_err(),
    Error::InvalidPin(_)
  ));
  assert!(matches!(
    e.start_session(PIN, "IT9").await.unwrap_err(),
    Error::InvalidFilingType(_)
  ));
}

// ─── Submission ──────────────────────────────────────────────────────────────

async fn complete_interview(e: &FilingEngine<SqliteStore>) -> uuid::Uuid {
  let (session, _) = e.start_session(PIN, "IT1").await.unwrap();
  for (field, answer) in IT1_ANSWERS {
    e.record_answer(session.session_id, field, answer)
      .await
      .unwrap();
  }
  session.session_id
}

#[tokio::test]
async fn submit_commits_one_fact_per_answer() {
  let e = engine().await;
  let session_id = complete_interview(&e).await;

  let submission = e.submit(session_id).await.unwrap();
  assert_eq!(submission.facts.len(), IT1_ANSWERS.len());
  assert!(submission
    .facts
    .iter()
    .all(|f| f.session_id == Some(session_id)));

  // No truth data on record: scored, but low.
  assert_eq!(submission.case.risk_level, Some(RiskLevel::Low));
  assert_eq!(submission.case.status, CaseStatus::New);
  assert_eq!(submission.case.declared_income, Some(100_000.0));

  let stored = e.get_session(session_id).await.unwrap();
  assert_eq!(stored.state, SessionState::Submitted);
}

#[tokio::test]
async fn submit_mid_interview_fails_and_commits_nothing() {
  let e = engine().await;
  let (session, _) = e.start_session(PIN, "IT1").await.unwrap();
  e.record_answer(session.session_id, "return_type", "Original")
    .await
    .unwrap();

  let err = e.submit(session.session_id).await.unwrap_err();
  assert!(matches!(err, Error::IncompleteFiling(_)));

  let facts = e
    .store()
    .filed_facts(pin(), None, AccessContext::system())
    .await
    .unwrap();
  assert!(facts.is_empty());
}

#[tokio::test]
async fn answers_after_submission_are_rejected() {
  let e = engine().await;
  let session_id = complete_interview(&e).await;
  e.submit(session_id).await.unwrap();

  let err = e
    .record_answer(session_id, "paye_deducted", "1")
    .await
    .unwrap_err();
  assert!(matches!(err, Error::SessionSubmitted(_)));
}

// ─── Scoring against truth data ──────────────────────────────────────────────

async fn seed_bank_inflow(e: &FilingEngine<SqliteStore>, amount: f64) {
  e.store()
    .add_truth_record(TruthRecord::Bank(BankTransaction {
      pin:       pin(),
      date:      NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
      amount,
      direction: FlowDirection::Credit,
      balance:   amount,
    }))
    .await
    .unwrap();
}

#[tokio::test]
async fn estimate_is_scoped_to_as_of() {
  let e = engine().await;
  seed_bank_inflow(&e, 150_000.0).await; // dated 2024-06-01

  let before = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
  assert_eq!(e.estimate_income(&pin(), before).await.inferred_income, 0.0);

  let after = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
  assert_eq!(
    e.estimate_income(&pin(), after).await.inferred_income,
    150_000.0
  );
}

#[tokio::test]
async fn understated_filing_raises_a_high_case() {
  let e = engine().await;
  // Inflows 180k against outflows 30k: inferred income 150k.
  seed_bank_inflow(&e, 180_000.0).await;
  e.store()
    .add_truth_record(TruthRecord::Bank(BankTransaction {
      pin:       pin(),
      date:      NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
      amount:    30_000.0,
      direction: FlowDirection::Debit,
      balance:   150_000.0,
    }))
    .await
    .unwrap();

  let session_id = complete_interview(&e).await;
  let submission = e.submit(session_id).await.unwrap();

  let case = submission.case;
  assert_eq!(case.risk_score, Some(30));
  assert_eq!(case.risk_level, Some(RiskLevel::High));
  assert_eq!(case.declared_income, Some(100_000.0));
  assert_eq!(case.inferred_income, Some(150_000.0));
  assert_eq!(case.discrepancy_amount, Some(50_000.0));
  assert!(case.reason.unwrap().contains("understated by 50%"));
}

#[tokio::test]
async fn rescoring_refreshes_the_open_case() {
  let e = engine().await;
  seed_bank_inflow(&e, 150_000.0).await;
  let session_id = complete_interview(&e).await;
  let first = e.submit(session_id).await.unwrap().case;

  // More inflows surface later; rescoring updates the same open case.
  seed_bank_inflow(&e, 100_000.0).await;
  let second = e.score_filing(&pin(), FilingType::It1).await.unwrap();
  assert_eq!(second.case_id, first.case_id);
  assert!(second.risk_score > first.risk_score);

  // Once closed, the next scoring run opens a fresh case.
  e.store()
    .update_case_status(first.case_id, CaseStatus::Closed)
    .await
    .unwrap();
  let third = e.score_filing(&pin(), FilingType::It1).await.unwrap();
  assert_ne!(third.case_id, first.case_id);
}

#[tokio::test]
async fn scoring_without_declared_income_fails() {
  let e = engine().await;
  let err = e.score_filing(&pin(), FilingType::It1).await.unwrap_err();
  assert!(matches!(err, Error::DeclaredIncomeMissing { .. }));
}

#[tokio::test]
async fn scoring_reads_latest_declared_value() {
  let e = engine().await;
  seed_bank_inflow(&e, 150_000.0).await;

  for value in ["100000", "150000"] {
    e.store()
      .record_filed_fact(
        NewFiledFact {
          pin:         pin(),
          filing_type: FilingType::It1,
          section:     "F".into(),
          field_name:  "declared_income".into(),
          field_value: Some(value.into()),
          session_id:  None,
        },
        AccessContext::system(),
      )
      .await
      .unwrap();
  }

  let case = e.score_filing(&pin(), FilingType::It1).await.unwrap();
  // The amended declaration matches the inflows: nothing to flag.
  assert_eq!(case.declared_income, Some(150_000.0));
  assert_eq!(case.risk_level, Some(RiskLevel::Low));
}

#[tokio::test]
async fn assets_escalate_the_case_level() {
  let e = engine().await;
  seed_bank_inflow(&e, 150_000.0).await;
  e.store()
    .add_truth_record(TruthRecord::Vehicle(VehicleAsset {
      pin:                 pin(),
      registration_number: "KDA 123X".into(),
      make:                "Land Rover".into(),
      model:               "Defender".into(),
      estimated_value:     25_000_000.0,
      purchase_date:       NaiveDate::from_ymd_opt(2023, 1, 15).unwrap(),
    }))
    .await
    .unwrap();

  let session_id = complete_interview(&e).await;
  let case = e.submit(session_id).await.unwrap().case;
  // 40 understatement + 25 vehicles − 10 low confidence.
  assert_eq!(case.risk_score, Some(55));
  assert_eq!(case.risk_level, Some(RiskLevel::High));
}

// ─── Source degradation ──────────────────────────────────────────────────────

/// Delegates to SQLite, except the bank feed never answers and the M-Pesa
/// feed fails outright.
struct FlakySourceStore {
  inner: SqliteStore,
}

impl TaxStore for FlakySourceStore {
  type Error = <SqliteStore as TaxStore>::Error;

  async fn create_session(
    &self,
    session: FilingSession,
  ) -> Result<(), Self::Error> {
    self.inner.create_session(session).await
  }

  async fn get_session(
    &self,
    session_id: Uuid,
  ) -> Result<Option<FilingSession>, Self::Error> {
    self.inner.get_session(session_id).await
  }

  async fn update_session(
    &self,
    session: FilingSession,
    expected_updated_at: DateTime<Utc>,
  ) -> Result<(), Self::Error> {
    self.inner.update_session(session, expected_updated_at).await
  }

  async fn submit_session(
    &self,
    session_id: Uuid,
    facts: Vec<NewFiledFact>,
    ctx: AccessContext,
  ) -> Result<Vec<FiledFact>, Self::Error> {
    self.inner.submit_session(session_id, facts, ctx).await
  }

  async fn record_filed_fact(
    &self,
    input: NewFiledFact,
    ctx: AccessContext,
  ) -> Result<FiledFact, Self::Error> {
    self.inner.record_filed_fact(input, ctx).await
  }

  async fn filed_facts(
    &self,
    pin: TaxpayerPin,
    filing_type: Option<FilingType>,
    ctx: AccessContext,
  ) -> Result<Vec<FiledFact>, Self::Error> {
    self.inner.filed_facts(pin, filing_type, ctx).await
  }

  async fn latest_filed_value(
    &self,
    pin: TaxpayerPin,
    filing_type: FilingType,
    field_name: String,
    ctx: AccessContext,
  ) -> Result<Option<FiledFact>, Self::Error> {
    self.inner.latest_filed_value(pin, filing_type, field_name, ctx).await
  }

  async fn add_truth_record(
    &self,
    record: TruthRecord,
  ) -> Result<(), Self::Error> {
    self.inner.add_truth_record(record).await
  }

  async fn bank_transactions(
    &self,
    _pin: TaxpayerPin,
  ) -> Result<Vec<BankTransaction>, Self::Error> {
    std::future::pending().await
  }

  async fn mpesa_transactions(
    &self,
    _pin: TaxpayerPin,
  ) -> Result<Vec<MpesaTransaction>, Self::Error> {
    Err(Error::Storage("mpesa feed offline".into()).into())
  }

  async fn vehicle_assets(
    &self,
    pin: TaxpayerPin,
  ) -> Result<Vec<VehicleAsset>, Self::Error> {
    self.inner.vehicle_assets(pin).await
  }

  async fn property_assets(
    &self,
    pin: TaxpayerPin,
  ) -> Result<Vec<PropertyAsset>, Self::Error> {
    self.inner.property_assets(pin).await
  }

  async fn import_records(
    &self,
    pin: TaxpayerPin,
  ) -> Result<Vec<ImportRecord>, Self::Error> {
    self.inner.import_records(pin).await
  }

  async fn telco_usage(
    &self,
    pin: TaxpayerPin,
  ) -> Result<Vec<TelcoUsage>, Self::Error> {
    self.inner.telco_usage(pin).await
  }

  async fn upsert_new_case(
    &self,
    case: NewAuditCase,
  ) -> Result<AuditCase, Self::Error> {
    self.inner.upsert_new_case(case).await
  }

  async fn get_case(
    &self,
    case_id: i64,
  ) -> Result<Option<AuditCase>, Self::Error> {
    self.inner.get_case(case_id).await
  }

  async fn audit_cases(
    &self,
    filter: CaseFilter,
  ) -> Result<Vec<AuditCase>, Self::Error> {
    self.inner.audit_cases(filter).await
  }

  async fn update_case_status(
    &self,
    case_id: i64,
    status: CaseStatus,
  ) -> Result<AuditCase, Self::Error> {
    self.inner.update_case_status(case_id, status).await
  }

  async fn log_access(&self, entry: NewAccessLog) -> Result<(), Self::Error> {
    self.inner.log_access(entry).await
  }

  async fn access_logs(
    &self,
    pin: TaxpayerPin,
  ) -> Result<Vec<AccessLogEntry>, Self::Error> {
    self.inner.access_logs(pin).await
  }
}

#[tokio::test]
async fn flaky_sources_degrade_to_low_confidence() {
  let inner = SqliteStore::open_in_memory().await.expect("in-memory store");
  inner
    .add_truth_record(TruthRecord::Bank(BankTransaction {
      pin:       pin(),
      date:      NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
      amount:    150_000.0,
      direction: FlowDirection::Credit,
      balance:   150_000.0,
    }))
    .await
    .unwrap();

  let e = FilingEngine::new(
    Arc::new(FlakySourceStore { inner }),
    EngineConfig { source_timeout_ms: 25, ..EngineConfig::default() },
  );

  let as_of = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
  let profile = e.build_wealth_profile(&pin(), as_of).await;

  // The seeded inflow is behind the stalled feed; both bad sources are
  // treated as empty rather than failing the build.
  assert!(!profile.complete);
  assert_eq!(profile.cashflow.bank_count, 0);
  assert_eq!(profile.cashflow.mpesa_count, 0);

  let estimate = profile.estimate();
  assert_eq!(estimate.inferred_income, 0.0);
  assert_eq!(estimate.confidence, Confidence::Low);
}
