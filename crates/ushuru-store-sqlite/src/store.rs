//! [`SqliteStore`] — the SQLite implementation of [`TaxStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use ushuru_core::{
  access::{AccessContext, AccessLogEntry, NewAccessLog, UserRole},
  audit::{AuditCase, CaseFilter, CaseStatus, NewAuditCase},
  filing::{FiledFact, NewFiledFact},
  pin::TaxpayerPin,
  plan::FilingType,
  session::{FilingSession, SessionState},
  store::TaxStore,
  truth::{
    BankTransaction, FlowDirection, ImportRecord, MpesaDirection,
    MpesaTransaction, PropertyAsset, TelcoUsage, TruthRecord, VehicleAsset,
  },
};

use crate::{
  encode::{
    RawAccessLog, RawCase, RawFiledFact, RawSession, decode_date, decode_enum,
    decode_pin, encode_date, encode_dt, encode_uuid,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An Ushuru tax store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Access-log mirroring ────────────────────────────────────────────────────

/// Pre-encoded access-log row, built outside `call` closures so they stay
/// `'static`.
struct MirrorRow {
  pin:        String,
  relation:   &'static str,
  action:     &'static str,
  role:       String,
  session_id: Option<String>,
  ip_address: Option<String>,
}

impl MirrorRow {
  fn new(
    pin: &TaxpayerPin,
    relation: &'static str,
    action: &'static str,
    ctx: &AccessContext,
  ) -> Self {
    Self {
      pin:        pin.to_string(),
      relation,
      action,
      role:       ctx.role.to_string(),
      session_id: ctx.session_id.map(encode_uuid),
      ip_address: ctx.ip_address.clone(),
    }
  }

  fn system(pin: &TaxpayerPin, relation: &'static str, action: &'static str) -> Self {
    Self::new(pin, relation, action, &AccessContext::system())
  }
}

/// Append the mirrored trail entry. Best-effort: a failure here must never
/// fail the business operation, so it is logged and swallowed.
fn mirror(conn: &rusqlite::Connection, row: &MirrorRow) {
  let result = conn.execute(
    "INSERT INTO access_logs (at, taxpayer_pin, relation_name, action, user_role, session_id, ip_address)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    rusqlite::params![
      encode_dt(Utc::now()),
      row.pin,
      row.relation,
      row.action,
      row.role,
      row.session_id,
      row.ip_address,
    ],
  );
  if let Err(e) = result {
    tracing::warn!(pin = %row.pin, relation = row.relation, error = %e,
      "access log append failed");
  }
}

// ─── Internal outcomes for guarded writes ────────────────────────────────────

enum SessionWrite {
  Done,
  NotFound,
  Stale,
}

enum SubmitWrite {
  Done,
  NotFound,
  AlreadySubmitted,
  Incomplete,
}

// ─── TaxStore impl ───────────────────────────────────────────────────────────

impl TaxStore for SqliteStore {
  type Error = Error;

  // ── Sessions ──────────────────────────────────────────────────────────────

  async fn create_session(&self, session: FilingSession) -> Result<()> {
    let id_str        = encode_uuid(session.session_id);
    let pin_str       = session.pin.to_string();
    let ft_str        = session.filing_type.to_string();
    let state_str     = session.state.to_string();
    let responses_str = serde_json::to_string(&session.responses)?;
    let created_str   = encode_dt(session.created_at);
    let updated_str   = encode_dt(session.updated_at);
    let section       = session.current_section.clone();
    let question      = session.last_question_asked.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO filing_sessions (
             session_id, taxpayer_pin, filing_type, state,
             current_section, last_question_asked, responses_json,
             created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            id_str, pin_str, ft_str, state_str,
            section, question, responses_str,
            created_str, updated_str,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_session(&self, session_id: Uuid) -> Result<Option<FilingSession>> {
    let id_str = encode_uuid(session_id);

    let raw: Option<RawSession> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT session_id, taxpayer_pin, filing_type, state,
                    current_section, last_question_asked, responses_json,
                    created_at, updated_at
             FROM filing_sessions WHERE session_id = ?1",
            rusqlite::params![id_str],
            |row| {
              Ok(RawSession {
                session_id:          row.get(0)?,
                taxpayer_pin:        row.get(1)?,
                filing_type:         row.get(2)?,
                state:               row.get(3)?,
                current_section:     row.get(4)?,
                last_question_asked: row.get(5)?,
                responses_json:      row.get(6)?,
                created_at:          row.get(7)?,
                updated_at:          row.get(8)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawSession::into_session).transpose()
  }

  async fn update_session(
    &self,
    session: FilingSession,
    expected_updated_at: chrono::DateTime<Utc>,
  ) -> Result<()> {
    let id            = session.session_id;
    let id_str        = encode_uuid(id);
    let state_str     = session.state.to_string();
    let responses_str = serde_json::to_string(&session.responses)?;
    let updated_str   = encode_dt(session.updated_at);
    let expected_str  = encode_dt(expected_updated_at);
    let section       = session.current_section.clone();
    let question      = session.last_question_asked.clone();
    let terminal      = SessionState::Submitted.to_string();

    let outcome = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE filing_sessions
           SET state = ?1, current_section = ?2, last_question_asked = ?3,
               responses_json = ?4, updated_at = ?5
           WHERE session_id = ?6 AND updated_at = ?7 AND state != ?8",
          rusqlite::params![
            state_str, section, question,
            responses_str, updated_str,
            id_str, expected_str, terminal,
          ],
        )?;
        if changed == 1 {
          return Ok(SessionWrite::Done);
        }
        let exists: bool = conn
          .query_row(
            "SELECT 1 FROM filing_sessions WHERE session_id = ?1",
            rusqlite::params![id_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        Ok(if exists { SessionWrite::Stale } else { SessionWrite::NotFound })
      })
      .await?;

    match outcome {
      SessionWrite::Done => Ok(()),
      SessionWrite::NotFound => {
        Err(Error::Core(ushuru_core::Error::SessionNotFound(id)))
      }
      SessionWrite::Stale => {
        Err(Error::Core(ushuru_core::Error::StaleSession(id)))
      }
    }
  }

  async fn submit_session(
    &self,
    session_id: Uuid,
    facts: Vec<NewFiledFact>,
    ctx: AccessContext,
  ) -> Result<Vec<FiledFact>> {
    let now = Utc::now();
    let committed: Vec<FiledFact> = facts
      .into_iter()
      .map(|input| FiledFact {
        fact_id:     Uuid::new_v4(),
        pin:         input.pin,
        filing_type: input.filing_type,
        section:     input.section,
        field_name:  input.field_name,
        field_value: input.field_value,
        recorded_at: now,
        session_id:  input.session_id,
      })
      .collect();

    let id_str       = encode_uuid(session_id);
    let complete_str = SessionState::SectionComplete.to_string();
    let terminal_str = SessionState::Submitted.to_string();
    let now_str      = encode_dt(now);
    let rows: Vec<[Option<String>; 8]> = committed
      .iter()
      .map(|f| {
        [
          Some(encode_uuid(f.fact_id)),
          Some(f.pin.to_string()),
          Some(f.filing_type.to_string()),
          Some(f.section.clone()),
          Some(f.field_name.clone()),
          f.field_value.clone(),
          Some(encode_dt(f.recorded_at)),
          f.session_id.map(encode_uuid),
        ]
      })
      .collect();
    let mirror_row = committed
      .first()
      .map(|f| MirrorRow::new(&f.pin, "filed_facts", "WRITE", &ctx));

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let state: Option<String> = tx
          .query_row(
            "SELECT state FROM filing_sessions WHERE session_id = ?1",
            rusqlite::params![id_str],
            |row| row.get(0),
          )
          .optional()?;

        let state = match state {
          None => return Ok(SubmitWrite::NotFound),
          Some(s) => s,
        };
        if state == terminal_str {
          return Ok(SubmitWrite::AlreadySubmitted);
        }
        if state != complete_str {
          return Ok(SubmitWrite::Incomplete);
        }

        for row in &rows {
          tx.execute(
            "INSERT INTO filed_facts (
               fact_id, taxpayer_pin, filing_type, section,
               field_name, field_value, recorded_at, session_id
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
              row[0], row[1], row[2], row[3],
              row[4], row[5], row[6], row[7],
            ],
          )?;
        }

        tx.execute(
          "UPDATE filing_sessions SET state = ?1, updated_at = ?2
           WHERE session_id = ?3",
          rusqlite::params![terminal_str, now_str, id_str],
        )?;

        if let Some(row) = &mirror_row {
          mirror(&tx, row);
        }

        tx.commit()?;
        Ok(SubmitWrite::Done)
      })
      .await?;

    match outcome {
      SubmitWrite::Done => Ok(committed),
      SubmitWrite::NotFound => {
        Err(Error::Core(ushuru_core::Error::SessionNotFound(session_id)))
      }
      SubmitWrite::AlreadySubmitted => {
        Err(Error::Core(ushuru_core::Error::SessionSubmitted(session_id)))
      }
      SubmitWrite::Incomplete => {
        Err(Error::Core(ushuru_core::Error::IncompleteFiling(session_id)))
      }
    }
  }

  // ── Filed facts — append-only ─────────────────────────────────────────────

  async fn record_filed_fact(
    &self,
    input: NewFiledFact,
    ctx: AccessContext,
  ) -> Result<FiledFact> {
    let fact = FiledFact {
      fact_id:     Uuid::new_v4(),
      pin:         input.pin,
      filing_type: input.filing_type,
      section:     input.section,
      field_name:  input.field_name,
      field_value: input.field_value,
      recorded_at: Utc::now(),
      session_id:  input.session_id,
    };

    let mirror_row   = MirrorRow::new(&fact.pin, "filed_facts", "WRITE", &ctx);
    let fact_id_str  = encode_uuid(fact.fact_id);
    let pin_str      = fact.pin.to_string();
    let ft_str       = fact.filing_type.to_string();
    let section      = fact.section.clone();
    let field_name   = fact.field_name.clone();
    let field_value  = fact.field_value.clone();
    let recorded_str = encode_dt(fact.recorded_at);
    let sess_str     = fact.session_id.map(encode_uuid);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO filed_facts (
             fact_id, taxpayer_pin, filing_type, section,
             field_name, field_value, recorded_at, session_id
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            fact_id_str, pin_str, ft_str, section,
            field_name, field_value, recorded_str, sess_str,
          ],
        )?;
        mirror(conn, &mirror_row);
        Ok(())
      })
      .await?;

    Ok(fact)
  }

  async fn filed_facts(
    &self,
    pin: TaxpayerPin,
    filing_type: Option<FilingType>,
    ctx: AccessContext,
  ) -> Result<Vec<FiledFact>> {
    let mirror_row = MirrorRow::new(&pin, "filed_facts", "READ", &ctx);
    let pin_str    = pin.to_string();
    let ft_str     = filing_type.map(|ft| ft.to_string());

    let raws: Vec<RawFiledFact> = self
      .conn
      .call(move |conn| {
        let sql = if ft_str.is_some() {
          "SELECT fact_id, taxpayer_pin, filing_type, section, field_name,
                  field_value, recorded_at, session_id
           FROM filed_facts
           WHERE taxpayer_pin = ?1 AND filing_type = ?2
           ORDER BY recorded_at, fact_id"
        } else {
          "SELECT fact_id, taxpayer_pin, filing_type, section, field_name,
                  field_value, recorded_at, session_id
           FROM filed_facts
           WHERE taxpayer_pin = ?1
           ORDER BY recorded_at, fact_id"
        };
        let mut stmt = conn.prepare(sql)?;
        let map_row = |row: &rusqlite::Row<'_>| {
          Ok(RawFiledFact {
            fact_id:      row.get(0)?,
            taxpayer_pin: row.get(1)?,
            filing_type:  row.get(2)?,
            section:      row.get(3)?,
            field_name:   row.get(4)?,
            field_value:  row.get(5)?,
            recorded_at:  row.get(6)?,
            session_id:   row.get(7)?,
          })
        };
        let rows = match &ft_str {
          Some(ft) => stmt
            .query_map(rusqlite::params![pin_str, ft], map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?,
          None => stmt
            .query_map(rusqlite::params![pin_str], map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?,
        };
        mirror(conn, &mirror_row);
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawFiledFact::into_fact).collect()
  }

  async fn latest_filed_value(
    &self,
    pin: TaxpayerPin,
    filing_type: FilingType,
    field_name: String,
    ctx: AccessContext,
  ) -> Result<Option<FiledFact>> {
    let mirror_row = MirrorRow::new(&pin, "filed_facts", "READ", &ctx);
    let pin_str    = pin.to_string();
    let ft_str     = filing_type.to_string();

    let raw: Option<RawFiledFact> = self
      .conn
      .call(move |conn| {
        let result = conn
          .query_row(
            "SELECT fact_id, taxpayer_pin, filing_type, section, field_name,
                    field_value, recorded_at, session_id
             FROM filed_facts
             WHERE taxpayer_pin = ?1 AND filing_type = ?2 AND field_name = ?3
             ORDER BY recorded_at DESC, fact_id DESC
             LIMIT 1",
            rusqlite::params![pin_str, ft_str, field_name],
            |row| {
              Ok(RawFiledFact {
                fact_id:      row.get(0)?,
                taxpayer_pin: row.get(1)?,
                filing_type:  row.get(2)?,
                section:      row.get(3)?,
                field_name:   row.get(4)?,
                field_value:  row.get(5)?,
                recorded_at:  row.get(6)?,
                session_id:   row.get(7)?,
              })
            },
          )
          .optional()?;
        mirror(conn, &mirror_row);
        Ok(result)
      })
      .await?;

    raw.map(RawFiledFact::into_fact).transpose()
  }

  // ── Truth store ───────────────────────────────────────────────────────────

  async fn add_truth_record(&self, record: TruthRecord) -> Result<()> {
    let mirror_row = MirrorRow::system(record.pin(), record.relation(), "WRITE");

    self
      .conn
      .call(move |conn| {
        match &record {
          TruthRecord::Bank(r) => {
            conn.execute(
              "INSERT INTO bank_transactions (taxpayer_pin, date, amount, direction, balance)
               VALUES (?1, ?2, ?3, ?4, ?5)",
              rusqlite::params![
                r.pin.to_string(),
                encode_date(r.date),
                r.amount,
                r.direction.to_string(),
                r.balance,
              ],
            )?;
          }
          TruthRecord::Mpesa(r) => {
            conn.execute(
              "INSERT INTO mpesa_transactions (taxpayer_pin, date, direction, amount)
               VALUES (?1, ?2, ?3, ?4)",
              rusqlite::params![
                r.pin.to_string(),
                encode_date(r.date),
                r.direction.to_string(),
                r.amount,
              ],
            )?;
          }
          TruthRecord::Vehicle(r) => {
            conn.execute(
              "INSERT INTO vehicle_assets
                 (taxpayer_pin, registration_number, make, model, estimated_value, purchase_date)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
              rusqlite::params![
                r.pin.to_string(),
                r.registration_number,
                r.make,
                r.model,
                r.estimated_value,
                encode_date(r.purchase_date),
              ],
            )?;
          }
          TruthRecord::Property(r) => {
            conn.execute(
              "INSERT INTO property_assets
                 (taxpayer_pin, lr_number, location, property_type, estimated_value)
               VALUES (?1, ?2, ?3, ?4, ?5)",
              rusqlite::params![
                r.pin.to_string(),
                r.lr_number,
                r.location,
                r.property_type,
                r.estimated_value,
              ],
            )?;
          }
          TruthRecord::Import(r) => {
            conn.execute(
              "INSERT INTO import_records (taxpayer_pin, date, description, value, customs_entry)
               VALUES (?1, ?2, ?3, ?4, ?5)",
              rusqlite::params![
                r.pin.to_string(),
                encode_date(r.date),
                r.description,
                r.value,
                r.customs_entry,
              ],
            )?;
          }
          TruthRecord::Telco(r) => {
            conn.execute(
              "INSERT INTO telco_usage
                 (taxpayer_pin, month, calls_made, data_usage_gb, monthly_bill)
               VALUES (?1, ?2, ?3, ?4, ?5)",
              rusqlite::params![
                r.pin.to_string(),
                r.month,
                r.calls_made,
                r.data_usage_gb,
                r.monthly_bill,
              ],
            )?;
          }
        }
        mirror(conn, &mirror_row);
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn bank_transactions(&self, pin: TaxpayerPin) -> Result<Vec<BankTransaction>> {
    let mirror_row = MirrorRow::system(&pin, "bank_transactions", "READ");
    let pin_str = pin.to_string();

    let rows: Vec<(String, String, f64, String, f64)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT taxpayer_pin, date, amount, direction, balance
           FROM bank_transactions WHERE taxpayer_pin = ?1 ORDER BY date, id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![pin_str], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        mirror(conn, &mirror_row);
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(pin, date, amount, direction, balance)| {
        Ok(BankTransaction {
          pin: decode_pin(&pin)?,
          date: decode_date(&date)?,
          amount,
          direction: decode_enum::<FlowDirection>(&direction, "direction")?,
          balance,
        })
      })
      .collect()
  }

  async fn mpesa_transactions(&self, pin: TaxpayerPin) -> Result<Vec<MpesaTransaction>> {
    let mirror_row = MirrorRow::system(&pin, "mpesa_transactions", "READ");
    let pin_str = pin.to_string();

    let rows: Vec<(String, String, String, f64)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT taxpayer_pin, date, direction, amount
           FROM mpesa_transactions WHERE taxpayer_pin = ?1 ORDER BY date, id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![pin_str], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        mirror(conn, &mirror_row);
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(pin, date, direction, amount)| {
        Ok(MpesaTransaction {
          pin: decode_pin(&pin)?,
          date: decode_date(&date)?,
          direction: decode_enum::<MpesaDirection>(&direction, "direction")?,
          amount,
        })
      })
      .collect()
  }

  async fn vehicle_assets(&self, pin: TaxpayerPin) -> Result<Vec<VehicleAsset>> {
    let mirror_row = MirrorRow::system(&pin, "vehicle_assets", "READ");
    let pin_str = pin.to_string();

    let rows: Vec<(String, String, String, String, f64, String)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT taxpayer_pin, registration_number, make, model, estimated_value, purchase_date
           FROM vehicle_assets WHERE taxpayer_pin = ?1 ORDER BY id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![pin_str], |row| {
            Ok((
              row.get(0)?, row.get(1)?, row.get(2)?,
              row.get(3)?, row.get(4)?, row.get(5)?,
            ))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        mirror(conn, &mirror_row);
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(pin, registration_number, make, model, estimated_value, purchase_date)| {
        Ok(VehicleAsset {
          pin: decode_pin(&pin)?,
          registration_number,
          make,
          model,
          estimated_value,
          purchase_date: decode_date(&purchase_date)?,
        })
      })
      .collect()
  }

  async fn property_assets(&self, pin: TaxpayerPin) -> Result<Vec<PropertyAsset>> {
    let mirror_row = MirrorRow::system(&pin, "property_assets", "READ");
    let pin_str = pin.to_string();

    let rows: Vec<(String, String, String, String, f64)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT taxpayer_pin, lr_number, location, property_type, estimated_value
           FROM property_assets WHERE taxpayer_pin = ?1 ORDER BY id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![pin_str], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        mirror(conn, &mirror_row);
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(pin, lr_number, location, property_type, estimated_value)| {
        Ok(PropertyAsset {
          pin: decode_pin(&pin)?,
          lr_number,
          location,
          property_type,
          estimated_value,
        })
      })
      .collect()
  }

  async fn import_records(&self, pin: TaxpayerPin) -> Result<Vec<ImportRecord>> {
    let mirror_row = MirrorRow::system(&pin, "import_records", "READ");
    let pin_str = pin.to_string();

    let rows: Vec<(String, String, String, f64, String)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT taxpayer_pin, date, description, value, customs_entry
           FROM import_records WHERE taxpayer_pin = ?1 ORDER BY date, id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![pin_str], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        mirror(conn, &mirror_row);
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(pin, date, description, value, customs_entry)| {
        Ok(ImportRecord {
          pin: decode_pin(&pin)?,
          date: decode_date(&date)?,
          description,
          value,
          customs_entry,
        })
      })
      .collect()
  }

  async fn telco_usage(&self, pin: TaxpayerPin) -> Result<Vec<TelcoUsage>> {
    let mirror_row = MirrorRow::system(&pin, "telco_usage", "READ");
    let pin_str = pin.to_string();

    let rows: Vec<(String, String, u32, f64, f64)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT taxpayer_pin, month, calls_made, data_usage_gb, monthly_bill
           FROM telco_usage WHERE taxpayer_pin = ?1 ORDER BY month, id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![pin_str], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        mirror(conn, &mirror_row);
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(pin, month, calls_made, data_usage_gb, monthly_bill)| {
        Ok(TelcoUsage {
          pin: decode_pin(&pin)?,
          month,
          calls_made,
          data_usage_gb,
          monthly_bill,
        })
      })
      .collect()
  }

  // ── Audit cases ───────────────────────────────────────────────────────────

  async fn upsert_new_case(&self, case: NewAuditCase) -> Result<AuditCase> {
    let mirror_row  = MirrorRow::system(&case.pin, "audit_cases", "WRITE");
    let pin_str     = case.pin.to_string();
    let ft_str      = case.filing_type.to_string();
    let status_new  = CaseStatus::New.to_string();
    let score       = case.risk_score;
    let level_str   = case.risk_level.to_string();
    let reason      = case.reason.clone();
    let declared    = case.declared_income;
    let inferred    = case.inferred_income;
    let discrepancy = case.discrepancy_amount();
    let now_str     = encode_dt(Utc::now());

    let raw: RawCase = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let open_id: Option<i64> = tx
          .query_row(
            "SELECT case_id FROM audit_cases
             WHERE taxpayer_pin = ?1 AND filing_type = ?2 AND status = ?3",
            rusqlite::params![pin_str, ft_str, status_new],
            |row| row.get(0),
          )
          .optional()?;

        let case_id = match open_id {
          Some(id) => {
            tx.execute(
              "UPDATE audit_cases
               SET risk_score = ?1, risk_level = ?2, reason = ?3,
                   declared_income = ?4, inferred_income = ?5,
                   discrepancy_amount = ?6
               WHERE case_id = ?7 AND status = ?8",
              rusqlite::params![
                score, level_str, reason,
                declared, inferred, discrepancy,
                id, status_new,
              ],
            )?;
            id
          }
          None => {
            tx.execute(
              "INSERT INTO audit_cases (
                 taxpayer_pin, filing_type, risk_score, risk_level, reason,
                 declared_income, inferred_income, discrepancy_amount,
                 status, created_at
               ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
              rusqlite::params![
                pin_str, ft_str, score, level_str, reason,
                declared, inferred, discrepancy,
                status_new, now_str,
              ],
            )?;
            tx.last_insert_rowid()
          }
        };

        let raw = tx.query_row(
          "SELECT case_id, taxpayer_pin, filing_type, risk_score, risk_level,
                  reason, declared_income, inferred_income, discrepancy_amount,
                  status, created_at
           FROM audit_cases WHERE case_id = ?1",
          rusqlite::params![case_id],
          |row| {
            Ok(RawCase {
              case_id:            row.get(0)?,
              taxpayer_pin:       row.get(1)?,
              filing_type:        row.get(2)?,
              risk_score:         row.get(3)?,
              risk_level:         row.get(4)?,
              reason:             row.get(5)?,
              declared_income:    row.get(6)?,
              inferred_income:    row.get(7)?,
              discrepancy_amount: row.get(8)?,
              status:             row.get(9)?,
              created_at:         row.get(10)?,
            })
          },
        )?;

        mirror(&tx, &mirror_row);
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.into_case()
  }

  async fn get_case(&self, case_id: i64) -> Result<Option<AuditCase>> {
    let raw: Option<RawCase> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT case_id, taxpayer_pin, filing_type, risk_score, risk_level,
                    reason, declared_income, inferred_income, discrepancy_amount,
                    status, created_at
             FROM audit_cases WHERE case_id = ?1",
            rusqlite::params![case_id],
            |row| {
              Ok(RawCase {
                case_id:            row.get(0)?,
                taxpayer_pin:       row.get(1)?,
                filing_type:        row.get(2)?,
                risk_score:         row.get(3)?,
                risk_level:         row.get(4)?,
                reason:             row.get(5)?,
                declared_income:    row.get(6)?,
                inferred_income:    row.get(7)?,
                discrepancy_amount: row.get(8)?,
                status:             row.get(9)?,
                created_at:         row.get(10)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawCase::into_case).transpose()
  }

  async fn audit_cases(&self, filter: CaseFilter) -> Result<Vec<AuditCase>> {
    let pin_str    = filter.pin.as_ref().map(|p| p.to_string());
    let level_str  = filter.risk_level.map(|l| l.to_string());
    let status_str = filter.status.map(|s| s.to_string());

    let raws: Vec<RawCase> = self
      .conn
      .call(move |conn| {
        let mut conds: Vec<String> = vec![];
        let mut params: Vec<rusqlite::types::Value> = vec![];
        if let Some(pin) = pin_str {
          params.push(pin.into());
          conds.push(format!("taxpayer_pin = ?{}", params.len()));
        }
        if let Some(level) = level_str {
          params.push(level.into());
          conds.push(format!("risk_level = ?{}", params.len()));
        }
        if let Some(status) = status_str {
          params.push(status.into());
          conds.push(format!("status = ?{}", params.len()));
        }

        let where_clause = if conds.is_empty() {
          String::new()
        } else {
          format!("WHERE {}", conds.join(" AND "))
        };

        let sql = format!(
          "SELECT case_id, taxpayer_pin, filing_type, risk_score, risk_level,
                  reason, declared_income, inferred_income, discrepancy_amount,
                  status, created_at
           FROM audit_cases
           {where_clause}
           ORDER BY risk_score DESC, created_at DESC"
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), |row| {
            Ok(RawCase {
              case_id:            row.get(0)?,
              taxpayer_pin:       row.get(1)?,
              filing_type:        row.get(2)?,
              risk_score:         row.get(3)?,
              risk_level:         row.get(4)?,
              reason:             row.get(5)?,
              declared_income:    row.get(6)?,
              inferred_income:    row.get(7)?,
              discrepancy_amount: row.get(8)?,
              status:             row.get(9)?,
              created_at:         row.get(10)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCase::into_case).collect()
  }

  async fn update_case_status(
    &self,
    case_id: i64,
    status: CaseStatus,
  ) -> Result<AuditCase> {
    // Only the scorer writes NEW; reopening a case would collide with the
    // one-open-case-per-filing index.
    if status == CaseStatus::New {
      return Err(ushuru_core::Error::CaseReopen(case_id).into());
    }

    let status_str = status.to_string();
    let officer    = UserRole::Officer.to_string();

    let raw: Option<RawCase> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let changed = tx.execute(
          "UPDATE audit_cases SET status = ?1 WHERE case_id = ?2",
          rusqlite::params![status_str, case_id],
        )?;
        if changed == 0 {
          return Ok(None);
        }

        let raw = tx.query_row(
          "SELECT case_id, taxpayer_pin, filing_type, risk_score, risk_level,
                  reason, declared_income, inferred_income, discrepancy_amount,
                  status, created_at
           FROM audit_cases WHERE case_id = ?1",
          rusqlite::params![case_id],
          |row| {
            Ok(RawCase {
              case_id:            row.get(0)?,
              taxpayer_pin:       row.get(1)?,
              filing_type:        row.get(2)?,
              risk_score:         row.get(3)?,
              risk_level:         row.get(4)?,
              reason:             row.get(5)?,
              declared_income:    row.get(6)?,
              inferred_income:    row.get(7)?,
              discrepancy_amount: row.get(8)?,
              status:             row.get(9)?,
              created_at:         row.get(10)?,
            })
          },
        )?;

        mirror(
          &tx,
          &MirrorRow {
            pin:        raw.taxpayer_pin.clone(),
            relation:   "audit_cases",
            action:     "WRITE",
            role:       officer,
            session_id: None,
            ip_address: None,
          },
        );
        tx.commit()?;
        Ok(Some(raw))
      })
      .await?;

    match raw {
      Some(raw) => raw.into_case(),
      None => Err(Error::Core(ushuru_core::Error::CaseNotFound(case_id))),
    }
  }

  // ── Access log — append-only ──────────────────────────────────────────────

  async fn log_access(&self, entry: NewAccessLog) -> Result<()> {
    let pin_str    = entry.pin.to_string();
    let relation   = entry.relation.clone();
    let action_str = entry.action.to_string();
    let role_str   = entry.role.to_string();
    let sess_str   = entry.session_id.map(encode_uuid);
    let ip         = entry.ip_address.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO access_logs
             (at, taxpayer_pin, relation_name, action, user_role, session_id, ip_address)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            encode_dt(Utc::now()),
            pin_str, relation, action_str, role_str, sess_str, ip,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn access_logs(&self, pin: TaxpayerPin) -> Result<Vec<AccessLogEntry>> {
    let pin_str = pin.to_string();

    let raws: Vec<RawAccessLog> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT id, at, taxpayer_pin, relation_name, action, user_role,
                  session_id, ip_address
           FROM access_logs WHERE taxpayer_pin = ?1 ORDER BY at, id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![pin_str], |row| {
            Ok(RawAccessLog {
              id:            row.get(0)?,
              at:            row.get(1)?,
              taxpayer_pin:  row.get(2)?,
              relation_name: row.get(3)?,
              action:        row.get(4)?,
              user_role:     row.get(5)?,
              session_id:    row.get(6)?,
              ip_address:    row.get(7)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAccessLog::into_entry).collect()
  }
}
