//! SQL schema for the Ushuru SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! the `PRAGMA user_version` number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per interview. Mutable while live, retained forever after
-- submission as the audit trail of the interview itself.
CREATE TABLE IF NOT EXISTS filing_sessions (
    session_id          TEXT PRIMARY KEY,
    taxpayer_pin        TEXT NOT NULL,
    filing_type         TEXT NOT NULL,
    state               TEXT NOT NULL,   -- 'COLLECTING' | 'SECTION_COMPLETE' | 'SUBMITTED'
    current_section     TEXT,
    last_question_asked TEXT,
    responses_json      TEXT NOT NULL DEFAULT '{}',
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL
);

-- Committed answers are strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS filed_facts (
    fact_id      TEXT PRIMARY KEY,
    taxpayer_pin TEXT NOT NULL,
    filing_type  TEXT NOT NULL,
    section      TEXT NOT NULL,
    field_name   TEXT NOT NULL,
    field_value  TEXT,
    recorded_at  TEXT NOT NULL,           -- ISO 8601 UTC; server-assigned
    session_id   TEXT REFERENCES filing_sessions(session_id)
);

-- Truth sources: immutable, externally supplied, read-only to the core.

CREATE TABLE IF NOT EXISTS bank_transactions (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    taxpayer_pin TEXT NOT NULL,
    date         TEXT NOT NULL,
    amount       REAL NOT NULL,
    direction    TEXT NOT NULL,           -- 'CREDIT' | 'DEBIT'
    balance      REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS mpesa_transactions (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    taxpayer_pin TEXT NOT NULL,
    date         TEXT NOT NULL,
    direction    TEXT NOT NULL,           -- 'RECEIVE' | 'SEND'
    amount       REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS vehicle_assets (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    taxpayer_pin        TEXT NOT NULL,
    registration_number TEXT NOT NULL,
    make                TEXT NOT NULL,
    model               TEXT NOT NULL,
    estimated_value     REAL NOT NULL,
    purchase_date       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS property_assets (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    taxpayer_pin    TEXT NOT NULL,
    lr_number       TEXT NOT NULL,
    location        TEXT NOT NULL,
    property_type   TEXT NOT NULL,
    estimated_value REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS import_records (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    taxpayer_pin  TEXT NOT NULL,
    date          TEXT NOT NULL,
    description   TEXT NOT NULL,
    value         REAL NOT NULL,
    customs_entry TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS telco_usage (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    taxpayer_pin  TEXT NOT NULL,
    month         TEXT NOT NULL,          -- 'YYYY-MM'
    calls_made    INTEGER NOT NULL,
    data_usage_gb REAL NOT NULL,
    monthly_bill  REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS audit_cases (
    case_id            INTEGER PRIMARY KEY AUTOINCREMENT,
    taxpayer_pin       TEXT NOT NULL,
    filing_type        TEXT NOT NULL,
    risk_score         INTEGER,
    risk_level         TEXT,
    reason             TEXT,
    declared_income    REAL,
    inferred_income    REAL,
    discrepancy_amount REAL,
    status             TEXT NOT NULL DEFAULT 'NEW',
    created_at         TEXT NOT NULL
);

-- Append-only; never updated or deleted.
CREATE TABLE IF NOT EXISTS access_logs (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    at           TEXT NOT NULL,
    taxpayer_pin TEXT NOT NULL,
    relation_name TEXT,
    action       TEXT,
    user_role    TEXT,
    session_id   TEXT,
    ip_address   TEXT
);

CREATE INDEX IF NOT EXISTS filing_sessions_pin_idx   ON filing_sessions(taxpayer_pin);
CREATE INDEX IF NOT EXISTS filed_facts_pin_idx       ON filed_facts(taxpayer_pin);
CREATE INDEX IF NOT EXISTS filed_facts_field_idx     ON filed_facts(taxpayer_pin, filing_type, field_name);
CREATE INDEX IF NOT EXISTS bank_pin_idx              ON bank_transactions(taxpayer_pin);
CREATE INDEX IF NOT EXISTS mpesa_pin_idx             ON mpesa_transactions(taxpayer_pin);
CREATE INDEX IF NOT EXISTS vehicle_pin_idx           ON vehicle_assets(taxpayer_pin);
CREATE INDEX IF NOT EXISTS property_pin_idx          ON property_assets(taxpayer_pin);
CREATE INDEX IF NOT EXISTS import_pin_idx            ON import_records(taxpayer_pin);
CREATE INDEX IF NOT EXISTS telco_pin_idx             ON telco_usage(taxpayer_pin);
CREATE INDEX IF NOT EXISTS audit_cases_pin_idx       ON audit_cases(taxpayer_pin);
CREATE INDEX IF NOT EXISTS audit_cases_level_idx     ON audit_cases(risk_level);
CREATE INDEX IF NOT EXISTS access_logs_at_idx        ON access_logs(at);
CREATE INDEX IF NOT EXISTS access_logs_pin_idx       ON access_logs(taxpayer_pin);

-- At most one open case per taxpayer/filing type.
CREATE UNIQUE INDEX IF NOT EXISTS audit_cases_open_idx
    ON audit_cases(taxpayer_pin, filing_type) WHERE status = 'NEW';

PRAGMA user_version = 1;
";
