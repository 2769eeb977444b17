//! The Ushuru filing engine: interview flow, truth-source aggregation, and
//! risk scoring on top of any [`TaxStore`] backend.
//!
//! The engine owns no persistence of its own. It drives the session state
//! machine question by question, commits completed interviews as filed
//! facts, and scores every submission against the taxpayer's wealth profile.

pub mod aggregate;
pub mod risk;
pub mod session;

use std::sync::Arc;

use serde::Deserialize;
use ushuru_core::store::TaxStore;

pub use crate::{
  aggregate::{Confidence, IncomeEstimate, WealthProfile},
  risk::ScoringConfig,
  session::{AnswerOutcome, Prompt, Submission},
};

// ─── Config ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  pub scoring:           ScoringConfig,
  /// Budget for each truth-source fetch, in milliseconds. A source that
  /// exceeds it degrades the wealth profile instead of failing the scoring
  /// run.
  pub source_timeout_ms: u64,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self { scoring: ScoringConfig::default(), source_timeout_ms: 2_000 }
  }
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// Stateless orchestrator over a shared store handle. Cheap to clone.
pub struct FilingEngine<S> {
  store:  Arc<S>,
  config: EngineConfig,
}

impl<S> Clone for FilingEngine<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), config: self.config.clone() }
  }
}

impl<S: TaxStore> FilingEngine<S> {
  pub fn new(store: Arc<S>, config: EngineConfig) -> Self {
    Self { store, config }
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  pub fn config(&self) -> &EngineConfig { &self.config }
}

#[cfg(test)]
mod tests;
