//! Taxpayer PIN — the opaque identifier joining every entity in the store.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A validated taxpayer PIN.
///
/// Format: `A` followed by nine digits followed by `P` (e.g. `A012345678P`).
/// Construction goes through [`TaxpayerPin::parse`]; a value of this type is
/// always well-formed, so downstream code never re-validates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaxpayerPin(String);

impl TaxpayerPin {
  /// Validate and wrap a raw PIN string.
  pub fn parse(raw: &str) -> Result<Self> {
    let s = raw.trim();
    let bytes = s.as_bytes();
    let well_formed = bytes.len() == 11
      && bytes[0] == b'A'
      && bytes[10] == b'P'
      && bytes[1..10].iter().all(u8::is_ascii_digit);
    if well_formed {
      Ok(Self(s.to_owned()))
    } else {
      Err(Error::InvalidPin(raw.to_owned()))
    }
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for TaxpayerPin {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl TryFrom<String> for TaxpayerPin {
  type Error = Error;

  fn try_from(s: String) -> Result<Self> { Self::parse(&s) }
}

impl From<TaxpayerPin> for String {
  fn from(pin: TaxpayerPin) -> Self { pin.0 }
}
