//! Amount parsing for interview answers and filed-fact values.
//!
//! Filed facts store free text, and answers arrive from humans, so monetary
//! values come in as `"KES 1,500,000"`, `"150000.50"`, or occasionally a
//! stray `"No"`. Two levels of strictness:
//!
//! - [`parse_amount`] — used at answer-merge time; rejects garbage so a bad
//!   value never reaches the store.
//! - [`lenient_amount`] — used at scoring time over already-committed facts;
//!   unparseable text contributes zero rather than aborting a scoring run.

use crate::{Error, Result};

/// Strip currency symbols and separators, keeping digits and one dot.
fn cleaned(raw: &str) -> String {
  raw.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect()
}

/// Parse a non-negative monetary amount; rejects anything unparseable.
pub fn parse_amount(raw: &str) -> Result<f64> {
  if raw.contains('-') {
    return Err(Error::InvalidAmount(raw.to_owned()));
  }
  let digits = cleaned(raw);
  if digits.is_empty() {
    return Err(Error::InvalidAmount(raw.to_owned()));
  }
  let value: f64 = digits
    .parse()
    .map_err(|_| Error::InvalidAmount(raw.to_owned()))?;
  if value.is_finite() && value >= 0.0 {
    Ok(value)
  } else {
    Err(Error::InvalidAmount(raw.to_owned()))
  }
}

/// Best-effort parse over committed fact text. Yes/no answers and anything
/// else non-numeric count as zero.
pub fn lenient_amount(raw: &str) -> f64 {
  let trimmed = raw.trim();
  if matches!(
    trimmed.to_ascii_lowercase().as_str(),
    "" | "yes" | "no" | "y" | "n"
  ) {
    return 0.0;
  }
  let value: f64 = cleaned(trimmed).parse().unwrap_or(0.0);
  if trimmed.starts_with('-') { -value } else { value }
}

/// Trim, strip angle brackets, and cap free-text answers.
pub fn sanitize_text(raw: &str, max_len: usize) -> String {
  raw
    .trim()
    .chars()
    .filter(|c| *c != '<' && *c != '>')
    .take(max_len)
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_formatted_amounts() {
    assert_eq!(parse_amount("KES 1,500,000").unwrap(), 1_500_000.0);
    assert_eq!(parse_amount("150000.50").unwrap(), 150_000.5);
  }

  #[test]
  fn rejects_non_numeric_amounts() {
    assert!(parse_amount("No").is_err());
    assert!(parse_amount("").is_err());
  }

  #[test]
  fn rejects_negative_amounts() {
    assert!(parse_amount("-5000").is_err());
    assert!(parse_amount("KES -1,000").is_err());
  }

  #[test]
  fn lenient_amount_defaults_to_zero() {
    assert_eq!(lenient_amount("Yes"), 0.0);
    assert_eq!(lenient_amount("not a number"), 0.0);
    assert_eq!(lenient_amount("1,200"), 1200.0);
  }

  #[test]
  fn lenient_amount_keeps_the_sign() {
    assert_eq!(lenient_amount("-5000"), -5000.0);
    assert_eq!(lenient_amount("-1,200.50"), -1200.5);
  }

  #[test]
  fn sanitize_strips_markup_and_caps() {
    assert_eq!(sanitize_text("  <b>Equity Bank</b> ", 500), "bEquity Bank/b");
    assert_eq!(sanitize_text("abcdef", 3), "abc");
  }
}
