//! Iosans Cron
//!
//! Five-field cron expression matching for schedule triggers:
//! `<minute> <hour> <day-of-month> <month> <day-of-week>` with field ranges
//! `[0,59] [0,23] [1,31] [1,12] [0,6]` (0 = Sunday).
//!
//! Each field is `*`, a literal, a comma list, a range `a-b`, or a step
//! (`*/n`, `a-b/n`). [`matches`] evaluates an expression against a timestamp
//! in that timestamp's own time zone and never panics or errors; malformed
//! expressions simply do not match. Callers that want diagnostics use
//! [`CronExpr::parse`] or [`validate`].

use chrono::{DateTime, Datelike, TimeZone, Timelike};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CronError {
  #[error("expected 5 fields, got {0}")]
  FieldCount(usize),

  #[error("invalid {field} field: {token}")]
  InvalidField {
    field: &'static str,
    token: String,
  },

  #[error("{field} value {value} out of range {min}..={max}")]
  OutOfRange {
    field: &'static str,
    value: u32,
    min: u32,
    max: u32,
  },
}

/// One segment of a field: an inclusive range walked with a step.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Segment {
  start: u32,
  end: u32,
  step: u32,
}

impl Segment {
  fn contains(&self, value: u32) -> bool {
    value >= self.start && value <= self.end && (value - self.start) % self.step == 0
  }
}

/// A parsed field: the union of its comma-separated segments.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Field {
  segments: Vec<Segment>,
}

impl Field {
  fn matches(&self, value: u32) -> bool {
    self.segments.iter().any(|s| s.contains(value))
  }
}

/// A parsed five-field cron expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronExpr {
  minute: Field,
  hour: Field,
  day_of_month: Field,
  month: Field,
  day_of_week: Field,
}

impl CronExpr {
  /// Parse an expression, reporting the first malformed field.
  pub fn parse(expr: &str) -> Result<Self, CronError> {
    let fields: Vec<&str> = expr.split_whitespace().collect();
    if fields.len() != 5 {
      return Err(CronError::FieldCount(fields.len()));
    }

    Ok(Self {
      minute: parse_field(fields[0], "minute", 0, 59)?,
      hour: parse_field(fields[1], "hour", 0, 23)?,
      day_of_month: parse_field(fields[2], "day-of-month", 1, 31)?,
      month: parse_field(fields[3], "month", 1, 12)?,
      day_of_week: parse_field(fields[4], "day-of-week", 0, 6)?,
    })
  }

  /// Whether the expression matches the given timestamp.
  ///
  /// Seconds are ignored; cron is minute-granular.
  pub fn matches<Tz: TimeZone>(&self, ts: &DateTime<Tz>) -> bool {
    self.minute.matches(ts.minute())
      && self.hour.matches(ts.hour())
      && self.day_of_month.matches(ts.day())
      && self.month.matches(ts.month())
      && self.day_of_week.matches(ts.weekday().num_days_from_sunday())
  }
}

/// Evaluate `expr` against `ts`. Malformed expressions yield `false`.
pub fn matches<Tz: TimeZone>(expr: &str, ts: &DateTime<Tz>) -> bool {
  CronExpr::parse(expr).map(|e| e.matches(ts)).unwrap_or(false)
}

/// Validate an expression without evaluating it.
pub fn validate(expr: &str) -> Result<(), CronError> {
  CronExpr::parse(expr).map(|_| ())
}

fn parse_field(token: &str, name: &'static str, min: u32, max: u32) -> Result<Field, CronError> {
  let mut segments = Vec::new();
  for part in token.split(',') {
    segments.push(parse_segment(part, name, min, max)?);
  }
  Ok(Field { segments })
}

fn parse_segment(part: &str, name: &'static str, min: u32, max: u32) -> Result<Segment, CronError> {
  let invalid = || CronError::InvalidField {
    field: name,
    token: part.to_string(),
  };

  let (base, step) = match part.split_once('/') {
    Some((base, step_str)) => {
      let step: u32 = step_str.parse().map_err(|_| invalid())?;
      if step == 0 {
        return Err(invalid());
      }
      (base, step)
    }
    None => (part, 1),
  };

  let (start, end) = if base == "*" {
    (min, max)
  } else if let Some((lo, hi)) = base.split_once('-') {
    let lo: u32 = lo.parse().map_err(|_| invalid())?;
    let hi: u32 = hi.parse().map_err(|_| invalid())?;
    if lo > hi {
      return Err(invalid());
    }
    (lo, hi)
  } else {
    let value: u32 = base.parse().map_err(|_| invalid())?;
    // A bare literal with a step (`5/2`) is not part of the grammar.
    if step != 1 {
      return Err(invalid());
    }
    (value, value)
  };

  for value in [start, end] {
    if value < min || value > max {
      return Err(CronError::OutOfRange {
        field: name,
        value,
        min,
        max,
      });
    }
  }

  Ok(Segment { start, end, step })
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{TimeZone, Utc};

  fn ts(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
  }

  #[test]
  fn test_wildcard_matches_everything() {
    assert!(matches("* * * * *", &ts(2025, 1, 1, 0, 0)));
    assert!(matches("* * * * *", &ts(2025, 12, 31, 23, 59)));
  }

  #[test]
  fn test_step_field() {
    // 2025-01-01T10:30 is on the */15 grid.
    assert!(matches("*/15 * * * *", &ts(2025, 1, 1, 10, 30)));
    assert!(matches("*/15 * * * *", &ts(2025, 1, 1, 10, 0)));
    assert!(!matches("*/15 * * * *", &ts(2025, 1, 1, 10, 31)));
  }

  #[test]
  fn test_weekday_range() {
    // 2025-01-04 is a Saturday, 2025-01-06 a Monday.
    assert!(!matches("0 9 * * 1-5", &ts(2025, 1, 4, 9, 0)));
    assert!(matches("0 9 * * 1-5", &ts(2025, 1, 6, 9, 0)));
  }

  #[test]
  fn test_comma_list() {
    assert!(matches("0,30 * * * *", &ts(2025, 3, 3, 8, 30)));
    assert!(!matches("0,30 * * * *", &ts(2025, 3, 3, 8, 15)));
  }

  #[test]
  fn test_range_with_step() {
    assert!(matches("10-30/10 * * * *", &ts(2025, 3, 3, 8, 20)));
    assert!(!matches("10-30/10 * * * *", &ts(2025, 3, 3, 8, 25)));
    assert!(!matches("10-30/10 * * * *", &ts(2025, 3, 3, 8, 40)));
  }

  #[test]
  fn test_sunday_is_zero() {
    // 2025-01-05 is a Sunday.
    assert!(matches("* * * * 0", &ts(2025, 1, 5, 12, 0)));
    assert!(!matches("* * * * 0", &ts(2025, 1, 6, 12, 0)));
  }

  #[test]
  fn test_day_of_month_and_month() {
    assert!(matches("0 0 1 1 *", &ts(2025, 1, 1, 0, 0)));
    assert!(!matches("0 0 1 1 *", &ts(2025, 2, 1, 0, 0)));
  }

  #[test]
  fn test_malformed_never_matches() {
    let t = ts(2025, 1, 1, 0, 0);
    assert!(!matches("", &t));
    assert!(!matches("* * * *", &t));
    assert!(!matches("a * * * *", &t));
    assert!(!matches("*/0 * * * *", &t));
    assert!(!matches("99 * * * *", &t));
    assert!(!matches("5-1 * * * *", &t));
  }

  #[test]
  fn test_validate_errors() {
    assert_eq!(validate("* * * *"), Err(CronError::FieldCount(4)));
    assert!(matches!(
      validate("61 * * * *"),
      Err(CronError::OutOfRange { field: "minute", .. })
    ));
    assert!(matches!(
      validate("x * * * *"),
      Err(CronError::InvalidField { field: "minute", .. })
    ));
    assert!(validate("*/15 9-17 1,15 * 1-5").is_ok());
  }
}
