//! Since-filter mini-language: `YYYY-MM-DD` or `<integer><d|w|m|y>`.
//!
//! Relative units are fixed approximations: a week is 7 days, a month 30
//! days and a year 365 days.

use super::{TransferError, TransferResult};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

static RELATIVE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)(\D)$").expect("valid relative since regex"));

/// Lower bound on note creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinceFilter {
    /// Midnight UTC at the start of this calendar date.
    Date(NaiveDate),
    /// This many days before the moment of evaluation.
    DaysAgo(i64),
}

impl SinceFilter {
    /// Parses `2024-01-01`, `7d`, `2w`, `3m` or `1y`.
    pub fn parse(raw: &str) -> TransferResult<Self> {
        let raw = raw.trim();
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Ok(Self::Date(date));
        }

        if raw.chars().count() < 2 {
            return Err(invalid(raw, "use '2025-01-01' or '30d'"));
        }

        let captures = RELATIVE_RE
            .captures(raw)
            .ok_or_else(|| invalid(raw, "expected a whole number followed by d, w, m or y"))?;
        let amount: i64 = captures[1]
            .parse()
            .map_err(|_| invalid(raw, "number out of range"))?;
        let days_per_unit = match &captures[2] {
            "d" => 1,
            "w" => 7,
            "m" => 30,
            "y" => 365,
            unit => {
                return Err(invalid(
                    raw,
                    &format!("unknown unit `{unit}`; use d, w, m or y"),
                ))
            }
        };
        let days = amount
            .checked_mul(days_per_unit)
            .filter(|days| *days <= MAX_DAYS)
            .ok_or_else(|| invalid(raw, "duration too large"))?;

        Ok(Self::DaysAgo(days))
    }

    /// Resolves the bound relative to `now`.
    pub fn resolve_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Self::Date(date) => date.and_time(chrono::NaiveTime::MIN).and_utc(),
            Self::DaysAgo(days) => now - Duration::days(*days),
        }
    }

    /// Resolves the bound against the current clock.
    pub fn resolve(&self) -> DateTime<Utc> {
        self.resolve_at(Utc::now())
    }
}

// Keeps `now - days` far away from chrono's representable range.
const MAX_DAYS: i64 = 365 * 10_000;

impl FromStr for SinceFilter {
    type Err = TransferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Display for SinceFilter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Self::DaysAgo(days) => write!(f, "{days}d"),
        }
    }
}

fn invalid(raw: &str, hint: &str) -> TransferError {
    TransferError::Validation(format!("invalid since filter `{raw}`: {hint}"))
}
