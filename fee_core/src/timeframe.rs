use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Invalid days filter '{0}': expected a number of days between 1 and 36500, or 'all'")]
pub struct DaysFilterParseError(pub String);

/// Longest window accepted from callers (100 years)
pub const MAX_DAYS: u32 = 36_500;

/// Time window a report covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DaysFilter {
    /// Full history; the only window that is cached
    #[default]
    AllTime,
    /// Transactions signed within the last N days
    Days(u32),
}

impl DaysFilter {
    pub fn is_all_time(&self) -> bool {
        matches!(self, DaysFilter::AllTime)
    }

    /// Transactions at or before the returned instant are excluded. A window
    /// reaching past the earliest representable date has no cutoff.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            DaysFilter::AllTime => None,
            DaysFilter::Days(days) => {
                let cutoff = Duration::try_days(i64::from(*days))
                    .and_then(|window| now.checked_sub_signed(window));
                debug!("Days filter {} => cutoff {:?}", days, cutoff);
                cutoff
            }
        }
    }

    /// Parse the optional `days` query value; absent, blank and `all` mean all time
    pub fn from_query(value: Option<&str>) -> Result<Self, DaysFilterParseError> {
        match value {
            None => Ok(DaysFilter::AllTime),
            Some(raw) => raw.parse(),
        }
    }
}

impl FromStr for DaysFilter {
    type Err = DaysFilterParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            return Ok(DaysFilter::AllTime);
        }

        match trimmed.parse::<u32>() {
            Ok(days) if (1..=MAX_DAYS).contains(&days) => Ok(DaysFilter::Days(days)),
            _ => Err(DaysFilterParseError(s.to_string())),
        }
    }
}

impl fmt::Display for DaysFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaysFilter::AllTime => f.write_str("all"),
            DaysFilter::Days(days) => write!(f, "{}", days),
        }
    }
}
