use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A calendar month. Orders chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Period {
    year: i32,
    month: u32,
}

#[derive(Debug, Error)]
#[error("unrecognized period: {0:?}")]
pub struct PeriodParseError(pub String);

impl Period {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default()
    }

    /// Short chart label, e.g. `Jul 23`.
    pub fn label(&self) -> String {
        self.first_day().format("%b %y").to_string()
    }

    fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl FromStr for Period {
    type Err = PeriodParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let err = || PeriodParseError(s.to_string());
        if trimmed.is_empty() {
            return Err(err());
        }

        // ISO forms: 2023-07, 2023-07-01, 2023-07-01T00:00:00
        if trimmed.as_bytes().first().is_some_and(u8::is_ascii_digit) {
            let day = match trimmed.get(..10) {
                Some(prefix) if trimmed.len() >= 10 => prefix.to_string(),
                _ => format!("{trimmed}-01"),
            };
            return NaiveDate::parse_from_str(&day, "%Y-%m-%d")
                .map(Self::from_date)
                .map_err(|_| err());
        }

        // Month-name forms: Jul 23, Jul 2023, July 2023
        let with_day = format!("01 {trimmed}");
        for format in ["%d %B %y", "%d %B %Y"] {
            if let Ok(date) = NaiveDate::parse_from_str(&with_day, format) {
                return Ok(Self::from_date(date));
            }
        }
        Err(err())
    }
}

impl TryFrom<String> for Period {
    type Error = PeriodParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Period> for String {
    fn from(value: Period) -> Self {
        value.label()
    }
}

impl Display for Period {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}
