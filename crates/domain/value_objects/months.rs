use chrono::{Datelike, NaiveDate};
use thiserror::Error;

/// Wire format of a month: two-digit month, dash, four-digit year.
pub const MONTH_FORMAT: &str = "MM-YYYY";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonthParseError {
    #[error("invalid month {0:?}, expected {MONTH_FORMAT}")]
    InvalidFormat(String),

    #[error("month out of range in {0:?}, expected 01..12")]
    MonthOutOfRange(String),
}

/// Parses `MM-YYYY` into the first calendar day of that month.
///
/// Only the exact shape is accepted: no single-digit months, no short or
/// signed years, no surrounding whitespace.
pub fn parse_month(raw: &str) -> Result<NaiveDate, MonthParseError> {
    let bytes = raw.as_bytes();
    if bytes.len() != 7 || bytes[2] != b'-' {
        return Err(MonthParseError::InvalidFormat(raw.to_string()));
    }

    let (month_part, year_part) = (&raw[..2], &raw[3..]);
    if !month_part.bytes().all(|b| b.is_ascii_digit())
        || !year_part.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(MonthParseError::InvalidFormat(raw.to_string()));
    }

    let month: u32 = month_part
        .parse()
        .map_err(|_| MonthParseError::InvalidFormat(raw.to_string()))?;
    let year: i32 = year_part
        .parse()
        .map_err(|_| MonthParseError::InvalidFormat(raw.to_string()))?;

    NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| MonthParseError::MonthOutOfRange(raw.to_string()))
}

/// `None` means "no date supplied", which is not an error.
pub fn parse_optional_month(raw: Option<&str>) -> Result<Option<NaiveDate>, MonthParseError> {
    raw.map(parse_month).transpose()
}

pub fn format_month(date: NaiveDate) -> String {
    format!("{:02}-{:04}", date.month(), date.year())
}
