//! Registry date parsing.
//!
//! Registries are not consistent about how they encode event dates, so a
//! fixed, ordered list of encodings is tried and the first one that parses
//! wins. Everything here is pure and safe to call from any number of tasks.

use chrono::format::{self, Fixed, Item, Numeric, Pad, Parsed};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::error::{LapseError, Result};

const RFC3339_SECONDS: &[Item<'static>] = &[
    Item::Numeric(Numeric::Year, Pad::Zero),
    Item::Literal("-"),
    Item::Numeric(Numeric::Month, Pad::Zero),
    Item::Literal("-"),
    Item::Numeric(Numeric::Day, Pad::Zero),
    Item::Literal("T"),
    Item::Numeric(Numeric::Hour, Pad::Zero),
    Item::Literal(":"),
    Item::Numeric(Numeric::Minute, Pad::Zero),
    Item::Literal(":"),
    Item::Numeric(Numeric::Second, Pad::Zero),
    Item::Fixed(Fixed::TimezoneOffsetColonZ),
];

const RFC3339_NANO: &[Item<'static>] = &[
    Item::Numeric(Numeric::Year, Pad::Zero),
    Item::Literal("-"),
    Item::Numeric(Numeric::Month, Pad::Zero),
    Item::Literal("-"),
    Item::Numeric(Numeric::Day, Pad::Zero),
    Item::Literal("T"),
    Item::Numeric(Numeric::Hour, Pad::Zero),
    Item::Literal(":"),
    Item::Numeric(Numeric::Minute, Pad::Zero),
    Item::Literal(":"),
    Item::Numeric(Numeric::Second, Pad::Zero),
    Item::Fixed(Fixed::Nanosecond),
    Item::Fixed(Fixed::TimezoneOffsetColonZ),
];

/// A date-time encoding seen in registry responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateEncoding {
    /// `2025-01-01T00:00:00Z`, `2025-01-01T00:00:00+02:00`
    Rfc3339,
    /// `2025-01-01T00:00:00.123456789Z`
    Rfc3339Nano,
    /// `2025-01-01T00:00:00` with no offset, read as UTC
    NaiveUtc,
    /// `2025-01-01`, read as midnight UTC
    DateOnly,
}

impl DateEncoding {
    /// Encodings in the order they are attempted.
    pub const ORDERED: [DateEncoding; 4] = [
        DateEncoding::Rfc3339,
        DateEncoding::Rfc3339Nano,
        DateEncoding::NaiveUtc,
        DateEncoding::DateOnly,
    ];

    pub fn parse(self, raw: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
        match self {
            DateEncoding::Rfc3339 => parse_items(raw, RFC3339_SECONDS),
            DateEncoding::Rfc3339Nano => parse_items(raw, RFC3339_NANO),
            DateEncoding::NaiveUtc => {
                NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|dt| dt.and_utc())
            }
            DateEncoding::DateOnly => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map(|d| d.and_time(NaiveTime::MIN).and_utc()),
        }
    }
}

fn parse_items(
    raw: &str,
    items: &[Item<'static>],
) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    let mut parsed = Parsed::new();
    format::parse(&mut parsed, raw, items.iter())?;
    Ok(parsed.to_datetime()?.with_timezone(&Utc))
}

/// Parses a registry event date into a UTC instant.
///
/// Fails with [`LapseError::DateParse`] carrying the raw string and the error
/// from the last encoding attempted.
pub fn parse_expiry_time(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    let mut result = DateEncoding::ORDERED[0].parse(raw);

    for encoding in &DateEncoding::ORDERED[1..] {
        if result.is_ok() {
            break;
        }
        result = encoding.parse(raw);
    }

    result.map_err(|source| LapseError::DateParse {
        raw: raw.to_string(),
        source,
    })
}
