//! Datetime helpers.
//!
//! - Serde support for record timestamps: `DateTime<Utc>` <-> RFC3339 string
//!   (Unix timestamps are accepted on input)
//! - RFC3339 parsing/formatting for billing end dates, keeping the original offset
//! - Calendar arithmetic used by the lifecycle engine

use chrono::{DateTime, FixedOffset, Months, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serializer};

/// Serializes `DateTime<Utc>` as an RFC3339 string.
pub fn serialize<S>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&dt.to_rfc3339())
}

/// Deserializes `DateTime<Utc>` from RFC3339 or Unix timestamp.
///
/// Unix timestamps are auto-detected as seconds or milliseconds.
pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TimestampOrString {
        String(String),
        I64(i64),
    }

    match TimestampOrString::deserialize(deserializer)? {
        TimestampOrString::String(s) => parse_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| Error::custom(format!("Invalid RFC3339 timestamp: {e}"))),
        TimestampOrString::I64(ts) => {
            parse_unix_timestamp(ts).ok_or_else(|| Error::custom("Invalid Unix timestamp"))
        }
    }
}

/// Parses an RFC3339 timestamp, keeping its UTC offset.
pub fn parse_rfc3339(raw: &str) -> Result<DateTime<FixedOffset>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw.trim())
}

/// Formats as RFC3339: `Z` for UTC, sub-second digits only when present.
#[must_use]
pub fn format_rfc3339(dt: &DateTime<FixedOffset>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Adds whole calendar months, clamping to the last day of the target month
/// (Jan 31 + 1 month = Feb 28/29).
#[must_use]
pub fn add_months(dt: &DateTime<FixedOffset>, months: u32) -> Option<DateTime<FixedOffset>> {
    dt.checked_add_months(Months::new(months))
}

/// Whole days from `now` until `end`, rounded down (negative once overdue).
#[must_use]
pub fn days_until(end: &DateTime<FixedOffset>, now: DateTime<Utc>) -> i64 {
    let seconds = end.with_timezone(&Utc).signed_duration_since(now).num_seconds();
    seconds.div_euclid(86_400)
}

/// Parses a Unix timestamp with second/millisecond auto-detection.
fn parse_unix_timestamp(ts: i64) -> Option<DateTime<Utc>> {
    // Values larger than 10^11 are interpreted as milliseconds.
    if ts > 100_000_000_000 {
        DateTime::from_timestamp_millis(ts)
    } else {
        DateTime::from_timestamp(ts, 0)
    }
}
